//! Three-dimensional scalar field on one subdomain, guard cells included.
//!
//! Storage is x-major with z fastest: `(i * ny + j) * nz + k`, so every x plane
//! is one contiguous block of `ny * nz` values. That makes halo exchange in x a
//! plain slice copy.
//!
//! Elementwise arithmetic is provided for `&Field3D` and `f64` operands. Both
//! operands of a field-field operation must have the same shape and the same
//! [`CellLoc`]; mixing them is a programming error and panics, just like a
//! dimension mismatch in a mat-vec.

use std::ops::{Add, Div, Index, IndexMut, Mul, Sub};

use super::field2d::Field2D;
use super::location::CellLoc;
use crate::mesh::Mesh;

#[derive(Debug, Clone, PartialEq)]
pub struct Field3D {
    nx: usize,
    ny: usize,
    nz: usize,
    data: Vec<f64>,
    location: CellLoc,
}

impl Field3D {
    /// Field of the given local shape filled with `value`, at cell centre.
    pub fn from_shape(shape: (usize, usize, usize), value: f64) -> Self {
        let (nx, ny, nz) = shape;
        Self {
            nx,
            ny,
            nz,
            data: vec![value; nx * ny * nz],
            location: CellLoc::Centre,
        }
    }

    pub fn zeros(mesh: &Mesh) -> Self {
        Self::from_shape(mesh.field_shape(), 0.0)
    }

    pub fn filled(mesh: &Mesh, value: f64) -> Self {
        Self::from_shape(mesh.field_shape(), value)
    }

    /// Zero field with the same shape and location as `other`.
    pub fn zeros_like(other: &Field3D) -> Self {
        Self::from_shape(other.shape(), 0.0).with_location(other.location)
    }

    /// Build a field by evaluating `f(i, j, k)` at every local index.
    pub fn from_fn<F: Fn(usize, usize, usize) -> f64>(mesh: &Mesh, f: F) -> Self {
        let (nx, ny, nz) = mesh.field_shape();
        let mut data = Vec::with_capacity(nx * ny * nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    data.push(f(i, j, k));
                }
            }
        }
        Self {
            nx,
            ny,
            nz,
            data,
            location: CellLoc::Centre,
        }
    }

    pub fn with_location(mut self, location: CellLoc) -> Self {
        self.location = location;
        self
    }

    pub fn location(&self) -> CellLoc {
        self.location
    }

    pub fn set_location(&mut self, location: CellLoc) {
        self.location = location;
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    #[inline]
    pub fn index_of(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        (i * self.ny + j) * self.nz + k
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Contiguous block holding the x planes `xs`.
    pub fn x_planes(&self, xs: std::ops::Range<usize>) -> &[f64] {
        let plane = self.ny * self.nz;
        &self.data[xs.start * plane..xs.end * plane]
    }

    pub fn x_planes_mut(&mut self, xs: std::ops::Range<usize>) -> &mut [f64] {
        let plane = self.ny * self.nz;
        &mut self.data[xs.start * plane..xs.end * plane]
    }

    /// New field `f(self)` with the same location.
    pub fn map<F>(&self, f: F) -> Field3D
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        #[cfg(feature = "rayon")]
        let data = {
            use rayon::prelude::*;
            self.data.par_iter().map(|&a| f(a)).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let data = self.data.iter().map(|&a| f(a)).collect();
        Field3D {
            nx: self.nx,
            ny: self.ny,
            nz: self.nz,
            data,
            location: self.location,
        }
    }

    /// In-place `self = f(self)`.
    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.data.par_iter_mut().for_each(|a| *a = f(*a));
        }
        #[cfg(not(feature = "rayon"))]
        self.data.iter_mut().for_each(|a| *a = f(*a));
    }

    /// New field `f(self, other)`, elementwise.
    pub fn zip_map<F>(&self, other: &Field3D, f: F) -> Field3D
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        self.assert_compatible(other);
        #[cfg(feature = "rayon")]
        let data = {
            use rayon::prelude::*;
            self.data
                .par_iter()
                .zip(other.data.par_iter())
                .map(|(&a, &b)| f(a, b))
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Field3D {
            nx: self.nx,
            ny: self.ny,
            nz: self.nz,
            data,
            location: self.location,
        }
    }

    /// In-place `self = f(self, other)`.
    pub fn zip_apply<F>(&mut self, other: &Field3D, f: F)
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        self.assert_compatible(other);
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            self.data
                .par_iter_mut()
                .zip(other.data.par_iter())
                .for_each(|(a, &b)| *a = f(*a, b));
        }
        #[cfg(not(feature = "rayon"))]
        self.data
            .iter_mut()
            .zip(other.data.iter())
            .for_each(|(a, &b)| *a = f(*a, b));
    }

    fn assert_compatible(&self, other: &Field3D) {
        assert_eq!(self.shape(), other.shape(), "Field3D operands have different shapes");
        assert_eq!(
            self.location, other.location,
            "Field3D operands have different cell locations"
        );
    }
}

impl Index<(usize, usize, usize)> for Field3D {
    type Output = f64;
    #[inline]
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &f64 {
        &self.data[self.index_of(i, j, k)]
    }
}

impl IndexMut<(usize, usize, usize)> for Field3D {
    #[inline]
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut f64 {
        let idx = self.index_of(i, j, k);
        &mut self.data[idx]
    }
}

macro_rules! impl_field_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Field3D> for &Field3D {
            type Output = Field3D;
            fn $method(self, rhs: &Field3D) -> Field3D {
                self.zip_map(rhs, |a, b| a $op b)
            }
        }

        impl $trait<&Field3D> for Field3D {
            type Output = Field3D;
            fn $method(mut self, rhs: &Field3D) -> Field3D {
                self.zip_apply(rhs, |a, b| a $op b);
                self
            }
        }

        impl $trait<Field3D> for Field3D {
            type Output = Field3D;
            fn $method(self, rhs: Field3D) -> Field3D {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<f64> for &Field3D {
            type Output = Field3D;
            fn $method(self, rhs: f64) -> Field3D {
                self.map(|a| a $op rhs)
            }
        }

        impl $trait<f64> for Field3D {
            type Output = Field3D;
            fn $method(mut self, rhs: f64) -> Field3D {
                self.apply(|a| a $op rhs);
                self
            }
        }

        impl $trait<&Field3D> for f64 {
            type Output = Field3D;
            fn $method(self, rhs: &Field3D) -> Field3D {
                rhs.map(|b| self $op b)
            }
        }
    };
}

impl_field_binop!(Add, add, +);
impl_field_binop!(Sub, sub, -);
impl_field_binop!(Mul, mul, *);
impl_field_binop!(Div, div, /);

/// Broadcast a 2D (x, y) field over z.
impl Mul<&Field2D> for &Field3D {
    type Output = Field3D;
    fn mul(self, rhs: &Field2D) -> Field3D {
        assert_eq!(
            (self.nx, self.ny),
            rhs.shape(),
            "Field2D does not match the x-y shape of the Field3D"
        );
        let mut out = self.clone();
        for i in 0..self.nx {
            for j in 0..self.ny {
                let g = rhs[(i, j)];
                let start = (i * self.ny + j) * self.nz;
                out.data[start..start + self.nz].iter_mut().for_each(|v| *v *= g);
            }
        }
        out
    }
}
