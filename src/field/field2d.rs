//! Two-dimensional (x, y) field, used for metric coefficients.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl Field2D {
    pub fn constant(shape: (usize, usize), value: f64) -> Self {
        let (nx, ny) = shape;
        Self { nx, ny, data: vec![value; nx * ny] }
    }

    pub fn from_fn<F: Fn(usize, usize) -> f64>(shape: (usize, usize), f: F) -> Self {
        let (nx, ny) = shape;
        let data = (0..nx)
            .flat_map(|i| (0..ny).map(move |j| (i, j)))
            .map(|(i, j)| f(i, j))
            .collect();
        Self { nx, ny, data }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }
}

impl Index<(usize, usize)> for Field2D {
    type Output = f64;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.ny + j]
    }
}

impl IndexMut<(usize, usize)> for Field2D {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.ny + j]
    }
}
