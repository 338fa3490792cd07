//! Metric tensor of the perpendicular (x, z) plane.

use crate::field::Field2D;

/// Grid spacings and the metric components the perpendicular operators need.
///
/// `g11`, `g33`, `g13` are contravariant metric components; `g1`, `g3` are the
/// first-derivative connection terms (`G1`, `G3`) of the perpendicular Laplacian.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub dx: f64,
    pub dz: f64,
    pub g11: Field2D,
    pub g33: Field2D,
    pub g13: Field2D,
    pub g1: Field2D,
    pub g3: Field2D,
}

impl Coordinates {
    /// Orthogonal Cartesian grid: `g11 = g33 = 1`, everything else zero.
    pub fn cartesian(shape: (usize, usize), dx: f64, dz: f64) -> Self {
        Self::with_metric(shape, dx, dz, 1.0, 1.0, 0.0)
    }

    /// Uniform, possibly non-orthogonal metric.
    pub fn with_metric(shape: (usize, usize), dx: f64, dz: f64, g11: f64, g33: f64, g13: f64) -> Self {
        Self {
            dx,
            dz,
            g11: Field2D::constant(shape, g11),
            g33: Field2D::constant(shape, g33),
            g13: Field2D::constant(shape, g13),
            g1: Field2D::constant(shape, 0.0),
            g3: Field2D::constant(shape, 0.0),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.g11.shape()
    }
}
