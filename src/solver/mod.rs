//! Laplacian inversion interfaces.
//!
//! Every inversion, direct or iterative, implements [`Laplacian`]. The iterative
//! variable-coefficient solver owns another `Laplacian` as its inner solver and
//! only ever talks to it through this trait.

use crate::error::LapError;
use crate::field::Field3D;

/// Common interface for any perpendicular Laplacian inversion.
pub trait Laplacian {
    /// Solve for `x` given the right-hand side `b` and the initial guess `x0`.
    ///
    /// `x0` also carries boundary data in its guard cells for solvers configured
    /// with [`InvertFlags::SET`].
    fn solve(&mut self, b: &Field3D, x0: &Field3D) -> Result<Field3D, LapError>;

    /// Solve with a zero initial guess.
    fn solve_zero_guess(&mut self, b: &Field3D) -> Result<Field3D, LapError> {
        let x0 = Field3D::zeros_like(b);
        self.solve(b, &x0)
    }

    fn global_flags(&self) -> InvertFlags;
    fn inner_boundary_flags(&self) -> InvertFlags;
    fn outer_boundary_flags(&self) -> InvertFlags;
    fn set_global_flags(&mut self, flags: InvertFlags);
    fn set_inner_boundary_flags(&mut self, flags: InvertFlags);
    fn set_outer_boundary_flags(&mut self, flags: InvertFlags);

    fn set_coef_a(&mut self, _a: Field3D) -> Result<(), LapError> {
        Err(LapError::Unsupported("coefficient A"))
    }
    fn set_coef_c1(&mut self, _c1: Field3D) -> Result<(), LapError> {
        Err(LapError::Unsupported("coefficient C1"))
    }
    fn set_coef_c2(&mut self, _c2: Field3D) -> Result<(), LapError> {
        Err(LapError::Unsupported("coefficient C2"))
    }
    fn set_coef_d(&mut self, _d: Field3D) -> Result<(), LapError> {
        Err(LapError::Unsupported("coefficient D"))
    }
}

pub mod flags;
pub use flags::{BoundaryKind, InvertFlags};

pub mod dense_delp2;
pub use dense_delp2::DenseDelp2;

pub mod naulin;
pub use naulin::{LaplaceNaulin, copy_x_boundaries};
