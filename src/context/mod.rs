//! Construction of Laplacian solvers from run-time options.
//!
//! Modules:
//! - [`factory`]: `LaplaceFactory`, selecting a solver by the `type` option.

pub mod factory;
pub use factory::{LaplaceFactory, SolverKind};
