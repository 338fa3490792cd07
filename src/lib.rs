//! perpinv: perpendicular Laplacian inversions on x-decomposed structured grids
//!
//! This crate provides a direct solver for the constant-coefficient perpendicular
//! Laplacian built on Faer, and an iterative solver for the variable-coefficient
//! operator `D delp2(x) + (1/C1) grad_perp(C2) . grad_perp(x) + A x` that wraps it,
//! with communication between subdomains over MPI or in-process channels.

pub mod parallel;

pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod mesh;
pub mod operators;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use error::*;
pub use field::*;
pub use mesh::*;
pub use solver::*;
pub use utils::*;
