//! Finite-difference operators on [`Field3D`](crate::field::Field3D).
//!
//! First derivatives take an output location and a [`DiffMethod`]; the second
//! derivatives and [`delp2`] are second-order central differences.

use std::str::FromStr;

use crate::error::LapError;

pub mod delp2;
pub mod derivs;

pub use delp2::{delp2, delp2_stencil, grad_perp_dot_grad_perp, metric_dot};
pub use derivs::{d2dx2, d2dxdz, d2dz2, ddx, ddz};

/// Discretization of first derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMethod {
    /// Second-order central
    #[default]
    C2,
    /// Fourth-order central, needs two guard cells in x
    C4,
}

impl FromStr for DiffMethod {
    type Err = LapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C2" => Ok(DiffMethod::C2),
            "C4" => Ok(DiffMethod::C4),
            other => Err(LapError::Config(format!("unknown derivative method '{other}'"))),
        }
    }
}
