//! Factory for Laplacian inversions.
//!
//! `LaplaceFactory` turns an options section into a boxed [`Laplacian`]. The
//! section's `type` key picks the implementation; everything else in the section
//! is read by the chosen solver itself.
//!
//! # Supported Solvers
//! - `dense` (default): [`DenseDelp2`], direct constant-coefficient inversion
//! - `naulin`: [`LaplaceNaulin`], iterative variable-coefficient inversion

use std::rc::Rc;
use std::str::FromStr;

use log::debug;

use crate::config::Options;
use crate::error::LapError;
use crate::mesh::Mesh;
use crate::solver::{DenseDelp2, LaplaceNaulin, Laplacian};

/// Enum representing the available Laplacian solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Dense LU of the constant-coefficient `delp2`
    #[default]
    Dense,
    /// Fixed-point iteration for variable coefficients
    Naulin,
}

impl FromStr for SolverKind {
    type Err = LapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(SolverKind::Dense),
            "naulin" => Ok(SolverKind::Naulin),
            other => Err(LapError::Config(format!("unknown Laplacian type '{other}'"))),
        }
    }
}

pub struct LaplaceFactory;

impl LaplaceFactory {
    /// Create the solver described by `opt`.
    ///
    /// # Errors
    /// `Config` if `opt` is `None`, names an unknown `type`, or holds invalid values.
    pub fn create(opt: Option<&Options>, mesh: Rc<Mesh>) -> Result<Box<dyn Laplacian>, LapError> {
        let opt = opt.ok_or_else(|| LapError::Config("no options given for the Laplacian solver".into()))?;
        let kind: SolverKind = opt.get_str("type", "dense")?.parse()?;
        debug!("LaplaceFactory: creating {kind:?} solver");
        Ok(match kind {
            SolverKind::Dense => Box::new(DenseDelp2::from_options(opt, mesh)?),
            SolverKind::Naulin => Box::new(LaplaceNaulin::new(Some(opt), mesh)?),
        })
    }
}
