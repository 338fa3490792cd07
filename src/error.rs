use thiserror::Error;

use crate::field::CellLoc;

// Unified error type for perpinv

#[derive(Error, Debug)]
pub enum LapError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cell location mismatch for {what}: expected {expected:?}, found {found:?}")]
    LocationMismatch {
        what: &'static str,
        expected: CellLoc,
        found: CellLoc,
    },
    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },
    #[error("LaplaceNaulin error: took more than maxits={maxits} iterations to converge")]
    NotConverged { maxits: usize },
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("invalid options file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
