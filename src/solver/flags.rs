//! Boundary-condition flags shared by every Laplacian inversion.

use bitflags::bitflags;

use crate::error::LapError;

bitflags! {
    /// How an x boundary is treated by a direct inversion.
    ///
    /// With no flag set the boundary is zero Dirichlet. `GRAD` wins over the
    /// value flags, and `SET` wins over `RHS`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InvertFlags: u32 {
        /// Zero gradient: guard cells copy the adjacent interior cells
        const GRAD = 1 << 0;
        /// Dirichlet, value taken from the guard cells of the initial guess
        const SET = 1 << 1;
        /// Dirichlet, value taken from the guard cells of the right-hand side
        const RHS = 1 << 2;
    }
}

/// Boundary treatment resolved from a set of flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    ZeroGradient,
    DirichletZero,
    DirichletGuess,
    DirichletRhs,
}

impl InvertFlags {
    pub fn boundary_kind(self) -> BoundaryKind {
        if self.contains(InvertFlags::GRAD) {
            BoundaryKind::ZeroGradient
        } else if self.contains(InvertFlags::SET) {
            BoundaryKind::DirichletGuess
        } else if self.contains(InvertFlags::RHS) {
            BoundaryKind::DirichletRhs
        } else {
            BoundaryKind::DirichletZero
        }
    }

    /// Integer bit pattern; unknown bits are an error.
    pub fn from_bits_checked(bits: i64) -> Result<Self, LapError> {
        u32::try_from(bits)
            .ok()
            .and_then(InvertFlags::from_bits)
            .ok_or_else(|| LapError::Config(format!("invalid boundary flag bits {bits}")))
    }

    /// Text form, e.g. `"SET | GRAD"`. An empty string is no flags.
    pub fn parse(text: &str) -> Result<Self, LapError> {
        bitflags::parser::from_str::<InvertFlags>(text)
            .map_err(|e| LapError::Config(format!("invalid boundary flags '{text}': {e}")))
    }
}
