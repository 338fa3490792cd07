//! Convergence bookkeeping and diagnostics output.

pub mod convergence;
pub mod diagnostics;

pub use convergence::{Convergence, ConvergenceTracker, SolveStats};
pub use diagnostics::DiagnosticsRegistry;
