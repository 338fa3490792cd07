//! Convergence tracking & tolerance checks for the outer fixed-point iteration.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub error_abs: T,
    pub error_rel: T,
    /// Wall time spent in the inversion
    pub elapsed: Duration,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Either tolerance being met is enough. A non-finite error never meets one.
    pub fn is_converged(&self, error_abs: T, error_rel: T) -> bool {
        error_rel <= self.rtol || error_abs <= self.atol
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    mean_its: f64,
    ncalls: usize,
}

/// Running mean of the iteration count per successful solve.
///
/// Cloning gives another handle onto the same statistics, which is how the
/// diagnostics registry reads them.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl ConvergenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, iterations: usize) {
        let mut s = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        s.mean_its = (s.mean_its * s.ncalls as f64 + iterations as f64) / (s.ncalls + 1) as f64;
        s.ncalls += 1;
    }

    pub fn mean_iterations(&self) -> f64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).mean_its
    }

    pub fn ncalls(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).ncalls
    }
}
