//! MPI-based parallel communication module.
//!
//! This module provides an implementation of the `Comm` trait using the MPI (Message Passing Interface)
//! backend for distributed-memory parallelism. Subdomain `x_proc` of the x decomposition lives on
//! rank `x_proc` of the world communicator. The implementation is only available when the `mpi`
//! feature is enabled.
//!
//! # Example
//! ```no_run
//! #[cfg(feature = "mpi")]
//! {
//!     use perpinv::parallel::{Comm, MpiComm};
//!     let comm = MpiComm::new().unwrap();
//!     println!("Rank: {} / {}", comm.rank(), comm.size());
//!     comm.barrier();
//! }
//! ```

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::point_to_point::send_receive_into;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use crate::error::LapError;

/// MPI communicator wrapper for distributed parallelism.
///
/// Holds the MPI universe (MPI is finalized when it is dropped), the world communicator,
/// the rank of the current process, and the total number of processes.
pub struct MpiComm {
    _universe: Universe,
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    ///
    /// Fails if MPI has already been initialized by this process.
    pub fn new() -> Result<Self, LapError> {
        let universe = mpi::initialize()
            .ok_or_else(|| LapError::Config("MPI is already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm { _universe: universe, world, rank, size })
    }
}

impl super::Comm for MpiComm {
    /// Returns the rank (ID) of this process.
    fn rank(&self) -> usize { self.rank }
    /// Returns the total number of processes in the communicator.
    fn size(&self) -> usize { self.size }
    /// Synchronizes all processes at a barrier.
    fn barrier(&self) { self.world.barrier(); }

    /// Sum of `x` across all processes.
    fn all_reduce_sum(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::sum());
        y
    }

    /// Maximum of `x` across all processes.
    fn all_reduce_max(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, &SystemOperation::max());
        y
    }

    /// Paired exchange used by the halo update. A one-sided call (only `dest` or only
    /// `source`) degrades to a blocking send or receive; the shift pattern of the halo
    /// exchange guarantees every such call has a matching partner.
    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>) {
        match (dest, source) {
            (Some(d), Some(s)) => {
                let dest_proc = self.world.process_at_rank(d as i32);
                let source_proc = self.world.process_at_rank(s as i32);
                send_receive_into(send, &dest_proc, recv, &source_proc);
            }
            (Some(d), None) => {
                self.world.process_at_rank(d as i32).send(send);
            }
            (None, Some(s)) => {
                self.world.process_at_rank(s as i32).receive_into(recv);
            }
            (None, None) => {}
        }
    }

    /// Every rank's `send` concatenated in rank order.
    fn all_gather(&self, send: &[f64], recv: &mut [f64]) {
        self.world.all_gather_into(send, recv);
    }
}
