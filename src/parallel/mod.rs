//! Communication between subdomains.
//!
//! The grid is decomposed in x only; subdomain `x_proc` lives on rank `x_proc`.
//! Everything the solvers need from the transport is in [`Comm`]: global sums and
//! maxima for error norms, a paired send/receive for the x halo exchange, and an
//! all-gather for solves that span the whole x direction.

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    fn all_reduce_sum(&self, x: f64) -> f64;
    fn all_reduce_max(&self, x: f64) -> f64;
    /// Send `send` to `dest` while receiving `recv` from `source`.
    ///
    /// `None` stands for "no partner" on that side: nothing is sent, or `recv`
    /// is left untouched. Blocks until both halves have completed.
    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>);
    /// Concatenate every rank's `send`, in rank order, into `recv` on all ranks.
    ///
    /// Every rank passes the same `send.len()`; `recv` holds `send.len() * size()` values.
    fn all_gather(&self, send: &[f64], recv: &mut [f64]);
}

pub mod serial_comm;
pub use serial_comm::SerialComm;

pub mod channel_comm;
pub use channel_comm::ChannelComm;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// The communicator a run was started with.
pub enum UniverseComm {
    #[cfg(feature = "mpi")]
    Mpi(MpiComm),
    Serial(SerialComm),
}

impl UniverseComm {
    /// MPI world when built with the `mpi` feature, a single rank otherwise.
    pub fn world() -> Result<Self, crate::error::LapError> {
        #[cfg(feature = "mpi")]
        {
            Ok(UniverseComm::Mpi(MpiComm::new()?))
        }
        #[cfg(not(feature = "mpi"))]
        {
            Ok(UniverseComm::Serial(SerialComm))
        }
    }
}

impl Comm for UniverseComm {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.rank(),
            UniverseComm::Serial(comm) => comm.rank(),
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.size(),
            UniverseComm::Serial(comm) => comm.size(),
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.barrier(),
            UniverseComm::Serial(comm) => comm.barrier(),
        }
    }
    fn all_reduce_sum(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_sum(x),
            UniverseComm::Serial(comm) => comm.all_reduce_sum(x),
        }
    }
    fn all_reduce_max(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_reduce_max(x),
            UniverseComm::Serial(comm) => comm.all_reduce_max(x),
        }
    }
    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.send_recv(send, dest, recv, source),
            UniverseComm::Serial(comm) => comm.send_recv(send, dest, recv, source),
        }
    }
    fn all_gather(&self, send: &[f64], recv: &mut [f64]) {
        match self {
            #[cfg(feature = "mpi")]
            UniverseComm::Mpi(comm) => comm.all_gather(send, recv),
            UniverseComm::Serial(comm) => comm.all_gather(send, recv),
        }
    }
}
