//! In-process communicator: one thread per rank, messages over channels.
//!
//! This runs an x-decomposed problem on the threads of a single process with the
//! same message pattern as MPI. Messages between a pair of ranks arrive in the
//! order they were sent, so every rank must issue its collectives in the same
//! order, exactly as with MPI.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Barrier};

use super::Comm;

/// One rank of a group created by [`ChannelComm::group`].
pub struct ChannelComm {
    rank: usize,
    size: usize,
    /// `outboxes[dest]` carries messages from this rank to `dest`
    outboxes: Vec<Sender<Vec<f64>>>,
    /// `inboxes[source]` carries messages from `source` to this rank
    inboxes: Vec<Receiver<Vec<f64>>>,
    barrier: Arc<Barrier>,
}

impl ChannelComm {
    /// The `size` ranks of a new group. Move each into its own thread.
    pub fn group(size: usize) -> Vec<ChannelComm> {
        let barrier = Arc::new(Barrier::new(size));
        let mut outboxes: Vec<Vec<Sender<Vec<f64>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Vec<f64>>>> = (0..size).map(|_| Vec::with_capacity(size)).collect();
        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = channel();
                outboxes[from].push(tx);
                inboxes[to].push(rx);
            }
        }
        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ChannelComm {
                rank,
                size,
                outboxes,
                inboxes,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }

    /// Run `f` once per rank on `size` scoped threads and collect the results in
    /// rank order. A panic on any rank is resumed on the caller.
    pub fn run<R, F>(size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(ChannelComm) -> R + Sync,
    {
        let f = &f;
        std::thread::scope(|s| {
            let handles: Vec<_> = Self::group(size)
                .into_iter()
                .map(|comm| s.spawn(move || f(comm)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    fn post(&self, dest: usize, data: &[f64]) {
        // a peer that hung up has panicked; that panic is reported by its own thread
        let _ = self.outboxes[dest].send(data.to_vec());
    }

    fn take(&self, source: usize) -> Vec<f64> {
        match self.inboxes[source].recv() {
            Ok(data) => data,
            Err(_) => panic!("rank {source} hung up before sending to rank {}", self.rank),
        }
    }

    fn gather_scalars(&self, x: f64) -> Vec<f64> {
        let mut all = vec![0.0; self.size];
        self.all_gather(&[x], &mut all);
        all
    }
}

impl Comm for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) {
        self.barrier.wait();
    }

    /// Summed in rank order, so every rank gets the same bits.
    fn all_reduce_sum(&self, x: f64) -> f64 {
        self.gather_scalars(x).iter().sum()
    }

    /// NaN on any rank gives NaN.
    fn all_reduce_max(&self, x: f64) -> f64 {
        self.gather_scalars(x)
            .into_iter()
            .fold(f64::NEG_INFINITY, |m, v| if m.is_nan() || v.is_nan() { f64::NAN } else { m.max(v) })
    }

    fn send_recv(&self, send: &[f64], dest: Option<usize>, recv: &mut [f64], source: Option<usize>) {
        if let Some(dest) = dest {
            self.post(dest, send);
        }
        if let Some(source) = source {
            recv.copy_from_slice(&self.take(source));
        }
    }

    fn all_gather(&self, send: &[f64], recv: &mut [f64]) {
        assert_eq!(
            recv.len(),
            send.len() * self.size,
            "all_gather receive buffer must hold size * send.len() values"
        );
        if send.is_empty() {
            return;
        }
        for dest in 0..self.size {
            self.post(dest, send);
        }
        for (source, chunk) in recv.chunks_mut(send.len()).enumerate() {
            chunk.copy_from_slice(&self.take(source));
        }
    }
}
