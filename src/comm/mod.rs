//! Thin façade over intra-process (threaded) or inter-process (MPI) message
//! passing.
//!
//! Messages are *contiguous byte slices*. All handles are **waitable** but
//! non-blocking — the eventual solver exchange step calls `.wait()` before it
//! trusts that a buffer is ready. The loader itself only uses the collective
//! side of this trait (barriers and allreduces); point-to-point handles exist
//! so schedule building can reserve them per peer per direction.

pub mod reduce;
pub mod schedule;

pub use reduce::ReduceOp;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering::Relaxed};
use std::thread::JoinHandle;

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Block until every rank has entered the barrier.
    fn barrier(&self);

    /// Synchronous allreduce of one scalar; identical result on every rank.
    fn allreduce_f64(&self, value: f64, op: ReduceOp) -> f64;

    /// Synchronous allreduce of one counter; identical result on every rank.
    fn allreduce_u64(&self, value: u64, op: ReduceOp) -> u64;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for single-rank runs and serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
    fn barrier(&self) {}
    fn allreduce_f64(&self, value: f64, _op: ReduceOp) -> f64 {
        value
    }
    fn allreduce_u64(&self, value: u64, _op: ReduceOp) -> u64 {
        value
    }
}

// --- LocalComm: simulated ranks on threads in one process ---

type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, Bytes>> = Lazy::new(DashMap::new);

/// Tags at or above this value are reserved for collectives.
const COLLECTIVE_TAG_BASE: u16 = 0xC000;

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.buf.lock().take()
    }
}

/// In-process communicator: each simulated rank lives on its own thread and
/// exchanges messages through a global mailbox. Ranks must execute the same
/// sequence of collective calls (the usual SPMD contract); the per-instance
/// sequence counter keys matching collective rounds onto matching tags.
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    collective_seq: AtomicU16,
}

impl LocalComm {
    pub fn new(rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self {
            rank,
            size,
            collective_seq: AtomicU16::new(0),
        }
    }

    /// Drop all queued messages. Tests sharing the global mailbox call this
    /// between scenarios.
    pub fn reset_mailbox() {
        MAILBOX.clear();
    }

    fn next_collective_tag(&self) -> u16 {
        COLLECTIVE_TAG_BASE | (self.collective_seq.fetch_add(1, Relaxed) & 0x0FFF)
    }

    /// All-gather one scalar payload; slot `r` of the result holds rank `r`'s
    /// contribution (own payload included), so every rank sees the same
    /// rank-ordered sequence.
    fn exchange_scalar(&self, payload: [u8; 8], tag: u16) -> Vec<[u8; 8]> {
        for peer in 0..self.size {
            if peer != self.rank {
                MAILBOX.insert((self.rank, peer, tag), Bytes::copy_from_slice(&payload));
            }
        }
        let mut gathered = vec![[0u8; 8]; self.size];
        gathered[self.rank] = payload;
        for peer in 0..self.size {
            if peer == self.rank {
                continue;
            }
            let key = (peer, self.rank, tag);
            loop {
                if let Some((_, bytes)) = MAILBOX.remove(&key) {
                    gathered[peer].copy_from_slice(&bytes[..8]);
                    break;
                }
                std::thread::yield_now();
            }
        }
        gathered
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        MAILBOX.insert((self.rank, peer, tag), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        let key = (peer, self.rank, tag);
        let buf_arc = Arc::new(Mutex::new(None));
        let buf_clone = Arc::clone(&buf_arc);
        let buf_len = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                if let Some((_, bytes)) = MAILBOX.remove(&key) {
                    *buf_clone.lock() = Some(bytes[..buf_len].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf: buf_arc,
            handle: Some(handle),
        }
    }

    fn barrier(&self) {
        // A zero-sum allreduce has barrier semantics on the mailbox.
        let _ = self.allreduce_u64(0, ReduceOp::Sum);
    }

    fn allreduce_f64(&self, value: f64, op: ReduceOp) -> f64 {
        if self.size == 1 {
            return value;
        }
        let tag = self.next_collective_tag();
        // Fold in rank order on every rank: float combination is not
        // associative, so a rank-dependent order would break the
        // identical-result contract.
        self.exchange_scalar(value.to_le_bytes(), tag)
            .into_iter()
            .map(f64::from_le_bytes)
            .reduce(|acc, v| op.combine_f64(acc, v))
            .unwrap_or(value)
    }

    fn allreduce_u64(&self, value: u64, op: ReduceOp) -> u64 {
        if self.size == 1 {
            return value;
        }
        let tag = self.next_collective_tag();
        self.exchange_scalar(value.to_le_bytes(), tag)
            .into_iter()
            .map(u64::from_le_bytes)
            .reduce(|acc, v| op.combine_u64(acc, v))
            .unwrap_or(value)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, ReduceOp, Wait};
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// MPI-backed communicator over `MPI_COMM_WORLD`.
    ///
    /// Point-to-point operations complete eagerly (blocking send, buffered
    /// receive), so `wait()` is trivially satisfied; the loader only exercises
    /// the collective calls on this backend.
    pub struct MpiComm {
        _universe: Universe,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                _universe: universe,
                world,
                rank,
                size,
            })
        }
    }

    pub struct MpiRecv(Option<Vec<u8>>);

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
        }

        fn irecv(&self, peer: usize, _tag: u16, buf: &mut [u8]) -> MpiRecv {
            let (data, _status) = self.world.process_at_rank(peer as i32).receive_vec::<u8>();
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            MpiRecv(Some(data))
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn allreduce_f64(&self, value: f64, op: ReduceOp) -> f64 {
            let mut out = 0.0f64;
            match op {
                ReduceOp::Sum => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::sum()),
                ReduceOp::Max => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::max()),
                ReduceOp::Min => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::min()),
            }
            out
        }

        fn allreduce_u64(&self, value: u64, op: ReduceOp) -> u64 {
            let mut out = 0u64;
            match op {
                ReduceOp::Sum => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::sum()),
                ReduceOp::Max => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::max()),
                ReduceOp::Min => self
                    .world
                    .all_reduce_into(&value, &mut out, SystemOperation::min()),
            }
            out
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
