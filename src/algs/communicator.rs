//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! All handles are **waitable** but non-blocking: the data mover posts every
//! receive and send of an operation first and calls `.wait()` on all of them
//! before it trusts a buffer or returns.

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::Arc;

/// Point-to-point message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommTag(u32);

impl CommTag {
    pub const fn new(tag: u32) -> Self {
        Self(tag)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Tag `k` steps after this one.
    #[inline]
    pub const fn offset(self, k: u32) -> Self {
        Self(self.0.wrapping_add(k))
    }
}

impl Default for CommTag {
    fn default() -> Self {
        Self(0xFAB0)
    }
}

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This process's rank.
    fn rank(&self) -> usize;
    /// Number of processes in the group.
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `len` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Self::RecvHandle;

    /// True for the single-process no-op backend.
    fn is_no_comm(&self) -> bool {
        false
    }
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

/// Compile-time no-op comm for pure serial use: rank 0 of 1.
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
    fn isend(&self, _peer: usize, _tag: CommTag, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: CommTag, _len: usize) {}
    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- RayonComm: several ranks as threads of one process ---
type Key = (usize, usize, u32); // (src, dst, tag)
// FIFO per key: a sender may run ahead into the next operation and reuse a tag
// before the receiver has drained the previous message.
type Mailbox = Arc<DashMap<Key, VecDeque<Bytes>>>;

static MAILBOX: Lazy<Mailbox> = Lazy::new(|| Arc::new(DashMap::new()));

/// Receive handle that polls the shared mailbox until its message arrives.
pub struct LocalHandle {
    mailbox: Mailbox,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            let popped = self
                .mailbox
                .get_mut(&self.key)
                .and_then(|mut queue| queue.pop_front());
            if let Some(bytes) = popped {
                if bytes.len() != self.len {
                    log::warn!(
                        "message {:?} carried {} bytes, {} expected",
                        self.key,
                        bytes.len(),
                        self.len
                    );
                }
                return Some(bytes.to_vec());
            }
            std::thread::yield_now();
        }
    }
}

/// In-process communicator: one instance per simulated rank, typically each on its own thread.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Mailbox,
}

impl RayonComm {
    /// Rank `rank` of `size`, sharing the process-global mailbox.
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size,
            mailbox: MAILBOX.clone(),
        }
    }

    /// An isolated group of `size` communicators with a private mailbox.
    pub fn world(size: usize) -> Vec<Self> {
        let mailbox: Mailbox = Arc::new(DashMap::new());
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                mailbox: mailbox.clone(),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag.as_u32());
        self.mailbox
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: CommTag, len: usize) -> Self::RecvHandle {
        LocalHandle {
            mailbox: self.mailbox.clone(),
            key: (peer, self.rank, tag.as_u32()),
            len,
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::request::StaticScope;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub struct MpiComm {
        _universe: Arc<mpi::environment::Universe>,
        pub world: Arc<SimpleCommunicator>,
        rank: usize,
        size: usize,
    }

    // MPI is driven from the thread that initialized it; the handles never cross threads.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        /// Initialize MPI and wrap the world communicator.
        pub fn new() -> Result<Self, crate::patch_error::PatchSieveError> {
            let universe = mpi::initialize().ok_or_else(|| {
                crate::patch_error::PatchSieveError::CommunicationFailure {
                    neighbor: 0,
                    reason: "MPI already initialized".into(),
                }
            })?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                _universe: Arc::new(universe),
                world: Arc::new(world),
                rank,
                size,
            })
        }

        /// Folded into the range every MPI implementation accepts. Folding may
        /// alias tags, but sends and receives of one peer pair are posted in plan
        /// order and MPI does not let messages with equal tags overtake.
        fn mpi_tag(tag: CommTag) -> i32 {
            (tag.as_u32() & 0x7FFF) as i32
        }
    }

    /// Send request plus the leaked buffer it reads from; reclaimed on wait.
    pub struct MpiSend {
        req: mpi::request::Request<'static, [u8], StaticScope>,
        buf: *mut [u8],
    }

    // The buffer is only touched by MPI until `wait` returns.
    unsafe impl Send for MpiSend {}

    impl Wait for MpiSend {
        fn wait(self) -> Option<Vec<u8>> {
            self.req.wait();
            // SAFETY: the request completed, MPI no longer reads the buffer.
            drop(unsafe { Box::from_raw(self.buf) });
            None
        }
    }

    /// Deferred blocking receive; every send of the operation is already posted.
    pub struct MpiRecv {
        world: Arc<SimpleCommunicator>,
        peer: i32,
        tag: i32,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let (msg, _status) = self
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            Some(msg)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSend;
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> MpiSend {
            let raw: *mut [u8] = Box::into_raw(buf.to_vec().into_boxed_slice());
            // SAFETY: `raw` stays alive until `MpiSend::wait` reclaims it.
            let leaked: &'static [u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, leaked, Self::mpi_tag(tag));
            MpiSend { req, buf: raw }
        }

        fn irecv(&self, peer: usize, tag: CommTag, _len: usize) -> MpiRecv {
            MpiRecv {
                world: self.world.clone(),
                peer: peer as i32,
                tag: Self::mpi_tag(tag),
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
