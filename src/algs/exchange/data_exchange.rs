//! Data mover: execute an [`ExchangePlan`] between two patch collections.
//!
//! The schedule is the plan order, identical on every rank:
//!
//! 1. post a receive for every remote item this rank owns the destination of,
//! 2. pack and send every remote item this rank owns the source of,
//! 3. wait on every receive, then on every send,
//! 4. fuse each item whose destination is local, in plan order, either straight
//!    from the local source patch or from its received buffer.
//!
//! All handles are drained before an error is returned, so a failed exchange
//! never leaves messages of this operation in flight.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::exchange::plan::{ExchangePlan, Role};
use crate::algs::wire::{self, WireHdr};
use crate::data::patch_collection::PatchCollection;
use crate::overlap::delta::ValueDelta;
use crate::patch_error::PatchSieveError;
use hashbrown::HashMap;
use std::ops::AddAssign;

/// Component window of an exchange: `n` components from `src` onward are read
/// and `n` components from `dst` onward are written.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompRange {
    pub src: usize,
    pub dst: usize,
    pub n: usize,
}

impl CompRange {
    pub fn new(src: usize, dst: usize, n: usize) -> Self {
        Self { src, dst, n }
    }

    /// `n` components starting at 0 on both sides.
    pub fn all(n: usize) -> Self {
        Self { src: 0, dst: 0, n }
    }
}

/// Per-rank traffic of one executed exchange.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    pub local: usize,
    pub sent: usize,
    pub received: usize,
    pub bytes_sent: usize,
}

impl AddAssign for ExchangeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.local += rhs.local;
        self.sent += rhs.sent;
        self.received += rhs.received;
        self.bytes_sent += rhs.bytes_sent;
    }
}

/// Tag of every remote item: `base + k`, where `k` counts the earlier remote
/// items of the same (sender, receiver) pair. Both ends derive the same value.
pub fn assign_tags<const D: usize>(plan: &ExchangePlan<D>, base: CommTag) -> Vec<Option<CommTag>> {
    let mut seen: HashMap<(usize, usize), u32> = HashMap::new();
    plan.items()
        .iter()
        .map(|w| {
            if w.is_local() {
                return None;
            }
            let k = seen.entry((w.src_owner, w.dst_owner)).or_insert(0);
            let tag = base.offset(*k);
            *k += 1;
            Some(tag)
        })
        .collect()
}

/// Check that `comm` describes the ranks the collections were laid out for.
pub fn check_comm<C: Communicator, const D: usize>(
    comm: &C,
    pcs: &[&PatchCollection<D>],
) -> Result<(), PatchSieveError> {
    for pc in pcs {
        let rank = pc.rank()?;
        if rank != comm.rank() {
            return Err(PatchSieveError::Configuration(format!(
                "collection belongs to rank {rank}, communicator is rank {}",
                comm.rank()
            )));
        }
        if let Some(max) = pc.distribution_map()?.max_rank() {
            if max >= comm.size() {
                return Err(PatchSieveError::Configuration(format!(
                    "distribution map names rank {max}, communicator has {} ranks",
                    comm.size()
                )));
            }
        }
    }
    Ok(())
}

/// Move data along `plan` from `src` into `dst`, fusing with `delta`.
///
/// Validation (component windows, communicator shape) happens before any
/// message is posted.
pub fn execute<C, F, const D: usize>(
    plan: &ExchangePlan<D>,
    src: &PatchCollection<D>,
    dst: &mut PatchCollection<D>,
    comps: CompRange,
    delta: &F,
    comm: &C,
    base_tag: CommTag,
) -> Result<ExchangeStats, PatchSieveError>
where
    C: Communicator,
    F: ValueDelta + ?Sized,
{
    src.check_comps(comps.src, comps.n)?;
    dst.check_comps(comps.dst, comps.n)?;
    check_comm(comm, &[src, &*dst])?;
    let rank = comm.rank();
    let tags = assign_tags(plan, base_tag);
    let mut stats = ExchangeStats::default();

    // --- post receives ---
    let mut pending_recv = Vec::new();
    for (k, w) in plan.items().iter().enumerate() {
        if let (Role::Recv { from }, Some(tag)) = (w.role(rank), tags[k]) {
            let len = wire::message_len(w.volume() * comps.n);
            pending_recv.push((k, from, comm.irecv(from, tag, len)));
        }
    }

    // --- pack and send ---
    let mut pending_send = Vec::new();
    let mut first_err: Option<PatchSieveError> = None;
    for (k, w) in plan.items().iter().enumerate() {
        if let (Role::Send { to }, Some(tag)) = (w.role(rank), tags[k]) {
            let packed = src
                .patch(w.src)
                .and_then(|p| p.pack(&w.src_region, comps.src, comps.n))
                .and_then(|values| WireHdr::new(values.len(), w.src, w.dst).map(|hdr| (hdr, values)));
            match packed {
                Ok((hdr, values)) => {
                    let bytes = wire::encode_values(hdr, &values);
                    stats.bytes_sent += bytes.len();
                    stats.sent += 1;
                    log::trace!("rank {rank}: item {}→{} to {to} tag {:?}", w.src, w.dst, tag);
                    pending_send.push(comm.isend(to, tag, &bytes));
                }
                // Peer still expects the message; send an empty buffer so it fails cleanly.
                Err(e) => {
                    pending_send.push(comm.isend(to, tag, &[]));
                    first_err.get_or_insert(e);
                }
            }
        }
    }

    // --- wait for everything ---
    let mut received: HashMap<usize, Vec<crate::Real>> = HashMap::new();
    for (k, from, h) in pending_recv {
        let w = &plan.items()[k];
        let raw = h.wait();
        let expected = match WireHdr::new(w.volume() * comps.n, w.src, w.dst) {
            Ok(hdr) => hdr,
            Err(e) => {
                first_err.get_or_insert(e);
                continue;
            }
        };
        match raw {
            Some(raw) => match wire::decode_values(&raw, &expected) {
                Ok(values) => {
                    received.insert(k, values);
                }
                Err(reason) => {
                    first_err.get_or_insert(PatchSieveError::CommunicationFailure {
                        neighbor: from,
                        reason,
                    });
                }
            },
            None if comm.is_no_comm() => {
                first_err.get_or_insert(PatchSieveError::Configuration(
                    "remote item with a single-process communicator".into(),
                ));
            }
            None => {
                first_err.get_or_insert(PatchSieveError::CommunicationFailure {
                    neighbor: from,
                    reason: "receive completed without data".into(),
                });
            }
        }
    }
    for h in pending_send {
        let _ = h.wait();
    }
    if let Some(e) = first_err {
        log::warn!("rank {rank}: exchange failed: {e}");
        return Err(e);
    }

    // --- fuse in plan order ---
    for (k, w) in plan.items().iter().enumerate() {
        match w.role(rank) {
            Role::Local => {
                let sp = src.patch(w.src)?;
                dst.patch_mut(w.dst)?.apply_from(
                    &w.dst_region,
                    comps.dst,
                    sp,
                    &w.src_region,
                    comps.src,
                    comps.n,
                    delta,
                )?;
                stats.local += 1;
            }
            Role::Recv { .. } => {
                let values = received.remove(&k).ok_or_else(|| PatchSieveError::CommunicationFailure {
                    neighbor: w.src_owner,
                    reason: format!("no buffer for item {}→{}", w.src, w.dst),
                })?;
                dst.patch_mut(w.dst)?
                    .unpack_with(&w.dst_region, comps.dst, comps.n, &values, delta)?;
                stats.received += 1;
            }
            Role::Send { .. } | Role::Bystander => {}
        }
    }
    log::debug!(
        "rank {rank}: exchange done ({} local, {} sent, {} received, {} bytes out)",
        stats.local,
        stats.sent,
        stats.received,
        stats.bytes_sent
    );
    Ok(stats)
}
