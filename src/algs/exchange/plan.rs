//! Exchange planner: which region of which source patch lands where.
//!
//! A plan is a pure function of the two layouts, their ghost widths and the
//! periodicity. Every rank builds the identical plan, so the plan order doubles
//! as the message schedule.

use crate::data::distribution::DistributionMap;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::box_array::BoxArray;
use crate::geometry::index_box::IndexBox;
use crate::geometry::int_vect::IntVect;
use crate::geometry::periodicity::Periodicity;
use crate::patch_error::PatchSieveError;
use std::collections::BTreeSet;

/// One operand of a plan: geometry, ownership and the ghost width used for matching.
#[derive(Copy, Clone, Debug)]
pub struct PlanSide<'a, const D: usize> {
    pub geometry: &'a BoxArray<D>,
    pub dmap: &'a DistributionMap,
    pub ngrow: i64,
}

impl<'a, const D: usize> PlanSide<'a, D> {
    pub fn new(geometry: &'a BoxArray<D>, dmap: &'a DistributionMap, ngrow: i64) -> Self {
        Self {
            geometry,
            dmap,
            ngrow,
        }
    }

    fn validate(&self, what: &str) -> Result<(), PatchSieveError> {
        if self.geometry.len() != self.dmap.len() {
            return Err(PatchSieveError::Configuration(format!(
                "{what}: geometry has {} boxes, distribution map {}",
                self.geometry.len(),
                self.dmap.len()
            )));
        }
        if self.ngrow < 0 {
            return Err(PatchSieveError::Configuration(format!(
                "{what}: negative ghost width {}",
                self.ngrow
            )));
        }
        Ok(())
    }
}

/// Which (source, destination) index pairs a plan considers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pairing {
    /// Every intersecting pair.
    AllIntersections,
    /// Only source `i` with destination `i`; both sides must have equal length.
    SameIndex,
}

/// A single transfer: `src_region` of source patch `src` feeds `dst_region`
/// of destination patch `dst`. The regions have equal shape and differ by `shift`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem<const D: usize> {
    pub src: usize,
    pub dst: usize,
    pub shift: IntVect<D>,
    pub src_region: IndexBox<D>,
    pub dst_region: IndexBox<D>,
    pub src_owner: usize,
    pub dst_owner: usize,
}

/// What a given rank does with a work item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// Both ends are owned here.
    Local,
    /// Pack and send to `to`.
    Send { to: usize },
    /// Receive from `from` and fuse.
    Recv { from: usize },
    /// Not involved.
    Bystander,
}

impl<const D: usize> WorkItem<D> {
    #[inline]
    pub fn is_local(&self) -> bool {
        self.src_owner == self.dst_owner
    }

    pub fn role(&self, rank: usize) -> Role {
        match (self.src_owner == rank, self.dst_owner == rank) {
            (true, true) => Role::Local,
            (true, false) => Role::Send { to: self.dst_owner },
            (false, true) => Role::Recv {
                from: self.src_owner,
            },
            (false, false) => Role::Bystander,
        }
    }

    /// Number of cells transferred per component.
    pub fn volume(&self) -> usize {
        self.dst_region.volume()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangePlan<const D: usize> {
    items: Vec<WorkItem<D>>,
}

impl<const D: usize> ExchangePlan<D> {
    /// Enumerate every transfer from `src` into `dst`.
    ///
    /// For each destination box grown by `dst.ngrow` and each periodic shift
    /// `s`, the box is translated by `s` and intersected with every source box
    /// grown by `src.ngrow`. The intersection is the source region; translated
    /// back by `-s` it is the destination region. Items are ordered by
    /// destination index, then source index, then shift.
    pub fn build(
        src: PlanSide<'_, D>,
        dst: PlanSide<'_, D>,
        period: &Periodicity<D>,
        pairing: Pairing,
    ) -> Result<Self, PatchSieveError> {
        src.validate("source")?;
        dst.validate("destination")?;
        if pairing == Pairing::SameIndex && src.geometry.len() != dst.geometry.len() {
            return Err(PatchSieveError::Configuration(format!(
                "index-paired exchange needs equal lengths, got {} and {}",
                src.geometry.len(),
                dst.geometry.len()
            )));
        }
        let shifts = period.shift_vectors();
        let per_dst = |d: usize| -> Vec<WorkItem<D>> {
            items_for_dst(&src, &dst, d, &shifts, pairing)
        };

        #[cfg(feature = "rayon")]
        let nested: Vec<Vec<WorkItem<D>>> = {
            use rayon::prelude::*;
            (0..dst.geometry.len()).into_par_iter().map(per_dst).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let nested: Vec<Vec<WorkItem<D>>> = (0..dst.geometry.len()).map(per_dst).collect();

        let plan = Self {
            items: nested.into_iter().flatten().collect(),
        };
        log::debug!(
            "exchange plan: {} items ({} local) over {} shift(s)",
            plan.items.len(),
            plan.items.iter().filter(|w| w.is_local()).count(),
            shifts.len()
        );
        crate::debug_invariants!(plan.validate_invariants(), "ExchangePlan::build");
        Ok(plan)
    }

    pub fn items(&self) -> &[WorkItem<D>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items this rank takes part in, in plan order, with its role.
    pub fn for_rank(&self, rank: usize) -> impl Iterator<Item = (&WorkItem<D>, Role)> + '_ {
        self.items
            .iter()
            .map(move |w| (w, w.role(rank)))
            .filter(|(_, r)| *r != Role::Bystander)
    }

    /// Ranks this rank exchanges messages with.
    pub fn peers(&self, rank: usize) -> BTreeSet<usize> {
        self.for_rank(rank)
            .filter_map(|(_, role)| match role {
                Role::Send { to } => Some(to),
                Role::Recv { from } => Some(from),
                _ => None,
            })
            .collect()
    }

    /// True when no item crosses a rank boundary.
    pub fn is_all_local(&self) -> bool {
        self.items.iter().all(WorkItem::is_local)
    }
}

fn items_for_dst<const D: usize>(
    src: &PlanSide<'_, D>,
    dst: &PlanSide<'_, D>,
    d: usize,
    shifts: &[IntVect<D>],
    pairing: Pairing,
) -> Vec<WorkItem<D>> {
    let dst_box = &dst.geometry[d];
    if dst_box.is_empty() {
        return Vec::new();
    }
    let grown = dst_box.grow(dst.ngrow);
    let mut out = Vec::new();
    for &shift in shifts {
        let query = grown.translate(shift);
        let hits = match pairing {
            Pairing::AllIntersections => src.geometry.intersections(&query, src.ngrow),
            Pairing::SameIndex => {
                let sb = &src.geometry[d];
                if sb.is_empty() {
                    Vec::new()
                } else {
                    let r = sb.grow(src.ngrow).intersect(&query);
                    if r.is_empty() { Vec::new() } else { vec![(d, r)] }
                }
            }
        };
        for (s, region) in hits {
            out.push(WorkItem {
                src: s,
                dst: d,
                shift,
                src_region: region,
                dst_region: region.translate(-shift),
                src_owner: src.dmap.as_slice()[s],
                dst_owner: dst.dmap.as_slice()[d],
            });
        }
    }
    out.sort_by(|a, b| (a.src, a.shift.0).cmp(&(b.src, b.shift.0)));
    out
}

impl<const D: usize> DebugInvariants for ExchangePlan<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ExchangePlan");
    }

    fn validate_invariants(&self) -> Result<(), PatchSieveError> {
        for pair in self.items.windows(2) {
            let key = |w: &WorkItem<D>| (w.dst, w.src, w.shift.0);
            if key(&pair[0]) >= key(&pair[1]) {
                return Err(PatchSieveError::Configuration(format!(
                    "plan items out of order at {}→{}",
                    pair[1].src, pair[1].dst
                )));
            }
        }
        for w in &self.items {
            if w.src_region.is_empty() || w.src_region.translate(-w.shift) != w.dst_region {
                return Err(PatchSieveError::Configuration(format!(
                    "item {}→{} regions {} / {} disagree with shift {}",
                    w.src, w.dst, w.src_region, w.dst_region, w.shift
                )));
            }
        }
        Ok(())
    }
}
