//! PatchCollection: the distributed array of field patches.
//!
//! A collection couples a shared [`BoxArray`] and [`DistributionMap`] with the
//! [`FieldPatch`]es of the indices the local rank owns. Patches live in an arena
//! (`Vec`) in ascending geometry-index order; a small index map resolves a
//! geometry index to its arena slot. Patches of other ranks simply do not exist
//! here, so no call on this process can mutate them.
//!
//! # Invariants
//!
//! - The distribution map has one entry per geometry box.
//! - Arena slot `k` holds the patch for `owned[k]`, and `owned` equals
//!   `dmap.owned_by(rank)`.
//! - Every patch box equals its geometry box grown by `ngrow`, and carries
//!   exactly `ncomp` components. Patches are never resized.
//!
//! A collection may be default-constructed and later defined exactly once;
//! every operation on an undefined collection fails with `NotDefined`.

use crate::data::distribution::DistributionMap;
use crate::data::field_patch::{FieldPatch, PatchMut};
use crate::debug_invariants::DebugInvariants;
use crate::geometry::box_array::BoxArray;
use crate::geometry::index_box::IndexBox;
use crate::patch_error::PatchSieveError;
use crate::Real;
use hashbrown::HashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Layout<const D: usize> {
    geometry: Arc<BoxArray<D>>,
    dmap: Arc<DistributionMap>,
    ncomp: usize,
    ngrow: i64,
    rank: usize,
}

#[derive(Clone, Debug, Default)]
pub struct PatchCollection<const D: usize> {
    layout: Option<Layout<D>>,
    patches: Vec<FieldPatch<D>>,
    owned: Vec<usize>,
    slot_of: HashMap<usize, usize>,
    mutations: Vec<usize>,
}

impl<const D: usize> PatchCollection<D> {
    /// Build the collection and allocate zero-filled patches for the indices `rank` owns.
    pub fn new(
        geometry: impl Into<Arc<BoxArray<D>>>,
        dmap: impl Into<Arc<DistributionMap>>,
        ncomp: usize,
        ngrow: i64,
        rank: usize,
    ) -> Result<Self, PatchSieveError> {
        let mut pc = Self::default();
        pc.define(geometry, dmap, ncomp, ngrow, rank)?;
        Ok(pc)
    }

    /// Define a default-constructed collection. Fails if it is already defined.
    pub fn define(
        &mut self,
        geometry: impl Into<Arc<BoxArray<D>>>,
        dmap: impl Into<Arc<DistributionMap>>,
        ncomp: usize,
        ngrow: i64,
        rank: usize,
    ) -> Result<(), PatchSieveError> {
        if self.layout.is_some() {
            return Err(PatchSieveError::Configuration(
                "collection is already defined".into(),
            ));
        }
        let geometry = geometry.into();
        let dmap = dmap.into();
        if geometry.len() != dmap.len() {
            return Err(PatchSieveError::Configuration(format!(
                "geometry has {} boxes but distribution map has {} entries",
                geometry.len(),
                dmap.len()
            )));
        }
        if ncomp == 0 {
            return Err(PatchSieveError::Configuration(
                "a collection needs at least one component".into(),
            ));
        }
        if ngrow < 0 {
            return Err(PatchSieveError::Configuration(format!(
                "ghost width must be non-negative, got {ngrow}"
            )));
        }
        let owned: Vec<usize> = dmap.owned_by(rank).collect();
        self.patches = owned
            .iter()
            .map(|&i| FieldPatch::new(geometry[i].grow(ngrow), ncomp))
            .collect();
        self.slot_of = owned.iter().enumerate().map(|(k, &i)| (i, k)).collect();
        self.mutations = vec![0; owned.len()];
        self.owned = owned;
        self.layout = Some(Layout {
            geometry,
            dmap,
            ncomp,
            ngrow,
            rank,
        });
        crate::debug_invariants!(self.validate_invariants(), "PatchCollection::define");
        Ok(())
    }

    /// Release every patch and return to the undefined state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.layout.is_some()
    }

    fn layout(&self) -> Result<&Layout<D>, PatchSieveError> {
        self.layout.as_ref().ok_or(PatchSieveError::NotDefined)
    }

    pub fn box_array(&self) -> Result<&Arc<BoxArray<D>>, PatchSieveError> {
        Ok(&self.layout()?.geometry)
    }

    pub fn distribution_map(&self) -> Result<&Arc<DistributionMap>, PatchSieveError> {
        Ok(&self.layout()?.dmap)
    }

    /// Number of geometry entries (0 when undefined).
    pub fn len(&self) -> usize {
        self.layout.as_ref().map_or(0, |l| l.geometry.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared component count (0 when undefined).
    pub fn ncomp(&self) -> usize {
        self.layout.as_ref().map_or(0, |l| l.ncomp)
    }

    /// Ghost width of every patch (0 when undefined).
    pub fn ngrow(&self) -> i64 {
        self.layout.as_ref().map_or(0, |l| l.ngrow)
    }

    pub fn rank(&self) -> Result<usize, PatchSieveError> {
        Ok(self.layout()?.rank)
    }

    /// Allocated box of index `k`: the geometry box grown by the ghost width.
    pub fn fabbox(&self, k: usize) -> Result<IndexBox<D>, PatchSieveError> {
        let l = self.layout()?;
        l.geometry
            .get(k)
            .map(|b| b.grow(l.ngrow))
            .ok_or_else(|| PatchSieveError::Configuration(format!("index {k} outside geometry")))
    }

    /// Geometry indices owned by the local rank, ascending.
    pub fn owned_indices(&self) -> &[usize] {
        &self.owned
    }

    pub fn is_local(&self, k: usize) -> bool {
        self.slot_of.contains_key(&k)
    }

    fn slot(&self, k: usize) -> Result<usize, PatchSieveError> {
        let l = self.layout()?;
        self.slot_of
            .get(&k)
            .copied()
            .ok_or(PatchSieveError::MissingPatch {
                index: k,
                rank: l.rank,
            })
    }

    pub fn patch(&self, k: usize) -> Result<&FieldPatch<D>, PatchSieveError> {
        let s = self.slot(k)?;
        Ok(&self.patches[s])
    }

    /// Value access to a locally owned patch; counted in [`mutation_counts`](Self::mutation_counts).
    pub fn patch_mut(&mut self, k: usize) -> Result<PatchMut<'_, D>, PatchSieveError> {
        let s = self.slot(k)?;
        self.mutations[s] += 1;
        Ok(PatchMut::new(&mut self.patches[s]))
    }

    /// `(geometry index, patch)` for every locally owned patch, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldPatch<D>)> {
        self.owned.iter().copied().zip(self.patches.iter())
    }

    /// Number of mutable accesses each local patch has received.
    pub fn mutation_counts(&self) -> BTreeMap<usize, usize> {
        self.owned
            .iter()
            .copied()
            .zip(self.mutations.iter().copied())
            .collect()
    }

    /// `ComponentRange` unless `[comp, comp+n)` fits the declared component count.
    pub fn check_comps(&self, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        let ncomp = self.layout()?.ncomp;
        match comp.checked_add(n) {
            Some(end) if end <= ncomp => Ok(()),
            _ => Err(PatchSieveError::ComponentRange {
                comp,
                ncomp: n,
                available: ncomp,
            }),
        }
    }

    /// Same geometry and same ownership.
    pub fn same_layout(&self, other: &Self) -> Result<bool, PatchSieveError> {
        let (a, b) = (self.layout()?, other.layout()?);
        Ok((Arc::ptr_eq(&a.geometry, &b.geometry) || a.geometry == b.geometry)
            && (Arc::ptr_eq(&a.dmap, &b.dmap) || a.dmap == b.dmap))
    }

    /// Uniform fill of every component of every local patch; no exchange.
    pub fn set_val(&mut self, v: Real) -> Result<(), PatchSieveError> {
        let n = self.layout()?.ncomp;
        self.set_val_comps(v, 0, n)
    }

    /// Uniform fill of components `[comp, comp+n)`; no exchange.
    pub fn set_val_comps(&mut self, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        self.check_comps(comp, n)?;
        for (p, m) in self.patches.iter_mut().zip(self.mutations.iter_mut()) {
            p.fill(v, comp, n)?;
            *m += 1;
        }
        Ok(())
    }

    fn check_shape(&self, k: usize, patch: &FieldPatch<D>) -> Result<(), PatchSieveError> {
        let expect = self.fabbox(k)?;
        let ncomp = self.ncomp();
        if *patch.bx() != expect
            || patch.ncomp() != ncomp
            || patch.data().len() != expect.volume() * ncomp
        {
            return Err(PatchSieveError::Configuration(format!(
                "patch {} × {} does not match slot {k} ({expect} × {ncomp})",
                patch.bx(),
                patch.ncomp()
            )));
        }
        Ok(())
    }

    /// Replace local patches wholesale, keeping every box and component count.
    /// Either every patch is swapped in or, on error, none is.
    pub(crate) fn replace_patches(
        &mut self,
        pieces: Vec<(usize, FieldPatch<D>)>,
    ) -> Result<(), PatchSieveError> {
        let mut slots = Vec::with_capacity(pieces.len());
        for (k, patch) in &pieces {
            self.check_shape(*k, patch)?;
            slots.push(self.slot(*k)?);
        }
        for (s, (_, patch)) in slots.into_iter().zip(pieces) {
            self.mutations[s] += 1;
            self.patches[s] = patch;
        }
        Ok(())
    }
}

impl<const D: usize> DebugInvariants for PatchCollection<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "PatchCollection");
    }

    fn validate_invariants(&self) -> Result<(), PatchSieveError> {
        let Some(l) = self.layout.as_ref() else {
            return if self.patches.is_empty() {
                Ok(())
            } else {
                Err(PatchSieveError::Configuration(
                    "undefined collection holds patches".into(),
                ))
            };
        };
        if l.geometry.len() != l.dmap.len() {
            return Err(PatchSieveError::Configuration(
                "geometry/distribution length mismatch".into(),
            ));
        }
        if !self.owned.iter().copied().eq(l.dmap.owned_by(l.rank)) {
            return Err(PatchSieveError::Configuration(format!(
                "local patches do not match ownership of rank {}",
                l.rank
            )));
        }
        for (&k, p) in self.owned.iter().zip(self.patches.iter()) {
            if *p.bx() != l.geometry[k].grow(l.ngrow) || p.ncomp() != l.ncomp {
                return Err(PatchSieveError::Configuration(format!(
                    "patch {k} has box {} × {}, expected {} × {}",
                    p.bx(),
                    p.ncomp(),
                    l.geometry[k].grow(l.ngrow),
                    l.ncomp
                )));
            }
        }
        Ok(())
    }
}
