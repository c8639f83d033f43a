//! BoundarySet: a patch collection of face-aligned patches holding boundary data.
//!
//! Every exchange here is the same three steps: build an [`ExchangePlan`]
//! between two layouts, pick a fusion rule, run the data mover. The rule is
//! [`CopyDelta`] for the `copy_*` family, [`AddDelta`] for the `plus_*` family
//! and [`LinCombDelta`] for `lin_comb`.
//!
//! Patches of a set may overlap one another and need not agree where they do.
//! Pulling from a set into a grid is therefore order dependent: at a cell that
//! several set patches reach, an overwrite keeps the value of the highest
//! contributing set index.
//!
//! All exchange operations are collective: every rank of the communicator must
//! call them in the same order with the same layouts.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::exchange::data_exchange::{self, CompRange, ExchangeStats};
use crate::algs::exchange::plan::{ExchangePlan, Pairing, PlanSide};
use crate::data::distribution::DistributionMap;
use crate::data::field_patch::{FieldPatch, PatchMut};
use crate::data::patch_collection::PatchCollection;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::box_array::BoxArray;
use crate::geometry::index_box::IndexBox;
use crate::geometry::orientation::Orientation;
use crate::geometry::periodicity::Periodicity;
use crate::io::PatchStore;
use crate::overlap::delta::{AddDelta, CopyDelta, LinCombDelta, ValueDelta};
use crate::patch_error::PatchSieveError;
use crate::Real;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Runtime knobs of the exchange operations of one set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// First tag used for the point-to-point messages of an operation.
    pub base_tag: CommTag,
    /// Validate every plan before it runs.
    pub check_invariants: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_tag: CommTag::default(),
            check_invariants: cfg!(feature = "check-invariants"),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BoundarySet<const D: usize> {
    pc: PatchCollection<D>,
    config: ExchangeConfig,
}

fn side<const D: usize>(pc: &PatchCollection<D>, ngrow: i64) -> Result<PlanSide<'_, D>, PatchSieveError> {
    Ok(PlanSide::new(pc.box_array()?, pc.distribution_map()?, ngrow))
}

fn check_ghost_width<const D: usize>(
    pc: &PatchCollection<D>,
    ngrow: i64,
) -> Result<(), PatchSieveError> {
    if ngrow < 0 || ngrow > pc.ngrow() {
        return Err(PatchSieveError::Configuration(format!(
            "ghost width {ngrow} outside the grid's allocated 0..={}",
            pc.ngrow()
        )));
    }
    Ok(())
}

fn run<C, F, const D: usize>(
    config: &ExchangeConfig,
    plan: &ExchangePlan<D>,
    src: &PatchCollection<D>,
    dst: &mut PatchCollection<D>,
    comps: CompRange,
    delta: &F,
    comm: &C,
) -> Result<ExchangeStats, PatchSieveError>
where
    C: Communicator,
    F: ValueDelta + ?Sized,
{
    if config.check_invariants {
        plan.validate_invariants()?;
    }
    if plan.is_empty() {
        log::warn!("exchange between layouts that share no cells");
    }
    data_exchange::execute(plan, src, dst, comps, delta, comm, config.base_tag)
}

impl<const D: usize> BoundarySet<D> {
    /// A set over `geometry` owned per `dmap`, as seen from `rank`.
    pub fn new(
        geometry: impl Into<Arc<BoxArray<D>>>,
        dmap: impl Into<Arc<DistributionMap>>,
        ncomp: usize,
        rank: usize,
    ) -> Result<Self, PatchSieveError> {
        let mut set = Self::default();
        set.define(geometry, dmap, ncomp, rank)?;
        Ok(set)
    }

    /// The `width`-cell slab outside `face` of every grid box, one patch per box.
    pub fn from_grid_faces(
        grids: &BoxArray<D>,
        face: Orientation,
        width: i64,
        ncomp: usize,
        dmap: impl Into<Arc<DistributionMap>>,
        rank: usize,
    ) -> Result<Self, PatchSieveError> {
        if width < 1 {
            return Err(PatchSieveError::Configuration(format!(
                "face width must be positive, got {width}"
            )));
        }
        Self::new(grids.adj_cells(face, width), dmap, ncomp, rank)
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Define a default-constructed set. Fails if it is already defined.
    pub fn define(
        &mut self,
        geometry: impl Into<Arc<BoxArray<D>>>,
        dmap: impl Into<Arc<DistributionMap>>,
        ncomp: usize,
        rank: usize,
    ) -> Result<(), PatchSieveError> {
        self.pc.define(geometry, dmap, ncomp, 0, rank)
    }

    pub fn clear(&mut self) {
        self.pc.clear();
    }

    pub fn is_defined(&self) -> bool {
        self.pc.is_defined()
    }

    pub fn len(&self) -> usize {
        self.pc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pc.is_empty()
    }

    pub fn ncomp(&self) -> usize {
        self.pc.ncomp()
    }

    pub fn box_array(&self) -> Result<&Arc<BoxArray<D>>, PatchSieveError> {
        self.pc.box_array()
    }

    pub fn distribution_map(&self) -> Result<&Arc<DistributionMap>, PatchSieveError> {
        self.pc.distribution_map()
    }

    pub fn fabbox(&self, k: usize) -> Result<IndexBox<D>, PatchSieveError> {
        self.pc.fabbox(k)
    }

    pub fn patch(&self, k: usize) -> Result<&FieldPatch<D>, PatchSieveError> {
        self.pc.patch(k)
    }

    pub fn patch_mut(&mut self, k: usize) -> Result<PatchMut<'_, D>, PatchSieveError> {
        self.pc.patch_mut(k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FieldPatch<D>)> {
        self.pc.iter()
    }

    pub fn mutation_counts(&self) -> BTreeMap<usize, usize> {
        self.pc.mutation_counts()
    }

    /// The underlying collection.
    pub fn as_collection(&self) -> &PatchCollection<D> {
        &self.pc
    }

    /// Plan and run a transfer from `src` (matched with ghost width `src_ngrow`) into this set.
    #[allow(clippy::too_many_arguments)]
    fn pull<C, F>(
        &mut self,
        src: &PatchCollection<D>,
        src_ngrow: i64,
        period: &Periodicity<D>,
        pairing: Pairing,
        comps: CompRange,
        delta: &F,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError>
    where
        C: Communicator,
        F: ValueDelta + ?Sized,
    {
        self.pc.check_comps(comps.dst, comps.n)?;
        src.check_comps(comps.src, comps.n)?;
        let plan = ExchangePlan::build(side(src, src_ngrow)?, side(&self.pc, 0)?, period, pairing)?;
        run(&self.config, &plan, src, &mut self.pc, comps, delta, comm)
    }

    /// Plan and run a transfer from this set into `dst` grown by `ngrow`.
    fn push<C, F>(
        &self,
        dst: &mut PatchCollection<D>,
        ngrow: i64,
        period: &Periodicity<D>,
        comps: CompRange,
        delta: &F,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError>
    where
        C: Communicator,
        F: ValueDelta + ?Sized,
    {
        self.pc.check_comps(comps.src, comps.n)?;
        dst.check_comps(comps.dst, comps.n)?;
        check_ghost_width(dst, ngrow)?;
        let plan = ExchangePlan::build(
            side(&self.pc, 0)?,
            side(dst, ngrow)?,
            period,
            Pairing::AllIntersections,
        )?;
        run(&self.config, &plan, &self.pc, dst, comps, delta, comm)
    }

    /// Overwrite from another set wherever their patches intersect.
    pub fn copy_from<C: Communicator>(
        &mut self,
        src: &BoundarySet<D>,
        comps: CompRange,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pull(
            &src.pc,
            0,
            &Periodicity::non_periodic(),
            Pairing::AllIntersections,
            comps,
            &CopyDelta,
            comm,
        )
    }

    /// Overwrite from a distributed grid whose boxes are grown by `ngrow`.
    pub fn copy_from_grid<C: Communicator>(
        &mut self,
        src: &PatchCollection<D>,
        ngrow: i64,
        comps: CompRange,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pc.check_comps(comps.dst, comps.n)?;
        src.check_comps(comps.src, comps.n)?;
        check_ghost_width(src, ngrow)?;
        self.pull(
            src,
            ngrow,
            &Periodicity::non_periodic(),
            Pairing::AllIntersections,
            comps,
            &CopyDelta,
            comm,
        )
    }

    /// Accumulate from another set wherever their patches intersect.
    pub fn plus_from<C: Communicator>(
        &mut self,
        src: &BoundarySet<D>,
        comps: CompRange,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pull(
            &src.pc,
            0,
            &Periodicity::non_periodic(),
            Pairing::AllIntersections,
            comps,
            &AddDelta,
            comm,
        )
    }

    /// Accumulate from a grid grown by `ngrow`, including periodic images.
    pub fn plus_from_grid<C: Communicator>(
        &mut self,
        src: &PatchCollection<D>,
        ngrow: i64,
        comps: CompRange,
        period: &Periodicity<D>,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pc.check_comps(comps.dst, comps.n)?;
        src.check_comps(comps.src, comps.n)?;
        check_ghost_width(src, ngrow)?;
        self.pull(
            src,
            ngrow,
            period,
            Pairing::AllIntersections,
            comps,
            &AddDelta,
            comm,
        )
    }

    /// Overwrite the cells of `dst` (grown by `ngrow`) that this set covers.
    pub fn copy_to<C: Communicator>(
        &self,
        dst: &mut PatchCollection<D>,
        ngrow: i64,
        comps: CompRange,
        period: &Periodicity<D>,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.push(dst, ngrow, period, comps, &CopyDelta, comm)
    }

    /// Add this set into the cells of `dst` (grown by `ngrow`) it covers.
    pub fn plus_to<C: Communicator>(
        &self,
        dst: &mut PatchCollection<D>,
        ngrow: i64,
        comps: CompRange,
        period: &Periodicity<D>,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.push(dst, ngrow, period, comps, &AddDelta, comm)
    }

    /// `self = a * self + b * src`, patch by patch. Both sets share one geometry;
    /// their distribution maps may differ.
    pub fn lin_comb<C: Communicator>(
        &mut self,
        a: Real,
        b: Real,
        src: &BoundarySet<D>,
        comps: CompRange,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pc.check_comps(comps.dst, comps.n)?;
        src.pc.check_comps(comps.src, comps.n)?;
        if self.box_array()? != src.box_array()? {
            return Err(PatchSieveError::Configuration(
                "lin_comb needs sets over the same geometry".into(),
            ));
        }
        self.pull(
            &src.pc,
            0,
            &Periodicity::non_periodic(),
            Pairing::SameIndex,
            comps,
            &LinCombDelta::new(a, b),
            comm,
        )
    }

    /// `self[dcomp..dcomp+n] = a * mfa[a_comp..] + b * mfb[b_comp..]` wherever
    /// the grids, grown by `ngrow`, cover this set. Other cells are left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn lin_comb_grids<C: Communicator>(
        &mut self,
        a: Real,
        mfa: &PatchCollection<D>,
        a_comp: usize,
        b: Real,
        mfb: &PatchCollection<D>,
        b_comp: usize,
        dcomp: usize,
        n: usize,
        ngrow: i64,
        comm: &C,
    ) -> Result<ExchangeStats, PatchSieveError> {
        self.pc.check_comps(dcomp, n)?;
        mfa.check_comps(a_comp, n)?;
        mfb.check_comps(b_comp, n)?;
        if !mfa.same_layout(mfb)? {
            return Err(PatchSieveError::Configuration(
                "lin_comb_grids needs two grids with the same layout".into(),
            ));
        }
        check_ghost_width(mfa, ngrow)?;
        check_ghost_width(mfb, ngrow)?;
        if n == 0 {
            return Ok(ExchangeStats::default());
        }
        let plan = ExchangePlan::build(
            side(mfa, ngrow)?,
            side(&self.pc, 0)?,
            &Periodicity::non_periodic(),
            Pairing::AllIntersections,
        )?;
        let rank = self.pc.rank()?;
        let scratch = || {
            PatchCollection::new(
                self.pc.box_array()?.clone(),
                self.pc.distribution_map()?.clone(),
                n,
                0,
                rank,
            )
        };
        let (mut ta, mut tb) = (scratch()?, scratch()?);
        let mut stats = run(&self.config, &plan, mfa, &mut ta, CompRange::new(a_comp, 0, n), &CopyDelta, comm)?;
        stats += run(&self.config, &plan, mfb, &mut tb, CompRange::new(b_comp, 0, n), &CopyDelta, comm)?;
        for w in plan.items().iter().filter(|w| w.dst_owner == rank) {
            self.pc.patch_mut(w.dst)?.lin_comb_from(
                &w.dst_region,
                dcomp,
                a,
                ta.patch(w.dst)?,
                0,
                b,
                tb.patch(w.dst)?,
                0,
                n,
            )?;
        }
        Ok(stats)
    }

    /// Uniform fill of every component; no exchange.
    pub fn set_val(&mut self, v: Real) -> Result<(), PatchSieveError> {
        self.pc.set_val(v)
    }

    /// Uniform fill of components `[comp, comp+n)`; no exchange.
    pub fn set_val_comps(&mut self, v: Real, comp: usize, n: usize) -> Result<(), PatchSieveError> {
        self.pc.set_val_comps(v, comp, n)
    }

    /// Copy every owned patch of `src` into `dst` without communication.
    /// Both sets share geometry, ownership and component count.
    pub fn copy_local(dst: &mut Self, src: &Self) -> Result<(), PatchSieveError> {
        if !dst.pc.same_layout(&src.pc)? || dst.ncomp() != src.ncomp() {
            return Err(PatchSieveError::Configuration(
                "copy_local needs sets with the same layout and component count".into(),
            ));
        }
        let n = src.ncomp();
        for (k, sp) in src.pc.iter() {
            let bx = *sp.bx();
            dst.pc.patch_mut(k)?.overwrite(&bx, 0, sp, &bx, 0, n)?;
        }
        Ok(())
    }

    /// Save the locally owned patches under `name`.
    pub fn write<S: PatchStore>(&self, store: &S, name: &str) -> Result<(), PatchSieveError> {
        store.save(name, &self.pc)
    }

    /// Restore the locally owned patches saved under `name` into this defined set.
    pub fn read<S: PatchStore>(&mut self, store: &S, name: &str) -> Result<(), PatchSieveError> {
        store.load(name, &mut self.pc)
    }

    /// Moving a set onto a larger process group is not supported.
    pub fn add_procs_to_comp<C: Communicator>(
        &mut self,
        _io_proc: usize,
        _comm: &C,
    ) -> Result<(), PatchSieveError> {
        log::error!("BoundarySet::add_procs_to_comp called; no redistribution path exists");
        Err(PatchSieveError::Unsupported(
            "BoundarySet::add_procs_to_comp",
        ))
    }
}

impl<const D: usize> DebugInvariants for BoundarySet<D> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "BoundarySet");
    }

    fn validate_invariants(&self) -> Result<(), PatchSieveError> {
        if self.pc.ngrow() != 0 {
            return Err(PatchSieveError::Configuration(
                "boundary set patches carry no ghost cells".into(),
            ));
        }
        self.pc.validate_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::geometry::IntVect;

    fn one_d(boxes: &[(i64, i64)]) -> BoxArray<1> {
        boxes.iter().map(|&(l, h)| IndexBox::new([l], [h])).collect()
    }

    fn serial_set(boxes: &[(i64, i64)], ncomp: usize) -> BoundarySet<1> {
        let ba = one_d(boxes);
        let dm = DistributionMap::single_owner(ba.len(), 0);
        BoundarySet::new(ba, dm, ncomp, 0).unwrap()
    }

    fn serial_grid(boxes: &[(i64, i64)], ncomp: usize, ngrow: i64) -> PatchCollection<1> {
        let ba = one_d(boxes);
        let dm = DistributionMap::single_owner(ba.len(), 0);
        PatchCollection::new(ba, dm, ncomp, ngrow, 0).unwrap()
    }

    fn at(pc: &PatchCollection<1>, k: usize, i: i64, c: usize) -> Real {
        pc.patch(k).unwrap().get(&IntVect([i]), c).unwrap()
    }

    #[test]
    fn overlapping_set_patches_overwrite_in_index_order() {
        let mut set = serial_set(&[(-1, -1), (-2, -1)], 1);
        set.patch_mut(0).unwrap().fill(1.5, 0, 1).unwrap();
        set.patch_mut(1).unwrap().fill(4.0, 0, 1).unwrap();
        let none = Periodicity::non_periodic();

        let mut grid = serial_grid(&[(0, 9)], 1, 1);
        set.copy_to(&mut grid, 1, CompRange::all(1), &none, &NoComm).unwrap();
        assert_eq!(at(&grid, 0, -1, 0), 4.0);

        let mut grid = serial_grid(&[(0, 9)], 1, 1);
        set.plus_to(&mut grid, 1, CompRange::all(1), &none, &NoComm).unwrap();
        assert_eq!(at(&grid, 0, -1, 0), 5.5);
    }

    #[test]
    fn periodic_copy_to_wraps_across_domain() {
        let mut set = serial_set(&[(10, 10)], 1);
        set.set_val(7.0).unwrap();
        let per = Periodicity::new([Some(10)]).unwrap();

        let mut grid = serial_grid(&[(0, 9)], 1, 0);
        set.copy_to(&mut grid, 0, CompRange::all(1), &per, &NoComm).unwrap();
        assert_eq!(at(&grid, 0, 0, 0), 7.0);
        assert_eq!(at(&grid, 0, 9, 0), 0.0);

        let mut plain = serial_grid(&[(0, 9)], 1, 0);
        set.copy_to(&mut plain, 0, CompRange::all(1), &Periodicity::non_periodic(), &NoComm)
            .unwrap();
        assert_eq!(at(&plain, 0, 0, 0), 0.0);
    }

    #[test]
    fn copy_from_grid_then_copy_to_round_trips() {
        let mut grid = serial_grid(&[(0, 4), (5, 9)], 2, 0);
        for k in 0..2 {
            let mut p = grid.patch_mut(k).unwrap();
            for iv in p.bx().cells().collect::<Vec<_>>() {
                p.set(&iv, 1, (iv.0[0] * iv.0[0]) as Real).unwrap();
            }
        }
        let mut set = serial_set(&[(3, 6), (8, 9)], 1);
        set.copy_from_grid(&grid, 0, CompRange::new(1, 0, 1), &NoComm).unwrap();
        let mut back = serial_grid(&[(0, 4), (5, 9)], 2, 0);
        set.copy_to(&mut back, 0, CompRange::new(0, 1, 1), &Periodicity::non_periodic(), &NoComm)
            .unwrap();
        for i in [3, 4, 5, 6, 8, 9] {
            let k = usize::from(i >= 5);
            assert_eq!(at(&back, k, i, 1), at(&grid, k, i, 1));
        }
        assert_eq!(at(&back, 1, 7, 1), 0.0);
    }

    #[test]
    fn plus_from_twice_is_double_copy() {
        let mut grid = serial_grid(&[(0, 4), (5, 9)], 1, 1);
        grid.set_val(0.25).unwrap();
        let none = Periodicity::non_periodic();
        let mut added = serial_set(&[(-1, -1), (2, 7)], 1);
        added.plus_from_grid(&grid, 0, CompRange::all(1), &none, &NoComm).unwrap();
        added.plus_from_grid(&grid, 0, CompRange::all(1), &none, &NoComm).unwrap();
        let mut copied = serial_set(&[(-1, -1), (2, 7)], 1);
        copied.copy_from_grid(&grid, 0, CompRange::all(1), &NoComm).unwrap();
        for (k, p) in added.iter() {
            let q = copied.patch(k).unwrap();
            for iv in p.bx().cells() {
                assert_eq!(p.get(&iv, 0).unwrap(), 2.0 * q.get(&iv, 0).unwrap());
            }
        }
        // outside the grid nothing arrives
        assert_eq!(added.patch(0).unwrap().get(&IntVect([-1]), 0).unwrap(), 0.0);
    }

    #[test]
    fn lin_comb_identities() {
        let mut src = serial_set(&[(0, 3), (4, 7)], 1);
        src.set_val(3.0).unwrap();
        let mut dst = serial_set(&[(0, 3), (4, 7)], 1);
        dst.set_val(-1.0).unwrap();
        dst.lin_comb(1.0, 0.0, &src, CompRange::all(1), &NoComm).unwrap();
        assert!(dst.iter().all(|(_, p)| p.data().iter().all(|&v| v == -1.0)));
        dst.lin_comb(0.0, 1.0, &src, CompRange::all(1), &NoComm).unwrap();
        assert!(dst.iter().all(|(_, p)| p.data().iter().all(|&v| v == 3.0)));
        dst.lin_comb(2.0, -1.0, &src, CompRange::all(1), &NoComm).unwrap();
        assert!(dst.iter().all(|(_, p)| p.data().iter().all(|&v| v == 3.0)));
    }

    #[test]
    fn lin_comb_grids_combines_covered_cells() {
        let mut fa = serial_grid(&[(0, 4), (5, 9)], 2, 1);
        let mut fb = serial_grid(&[(0, 4), (5, 9)], 2, 1);
        fa.set_val_comps(2.0, 1, 1).unwrap();
        fb.set_val_comps(5.0, 0, 1).unwrap();
        let mut set = serial_set(&[(-2, -1), (9, 11)], 1);
        set.set_val(9.0).unwrap();
        let stats = set.lin_comb_grids(3.0, &fa, 1, 0.5, &fb, 0, 0, 1, 1, &NoComm).unwrap();
        // two covered regions, each copied once per grid
        assert_eq!((stats.local, stats.sent, stats.received), (4, 0, 0));
        let lo = set.patch(0).unwrap();
        assert_eq!(lo.get(&IntVect([-1]), 0).unwrap(), 8.5);
        assert_eq!(lo.get(&IntVect([-2]), 0).unwrap(), 9.0);
        let hi = set.patch(1).unwrap();
        assert_eq!(hi.get(&IntVect([10]), 0).unwrap(), 8.5);
        assert_eq!(hi.get(&IntVect([11]), 0).unwrap(), 9.0);

        let other = serial_grid(&[(0, 9)], 2, 1);
        let err = set.lin_comb_grids(1.0, &fa, 0, 1.0, &other, 0, 0, 1, 0, &NoComm);
        assert!(matches!(err, Err(PatchSieveError::Configuration(_))));
    }

    #[test]
    fn lin_comb_grids_with_no_components_is_a_no_op() {
        let fa = serial_grid(&[(0, 4)], 2, 1);
        let mut set = serial_set(&[(-1, -1)], 1);
        set.set_val(9.0).unwrap();
        let stats = set.lin_comb_grids(1.0, &fa, 2, 1.0, &fa, 0, 1, 0, 1, &NoComm).unwrap();
        assert_eq!(stats, ExchangeStats::default());
        assert_eq!(set.patch(0).unwrap().get(&IntVect([-1]), 0).unwrap(), 9.0);
        set.copy_from_grid(&fa, 1, CompRange::new(0, 1, 0), &NoComm).unwrap();
        assert_eq!(set.patch(0).unwrap().get(&IntVect([-1]), 0).unwrap(), 9.0);
    }

    #[test]
    fn component_range_is_checked_first() {
        let mut set = serial_set(&[(0, 3)], 2);
        let grid = serial_grid(&[(0, 3)], 2, 0);
        let err = set.copy_from_grid(&grid, 0, CompRange::new(0, 2, 3), &NoComm);
        assert!(matches!(err, Err(PatchSieveError::ComponentRange { comp: 2, ncomp: 3, available: 2 })));
        assert!(matches!(
            set.set_val_comps(1.0, 2, 3),
            Err(PatchSieveError::ComponentRange { .. })
        ));
        assert!(set.mutation_counts().values().all(|&c| c == 0));
    }

    #[test]
    fn mismatched_operands_are_configuration_errors() {
        let mut a = serial_set(&[(0, 3), (4, 7)], 1);
        let b = serial_set(&[(0, 7)], 1);
        assert!(matches!(
            a.lin_comb(1.0, 1.0, &b, CompRange::all(1), &NoComm),
            Err(PatchSieveError::Configuration(_))
        ));
        assert!(matches!(
            BoundarySet::copy_local(&mut a, &b),
            Err(PatchSieveError::Configuration(_))
        ));
        let grid = serial_grid(&[(0, 7)], 1, 1);
        assert!(matches!(
            a.copy_from_grid(&grid, 2, CompRange::all(1), &NoComm),
            Err(PatchSieveError::Configuration(_))
        ));
    }

    #[test]
    fn undefined_sets_refuse_every_operation() {
        let mut undefined = BoundarySet::<1>::default();
        let set = serial_set(&[(0, 3)], 1);
        assert!(matches!(undefined.set_val(0.0), Err(PatchSieveError::NotDefined)));
        assert!(matches!(
            undefined.copy_from(&set, CompRange::all(1), &NoComm),
            Err(PatchSieveError::NotDefined)
        ));
        let mut other = serial_set(&[(0, 3)], 1);
        assert!(matches!(
            other.plus_from(&undefined, CompRange::all(1), &NoComm),
            Err(PatchSieveError::NotDefined)
        ));
        undefined.define(one_d(&[(0, 3)]), DistributionMap::new(vec![0]), 1, 0).unwrap();
        assert!(undefined.is_defined());
        undefined.clear();
        assert!(!undefined.is_defined());
    }

    #[test]
    fn copy_between_overlapping_sets() {
        let mut src = serial_set(&[(0, 5)], 1);
        src.set_val(2.0).unwrap();
        let mut dst = serial_set(&[(-3, 1), (4, 9)], 1);
        let stats = dst.copy_from(&src, CompRange::all(1), &NoComm).unwrap();
        assert_eq!(stats.local, 2);
        let p = dst.patch(1).unwrap();
        assert_eq!(p.get(&IntVect([5]), 0).unwrap(), 2.0);
        assert_eq!(p.get(&IntVect([6]), 0).unwrap(), 0.0);
        dst.plus_from(&src, CompRange::all(1), &NoComm).unwrap();
        assert_eq!(dst.patch(0).unwrap().get(&IntVect([0]), 0).unwrap(), 4.0);
    }

    #[test]
    fn copy_local_copies_all_components() {
        let mut src = serial_set(&[(0, 2), (3, 5)], 2);
        src.set_val_comps(1.0, 0, 1).unwrap();
        src.set_val_comps(2.0, 1, 1).unwrap();
        let mut dst = BoundarySet::new(
            src.box_array().unwrap().clone(),
            src.distribution_map().unwrap().clone(),
            2,
            0,
        )
        .unwrap();
        BoundarySet::copy_local(&mut dst, &src).unwrap();
        for (k, p) in dst.iter() {
            assert_eq!(p, src.patch(k).unwrap());
        }
    }

    #[test]
    fn faces_of_grid_boxes() {
        let grids: BoxArray<2> =
            vec![IndexBox::new([0, 0], [3, 3]), IndexBox::new([4, 0], [7, 3])].into();
        let set = BoundarySet::from_grid_faces(
            &grids,
            Orientation::low(0),
            1,
            1,
            DistributionMap::new(vec![0, 0]),
            0,
        )
        .unwrap();
        assert_eq!(set.fabbox(0).unwrap(), IndexBox::new([-1, 0], [-1, 3]));
        assert_eq!(set.fabbox(1).unwrap(), IndexBox::new([3, 0], [3, 3]));
        set.validate_invariants().unwrap();
    }

    #[test]
    fn add_procs_to_comp_is_unsupported() {
        let mut set = serial_set(&[(0, 3)], 1);
        let err = set.add_procs_to_comp(0, &NoComm).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, PatchSieveError::Unsupported(_)));
    }
}
