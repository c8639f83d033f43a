#![allow(dead_code)]
use patch_sieve::algs::communicator::RayonComm;
use patch_sieve::data::{BoundarySet, DistributionMap, PatchCollection};
use patch_sieve::geometry::{BoxArray, IndexBox, IntVect};
use patch_sieve::Real;
use std::sync::Arc;

/// Run `f` once per simulated rank, each on its own thread over an isolated
/// `RayonComm` group; results come back in rank order.
pub fn run_ranks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&RayonComm) -> T + Sync,
{
    let comms = RayonComm::world(n);
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = comms.iter().map(|c| scope.spawn(move || f(c))).collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect()
    })
}

/// 1-D geometry from inclusive `(lo, hi)` pairs.
pub fn line(boxes: &[(i64, i64)]) -> Arc<BoxArray<1>> {
    Arc::new(boxes.iter().map(|&(l, h)| IndexBox::new([l], [h])).collect())
}

/// 2-D geometry tiling `[0, nx*w) x [0, ny*w)` with `w x w` boxes, axis 0 fastest.
pub fn tiles(nx: i64, ny: i64, w: i64) -> Arc<BoxArray<2>> {
    let mut boxes = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            boxes.push(IndexBox::new([i * w, j * w], [i * w + w - 1, j * w + w - 1]));
        }
    }
    Arc::new(boxes.into())
}

pub fn dmap(owners: &[usize]) -> Arc<DistributionMap> {
    Arc::new(DistributionMap::new(owners.to_vec()))
}

/// Fill every owned patch `k` of `pc`, ghost cells included, with `f(k, cell, comp)`.
pub fn fill_with<const D: usize>(pc: &mut PatchCollection<D>, f: impl Fn(usize, IntVect<D>, usize) -> Real) {
    let owned = pc.owned_indices().to_vec();
    let ncomp = pc.ncomp();
    for k in owned {
        let mut p = pc.patch_mut(k).unwrap();
        let cells: Vec<_> = p.bx().cells().collect();
        for c in 0..ncomp {
            for iv in &cells {
                p.set(iv, c, f(k, *iv, c)).unwrap();
            }
        }
    }
}

/// Value at `iv` of set patch `k`, if this rank owns it.
pub fn set_value<const D: usize>(set: &BoundarySet<D>, k: usize, iv: IntVect<D>, comp: usize) -> Option<Real> {
    set.patch(k).ok()?.get(&iv, comp).ok()
}
