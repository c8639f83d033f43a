//! BoxArray: the ordered geometry of a distributed array.
//!
//! Insertion order defines the stable integer index of each box; ownership
//! maps, patch storage and the overwrite tie-break all key on that index.
//!
//! Intersection queries go through a sweep index on axis 0 (boxes sorted by
//! `lo[0]` with a running maximum of `hi[0]`), which prunes candidates but
//! returns exactly the brute-force answer, in ascending index order.

use crate::geometry::index_box::IndexBox;
use crate::geometry::orientation::Orientation;
use serde::{Deserialize, Serialize};

/// Immutable ordered sequence of boxes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "Vec<IndexBox<D>>", into = "Vec<IndexBox<D>>")]
pub struct BoxArray<const D: usize> {
    boxes: Vec<IndexBox<D>>,
    /// Indices of non-empty `boxes` sorted by `lo[0]`.
    by_lo: Vec<usize>,
    /// `prefix_hi[k]` = max `hi[0]` over `by_lo[..=k]`.
    prefix_hi: Vec<i64>,
}

impl<const D: usize> From<Vec<IndexBox<D>>> for BoxArray<D> {
    fn from(boxes: Vec<IndexBox<D>>) -> Self {
        Self::new(boxes)
    }
}

impl<const D: usize> From<BoxArray<D>> for Vec<IndexBox<D>> {
    fn from(ba: BoxArray<D>) -> Self {
        ba.boxes
    }
}

impl<const D: usize> PartialEq for BoxArray<D> {
    fn eq(&self, other: &Self) -> bool {
        self.boxes == other.boxes
    }
}

impl<const D: usize> Eq for BoxArray<D> {}

impl<const D: usize> Default for BoxArray<D> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<const D: usize> FromIterator<IndexBox<D>> for BoxArray<D> {
    fn from_iter<I: IntoIterator<Item = IndexBox<D>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<const D: usize> BoxArray<D> {
    pub fn new(boxes: Vec<IndexBox<D>>) -> Self {
        let mut ba = Self {
            boxes,
            by_lo: Vec::new(),
            prefix_hi: Vec::new(),
        };
        ba.build_index();
        ba
    }

    fn build_index(&mut self) {
        let mut by_lo: Vec<usize> = (0..self.boxes.len())
            .filter(|&i| !self.boxes[i].is_empty())
            .collect();
        by_lo.sort_by_key(|&i| (self.boxes[i].lo().get(0), i));
        let mut running = i64::MIN;
        let prefix_hi = by_lo
            .iter()
            .map(|&i| {
                running = running.max(self.boxes[i].hi().get(0));
                running
            })
            .collect();
        self.by_lo = by_lo;
        self.prefix_hi = prefix_hi;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&IndexBox<D>> {
        self.boxes.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexBox<D>> {
        self.boxes.iter()
    }

    pub fn boxes(&self) -> &[IndexBox<D>] {
        &self.boxes
    }

    /// Every box grown by `n`.
    pub fn grown(&self, n: i64) -> Self {
        self.boxes.iter().map(|b| b.grow(n)).collect()
    }

    /// The face slab of `width` cells outside each box, in the same order.
    pub fn adj_cells(&self, face: Orientation, width: i64) -> Self {
        self.boxes.iter().map(|b| b.adj_cell(face, width)).collect()
    }

    /// Smallest box covering every non-empty box, or the empty box.
    pub fn minimal_box(&self) -> IndexBox<D> {
        let mut it = self.boxes.iter().filter(|b| !b.is_empty());
        let Some(first) = it.next() else {
            return IndexBox::empty();
        };
        it.fold(*first, |acc, b| {
            IndexBox::new(acc.lo().min_per_axis(&b.lo()), acc.hi().max_per_axis(&b.hi()))
        })
    }

    /// All `(index, box ∩ query)` with a non-empty intersection, ascending by index.
    ///
    /// Boxes are grown by `ngrow` before intersecting. Empty boxes never
    /// intersect anything, grown or not.
    pub fn intersections(&self, query: &IndexBox<D>, ngrow: i64) -> Vec<(usize, IndexBox<D>)> {
        if query.is_empty() || self.by_lo.is_empty() {
            return Vec::new();
        }
        let q_lo = query.lo().get(0) - ngrow;
        let q_hi = query.hi().get(0) + ngrow;
        // Candidates have lo[0] <= q_hi; walk backwards while some earlier box can still reach q_lo.
        let end = self
            .by_lo
            .partition_point(|&i| self.boxes[i].lo().get(0) <= q_hi);
        let mut hits = Vec::new();
        for k in (0..end).rev() {
            if self.prefix_hi[k] < q_lo {
                break;
            }
            let i = self.by_lo[k];
            let isect = self.boxes[i].grow(ngrow).intersect(query);
            if !isect.is_empty() {
                hits.push((i, isect));
            }
        }
        hits.sort_unstable_by_key(|&(i, _)| i);
        hits
    }

    /// Brute-force reference for [`intersections`](Self::intersections).
    pub fn intersections_brute(
        &self,
        query: &IndexBox<D>,
        ngrow: i64,
    ) -> Vec<(usize, IndexBox<D>)> {
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .filter_map(|(i, b)| {
                let isect = b.grow(ngrow).intersect(query);
                (!isect.is_empty()).then_some((i, isect))
            })
            .collect()
    }
}

impl<const D: usize> std::ops::Index<usize> for BoxArray<D> {
    type Output = IndexBox<D>;
    fn index(&self, i: usize) -> &IndexBox<D> {
        &self.boxes[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn b1(lo: i64, hi: i64) -> IndexBox<1> {
        IndexBox::new([lo], [hi])
    }

    #[test]
    fn faces_keep_order() {
        let ba: BoxArray<2> = vec![
            IndexBox::new([0, 0], [3, 3]),
            IndexBox::new([4, 0], [7, 3]),
        ]
        .into_iter()
        .collect();
        let lo = ba.adj_cells(Orientation::low(0), 1);
        assert_eq!(lo[0], IndexBox::new([-1, 0], [-1, 3]));
        assert_eq!(lo[1], IndexBox::new([3, 0], [3, 3]));
        assert_eq!(ba.minimal_box(), IndexBox::new([0, 0], [7, 3]));
    }

    #[test]
    fn intersections_respect_growth() {
        let ba: BoxArray<1> = vec![b1(0, 4), b1(5, 9), b1(20, 30)].into_iter().collect();
        let hits = ba.intersections(&b1(-1, -1), 0);
        assert!(hits.is_empty());
        let hits = ba.intersections(&b1(-1, -1), 1);
        assert_eq!(hits, vec![(0, b1(-1, -1))]);
        let hits = ba.intersections(&b1(4, 5), 0);
        assert_eq!(hits, vec![(0, b1(4, 4)), (1, b1(5, 5))]);
    }

    #[test]
    fn long_box_early_in_sweep_is_found() {
        // Box 0 spans everything; box 1 sits to the left of the query.
        let ba: BoxArray<1> = vec![b1(-100, 100), b1(-50, -40), b1(10, 12)]
            .into_iter()
            .collect();
        assert_eq!(
            ba.intersections(&b1(11, 11), 0),
            vec![(0, b1(11, 11)), (2, b1(11, 11))]
        );
    }

    fn arb_ba() -> impl Strategy<Value = BoxArray<2>> {
        prop::collection::vec((-10i64..10, -10i64..10, -1i64..5, 0i64..5), 0..12).prop_map(|v| {
            v.into_iter()
                .map(|(x, y, w, h)| IndexBox::new([x, y], [x + w, y + h]))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn sweep_matches_brute_force(ba in arb_ba(), x in -12i64..12, y in -12i64..12, w in 0i64..8, g in 0i64..3) {
            let q = IndexBox::new([x, y], [x + w, y + w]);
            prop_assert_eq!(ba.intersections(&q, g), ba.intersections_brute(&q, g));
        }
    }
}
