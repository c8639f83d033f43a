//! Box algebra: axis-aligned integer rectangles in index space.
//!
//! An [`IndexBox`] stores inclusive `lo`/`hi` corners. Any box with `lo > hi`
//! on some axis is *empty* and has zero volume; empty boxes are ordinary values
//! (the result of intersecting disjoint boxes) rather than errors.
//!
//! Everything here is exact integer arithmetic so that every process evaluates
//! the same geometric predicates bit-for-bit.

use crate::geometry::int_vect::IntVect;
use crate::geometry::orientation::{Orientation, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive integer rectangle `[lo, hi]` in `D` dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexBox<const D: usize> {
    lo: IntVect<D>,
    hi: IntVect<D>,
}

impl<const D: usize> IndexBox<D> {
    /// Box with the given inclusive corners. `lo > hi` on any axis yields an empty box.
    pub fn new(lo: impl Into<IntVect<D>>, hi: impl Into<IntVect<D>>) -> Self {
        Self {
            lo: lo.into(),
            hi: hi.into(),
        }
    }

    /// Canonical empty box.
    pub fn empty() -> Self {
        Self {
            lo: IntVect::splat(0),
            hi: IntVect::splat(-1),
        }
    }

    #[inline]
    pub fn lo(&self) -> IntVect<D> {
        self.lo
    }

    #[inline]
    pub fn hi(&self) -> IntVect<D> {
        self.hi
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        (0..D).any(|d| self.lo.0[d] > self.hi.0[d])
    }

    /// Number of cells along `dir` (0 for an empty box).
    pub fn length(&self, dir: usize) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.hi.0[dir] - self.lo.0[dir] + 1) as usize
        }
    }

    /// Number of cells in the box.
    pub fn volume(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (0..D).map(|d| self.length(d)).product()
    }

    pub fn contains(&self, iv: &IntVect<D>) -> bool {
        self.lo.all_le(iv) && iv.all_le(&self.hi)
    }

    /// True if `other` lies within `self`. The empty box is contained in everything.
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty()
            || (!self.is_empty() && self.lo.all_le(&other.lo) && other.hi.all_le(&self.hi))
    }

    /// Per-axis `max(lo)` / `min(hi)`; empty if the boxes are disjoint.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.max_per_axis(&other.lo),
            hi: self.hi.min_per_axis(&other.hi),
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty() && !other.is_empty() && !self.intersect(other).is_empty()
    }

    /// Rigid shift of both corners.
    pub fn translate(&self, shift: IntVect<D>) -> Self {
        Self {
            lo: self.lo + shift,
            hi: self.hi + shift,
        }
    }

    /// Grow by `n` cells on every side. Negative `n` shrinks; that is a caller contract.
    pub fn grow(&self, n: i64) -> Self {
        let g = IntVect::splat(n);
        Self {
            lo: self.lo - g,
            hi: self.hi + g,
        }
    }

    /// The slab of `width` cells just outside the given face.
    ///
    /// For `Orientation::low(d)` this is `lo[d]-width ..= lo[d]-1` along `d`,
    /// unchanged along the other axes.
    pub fn adj_cell(&self, face: Orientation, width: i64) -> Self {
        let d = face.dir;
        let mut lo = self.lo;
        let mut hi = self.hi;
        match face.side {
            Side::Low => {
                hi.0[d] = self.lo.0[d] - 1;
                lo.0[d] = self.lo.0[d] - width;
            }
            Side::High => {
                lo.0[d] = self.hi.0[d] + 1;
                hi.0[d] = self.hi.0[d] + width;
            }
        }
        Self { lo, hi }
    }

    /// Linear offset of `iv` within this box, axis 0 fastest.
    ///
    /// The caller guarantees `self.contains(iv)`.
    #[inline]
    pub fn offset(&self, iv: &IntVect<D>) -> usize {
        let mut off = 0usize;
        let mut stride = 1usize;
        for d in 0..D {
            off += (iv.0[d] - self.lo.0[d]) as usize * stride;
            stride *= self.length(d);
        }
        off
    }

    /// Iterate over every cell, axis 0 fastest.
    pub fn cells(&self) -> CellIter<D> {
        CellIter {
            bx: *self,
            next: if self.is_empty() { None } else { Some(self.lo) },
        }
    }
}

impl<const D: usize> fmt::Display for IndexBox<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.lo, self.hi)
    }
}

/// Odometer iterator over the cells of a box.
#[derive(Clone, Debug)]
pub struct CellIter<const D: usize> {
    bx: IndexBox<D>,
    next: Option<IntVect<D>>,
}

impl<const D: usize> Iterator for CellIter<D> {
    type Item = IntVect<D>;

    fn next(&mut self) -> Option<IntVect<D>> {
        let cur = self.next?;
        let mut nxt = cur;
        let mut advanced = false;
        for d in 0..D {
            if nxt.0[d] < self.bx.hi.0[d] {
                nxt.0[d] += 1;
                advanced = true;
                break;
            }
            nxt.0[d] = self.bx.lo.0[d];
        }
        self.next = advanced.then_some(nxt);
        Some(cur)
    }
}
