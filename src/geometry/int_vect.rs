//! Integer lattice vectors in `D` dimensions.
//!
//! `IntVect` is the coordinate type of the index space: cell indices, box
//! corners and periodic shift vectors. Ordering is lexicographic over the axes,
//! which the exchange planner relies on to order periodic images.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A point (or translation) of the `D`-dimensional integer lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVect<const D: usize>(pub [i64; D]);

impl<const D: usize> IntVect<D> {
    /// The origin.
    pub const fn zero() -> Self {
        IntVect([0; D])
    }

    /// Every axis set to `v`.
    pub const fn splat(v: i64) -> Self {
        IntVect([v; D])
    }

    /// Unit vector along `dir`, scaled by `len`.
    pub fn unit(dir: usize, len: i64) -> Self {
        let mut v = [0; D];
        v[dir] = len;
        IntVect(v)
    }

    #[inline]
    pub fn get(&self, dir: usize) -> i64 {
        self.0[dir]
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&x| x == 0)
    }

    /// Per-axis maximum.
    pub fn max_per_axis(&self, other: &Self) -> Self {
        IntVect(std::array::from_fn(|d| self.0[d].max(other.0[d])))
    }

    /// Per-axis minimum.
    pub fn min_per_axis(&self, other: &Self) -> Self {
        IntVect(std::array::from_fn(|d| self.0[d].min(other.0[d])))
    }

    /// True if every axis of `self` is `<=` the matching axis of `other`.
    pub fn all_le(&self, other: &Self) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }
}

impl<const D: usize> From<[i64; D]> for IntVect<D> {
    fn from(v: [i64; D]) -> Self {
        IntVect(v)
    }
}

impl<const D: usize> Add for IntVect<D> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        IntVect(std::array::from_fn(|d| self.0[d] + rhs.0[d]))
    }
}

impl<const D: usize> Sub for IntVect<D> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        IntVect(std::array::from_fn(|d| self.0[d] - rhs.0[d]))
    }
}

impl<const D: usize> Neg for IntVect<D> {
    type Output = Self;
    fn neg(self) -> Self {
        IntVect(std::array::from_fn(|d| -self.0[d]))
    }
}

impl<const D: usize> fmt::Display for IntVect<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (d, x) in self.0.iter().enumerate() {
            if d > 0 {
                write!(f, ",")?;
            }
            write!(f, "{x}")?;
        }
        write!(f, ")")
    }
}

// serde only implements arrays of fixed literal lengths, so go through a sequence.
impl<const D: usize> Serialize for IntVect<D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de, const D: usize> Deserialize<'de> for IntVect<D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let v = Vec::<i64>::deserialize(deserializer)?;
        let len = v.len();
        let arr: [i64; D] = v
            .try_into()
            .map_err(|_| De::Error::custom(format!("expected {D} coordinates, got {len}")))?;
        Ok(IntVect(arr))
    }
}
