//! Face orientations of a box: one low and one high face per axis.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Low,
    High,
}

/// A face of a box, e.g. "the lo-i face" is `Orientation::new(0, Side::Low)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Orientation {
    pub dir: usize,
    pub side: Side,
}

impl Orientation {
    pub const fn new(dir: usize, side: Side) -> Self {
        Self { dir, side }
    }

    pub const fn low(dir: usize) -> Self {
        Self::new(dir, Side::Low)
    }

    pub const fn high(dir: usize) -> Self {
        Self::new(dir, Side::High)
    }

    /// The face on the other side of the same axis.
    pub fn flip(self) -> Self {
        let side = match self.side {
            Side::Low => Side::High,
            Side::High => Side::Low,
        };
        Self { dir: self.dir, side }
    }

    /// All `2 * dim` faces, low before high, axis by axis.
    pub fn all(dim: usize) -> impl Iterator<Item = Orientation> {
        (0..dim).flat_map(|d| [Self::low(d), Self::high(d)])
    }
}
