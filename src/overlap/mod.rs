//! Overlap module: fusion rules applied where two patches overlap.

pub mod delta;
