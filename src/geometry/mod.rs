//! Index-space geometry: lattice vectors, boxes, box arrays, faces and periodicity.
//!
//! All arithmetic in this module is exact integer arithmetic; every process
//! evaluating the same inputs derives the same results.

pub mod box_array;
pub mod index_box;
pub mod int_vect;
pub mod orientation;
pub mod periodicity;

pub use box_array::BoxArray;
pub use index_box::IndexBox;
pub use int_vect::IntVect;
pub use orientation::{Orientation, Side};
pub use periodicity::Periodicity;
