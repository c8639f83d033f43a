#![cfg_attr(docsrs, feature(doc_cfg))]
//! # patch-sieve
//!
//! patch-sieve keeps boundary data consistent across block-structured grids
//! distributed over many processes. A domain is split into integer boxes, each
//! carrying a dense multi-component array; collections of face-aligned patches
//! ("boundary sets") are synchronized against the distributed grid by geometric
//! intersection, optional periodic wrap-around, and overwrite, additive or
//! linear-combination semantics.
//!
//! ## Features
//! - Exact integer box algebra with ghost growth and periodic shifts
//! - Patch collections with explicit, immutable ownership maps
//! - A deterministic exchange planner: every rank derives the same plan
//!   without communication
//! - Pluggable communication backends (serial, threads, MPI)
//! - Per-rank checkpointing of owned patches
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! patch-sieve = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon", "check-invariants"]
//! ```
//!
//! ## Determinism
//!
//! Plans are ordered by destination index, then source index, then shift.
//! Overwrites are applied in that order, so where several sources reach one
//! cell the last one in plan order wins on every rank and every run.

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod overlap;
pub mod patch_error;

pub use debug_invariants::DebugInvariants;

/// Scalar type of all field data.
pub type Real = f64;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
    pub use crate::algs::exchange::{CompRange, ExchangePlan, ExchangeStats, Pairing, PlanSide};
    pub use crate::data::{BoundarySet, DistributionMap, ExchangeConfig, FieldPatch, PatchCollection, PatchMut};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{BoxArray, IndexBox, IntVect, Orientation, Periodicity, Side};
    pub use crate::io::{DirStore, PatchStore};
    pub use crate::overlap::delta::{AddDelta, CopyDelta, LinCombDelta, ValueDelta};
    pub use crate::patch_error::PatchSieveError;
    pub use crate::Real;
}
