//! Data module: field patches and their distributed collections.

pub mod boundary_set;
pub mod distribution;
pub mod field_patch;
pub mod kernels;
pub mod patch_collection;

pub use boundary_set::{BoundarySet, ExchangeConfig};
pub use distribution::DistributionMap;
pub use field_patch::{FieldPatch, PatchMut};
pub use patch_collection::PatchCollection;
