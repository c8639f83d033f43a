//! Structural self-checks for plans and collections.
//!
//! [`ExchangePlan`](crate::algs::exchange::ExchangePlan),
//! [`PatchCollection`](crate::data::PatchCollection) and
//! [`BoundarySet`](crate::data::BoundarySet) can validate their own layout:
//! plan order and region consistency, one correctly shaped patch per owned
//! index, no ghost cells on boundary sets. `validate_invariants` is always
//! available and returns the first violation; the `debug_invariants!` macro
//! turns a violation into a panic in debug builds or with the
//! `check-invariants` feature, and compiles to nothing otherwise.

use crate::patch_error::PatchSieveError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), PatchSieveError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}
