//! Delta rules: how an incoming value is fused into a local one.
//!
//! Every exchange operation is the same geometric traffic with a different
//! fusion rule at the destination: overwrite, accumulate, or linear combination.

use crate::Real;

/// Rule for fusing an incoming value into the local one.
pub trait ValueDelta: Sync {
    fn fuse(&self, local: &mut Real, incoming: Real);
}

/// Copy-overwrites-local.
#[derive(Copy, Clone, Debug, Default)]
pub struct CopyDelta;

impl ValueDelta for CopyDelta {
    #[inline]
    fn fuse(&self, local: &mut Real, incoming: Real) {
        *local = incoming;
    }
}

/// Additive delta for summation fields.
#[derive(Copy, Clone, Debug, Default)]
pub struct AddDelta;

impl ValueDelta for AddDelta {
    #[inline]
    fn fuse(&self, local: &mut Real, incoming: Real) {
        *local += incoming;
    }
}

/// `local = a * local + b * incoming`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinCombDelta {
    pub a: Real,
    pub b: Real,
}

impl LinCombDelta {
    pub fn new(a: Real, b: Real) -> Self {
        Self { a, b }
    }
}

impl ValueDelta for LinCombDelta {
    #[inline]
    fn fuse(&self, local: &mut Real, incoming: Real) {
        *local = self.a * *local + self.b * incoming;
    }
}
