//! Ownership map: which process owns each geometry index.
//!
//! A [`DistributionMap`] is an explicit immutable value handed to every
//! collection at construction; nothing looks ownership up through global state.
//! Load balancing is the caller's business: the map only records the result.

use crate::patch_error::PatchSieveError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistributionMap {
    owners: Vec<usize>,
}

impl DistributionMap {
    /// Wrap an explicit owner per geometry index.
    pub fn new(owners: Vec<usize>) -> Self {
        Self { owners }
    }

    /// Index `i` is owned by rank `i % nprocs`.
    pub fn round_robin(len: usize, nprocs: usize) -> Self {
        let nprocs = nprocs.max(1);
        Self {
            owners: (0..len).map(|i| i % nprocs).collect(),
        }
    }

    /// Every index owned by `rank`.
    pub fn single_owner(len: usize, rank: usize) -> Self {
        Self {
            owners: vec![rank; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Owning rank of geometry index `i`.
    pub fn owner(&self, i: usize) -> Result<usize, PatchSieveError> {
        self.owners.get(i).copied().ok_or_else(|| {
            PatchSieveError::Configuration(format!(
                "index {i} outside distribution map of length {}",
                self.owners.len()
            ))
        })
    }

    /// Returns true if index `i` is owned by `rank`.
    pub fn is_owned_by(&self, i: usize, rank: usize) -> bool {
        self.owners.get(i).is_some_and(|&o| o == rank)
    }

    /// Indices owned by `rank`, ascending.
    pub fn owned_by(&self, rank: usize) -> impl Iterator<Item = usize> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(move |(i, &o)| (o == rank).then_some(i))
    }

    /// Distinct ranks appearing in the map, sorted.
    pub fn ranks(&self) -> BTreeSet<usize> {
        self.owners.iter().copied().collect()
    }

    /// Largest rank referenced, if any.
    pub fn max_rank(&self) -> Option<usize> {
        self.owners.iter().copied().max()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_assignment() {
        let dm = DistributionMap::round_robin(5, 2);
        assert_eq!(dm.as_slice(), &[0, 1, 0, 1, 0]);
        assert_eq!(dm.owned_by(1).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(dm.max_rank(), Some(1));
        assert!(dm.is_owned_by(4, 0));
    }

    #[test]
    fn owner_out_of_range_is_config_error() {
        let dm = DistributionMap::single_owner(2, 0);
        assert!(matches!(dm.owner(2), Err(PatchSieveError::Configuration(_))));
    }
}
