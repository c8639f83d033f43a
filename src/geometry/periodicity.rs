//! Periodicity descriptor: the lattice shifts under which domain edges are identified.
//!
//! A periodic axis with period `L` contributes the shifts `-L, 0, +L`; the
//! descriptor's shift set is the Cartesian product over axes, always containing
//! the zero vector, and is returned in lexicographic order.

use crate::geometry::index_box::IndexBox;
use crate::geometry::int_vect::IntVect;
use crate::patch_error::PatchSieveError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Option<i64>>", into = "Vec<Option<i64>>")]
pub struct Periodicity<const D: usize> {
    /// Period per axis; `None` for a non-periodic axis.
    periods: [Option<i64>; D],
}

impl<const D: usize> TryFrom<Vec<Option<i64>>> for Periodicity<D> {
    type Error = PatchSieveError;

    fn try_from(v: Vec<Option<i64>>) -> Result<Self, Self::Error> {
        let len = v.len();
        let periods: [Option<i64>; D] = v.try_into().map_err(|_| {
            PatchSieveError::Configuration(format!("expected {D} periods, got {len}"))
        })?;
        Self::new(periods)
    }
}

impl<const D: usize> From<Periodicity<D>> for Vec<Option<i64>> {
    fn from(p: Periodicity<D>) -> Self {
        p.periods.to_vec()
    }
}

impl<const D: usize> Default for Periodicity<D> {
    fn default() -> Self {
        Self::non_periodic()
    }
}

impl<const D: usize> Periodicity<D> {
    /// No wrap-around on any axis; the shift set is just the zero vector.
    pub fn non_periodic() -> Self {
        Self { periods: [None; D] }
    }

    /// Explicit per-axis periods. Periods must be positive.
    pub fn new(periods: [Option<i64>; D]) -> Result<Self, PatchSieveError> {
        if let Some(bad) = periods.iter().flatten().find(|&&p| p <= 0) {
            return Err(PatchSieveError::Configuration(format!(
                "period must be positive, got {bad}"
            )));
        }
        Ok(Self { periods })
    }

    /// Periods taken from the extent of `domain` on the axes flagged periodic.
    pub fn from_domain(domain: &IndexBox<D>, is_periodic: [bool; D]) -> Result<Self, PatchSieveError> {
        if domain.is_empty() && is_periodic.iter().any(|&p| p) {
            return Err(PatchSieveError::Configuration(
                "periodic domain must not be empty".into(),
            ));
        }
        Self::new(std::array::from_fn(|d| {
            is_periodic[d].then(|| domain.length(d) as i64)
        }))
    }

    pub fn is_periodic(&self, dir: usize) -> bool {
        self.periods[dir].is_some()
    }

    pub fn is_any_periodic(&self) -> bool {
        self.periods.iter().any(Option::is_some)
    }

    pub fn period(&self, dir: usize) -> Option<i64> {
        self.periods[dir]
    }

    /// Every admissible shift, zero included, sorted lexicographically.
    pub fn shift_vectors(&self) -> Vec<IntVect<D>> {
        let mut shifts: Vec<IntVect<D>> = self
            .periods
            .iter()
            .map(|p| match p {
                Some(l) => vec![-l, 0, *l],
                None => vec![0],
            })
            .multi_cartesian_product()
            .map(|v| IntVect(std::array::from_fn(|d| v[d])))
            .collect();
        if shifts.is_empty() {
            shifts.push(IntVect::zero());
        }
        shifts.sort();
        shifts
    }
}
