//! PatchSieveError: Unified error type for patch-sieve public APIs
//!
//! Every public operation returns this error instead of panicking. The first
//! four variants are detected locally before any message is posted; the
//! `Unsupported` and `CommunicationFailure` variants are fatal-class: there is no
//! recovery or retry path once they are returned.

use thiserror::Error;

/// Unified error type for patch-sieve operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchSieveError {
    /// A sub-box argument does not lie within the box a patch is allocated on.
    #[error("region {region} is not contained in patch box {patch}")]
    OutOfBounds { region: String, patch: String },
    /// A component offset/count exceeds the declared component count.
    #[error("component range [{comp}, {comp}+{ncomp}) exceeds available {available} components")]
    ComponentRange {
        comp: usize,
        ncomp: usize,
        available: usize,
    },
    /// Operands of a binary operation do not agree (geometry, ownership, ghost width, ...).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The collection was default-constructed and never defined.
    #[error("collection used before define()")]
    NotDefined,
    /// Requested patch index is not owned by the local process.
    #[error("patch {index} is not owned by rank {rank}")]
    MissingPatch { index: usize, rank: usize },
    /// Operation that has no supported implementation (fatal).
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A remote transfer could not complete (fatal).
    #[error("communication with rank {neighbor} failed: {reason}")]
    CommunicationFailure {
        neighbor: usize,
        reason: String,
    },
    /// Persistence backend failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl PatchSieveError {
    /// True for the error classes after which the program state is not recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PatchSieveError::Unsupported(_) | PatchSieveError::CommunicationFailure { .. }
        )
    }
}

impl From<std::io::Error> for PatchSieveError {
    fn from(e: std::io::Error) -> Self {
        PatchSieveError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PatchSieveError {
    fn from(e: serde_json::Error) -> Self {
        PatchSieveError::Io(e.to_string())
    }
}

impl From<bincode::Error> for PatchSieveError {
    fn from(e: bincode::Error) -> Self {
        PatchSieveError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classes() {
        assert!(PatchSieveError::Unsupported("x").is_fatal());
        assert!(
            PatchSieveError::CommunicationFailure {
                neighbor: 1,
                reason: "gone".into()
            }
            .is_fatal()
        );
        assert!(!PatchSieveError::NotDefined.is_fatal());
        assert!(!PatchSieveError::Configuration("x".into()).is_fatal());
    }

    #[test]
    fn display_mentions_range() {
        let e = PatchSieveError::ComponentRange {
            comp: 2,
            ncomp: 3,
            available: 2,
        };
        assert!(e.to_string().contains("2 components"));
    }
}
