//! Error types for store mutators

use std::fmt;
use thiserror::Error;

/// Result type for store mutators that may reject a reference
pub type StoreResult<T> = Result<T, StoreError>;

/// Which collection a dangling reference points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Routine,
    WorkoutDay,
    Exercise,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Routine => "routine",
            Self::WorkoutDay => "workout day",
            Self::Exercise => "exercise",
        };
        f.write_str(name)
    }
}

/// Store error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A created record referenced an id that does not exist
    #[error("Missing reference: {kind} {id} does not exist")]
    MissingReference { kind: ReferenceKind, id: String },
}

impl StoreError {
    pub fn missing(kind: ReferenceKind, id: impl Into<String>) -> Self {
        Self::MissingReference {
            kind,
            id: id.into(),
        }
    }
}
