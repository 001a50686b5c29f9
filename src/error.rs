use thiserror::Error;

use crate::extraction::{ExtractionError, ModelError};
use crate::form::{CommitError, ValidationErrors};
use crate::persistence::PersistenceError;
use crate::store::{ActorError, StoreError};

/// Process exit codes used by the command line front
pub mod exit_code {
    pub const GENERAL_ERROR: i32 = 1;
    pub const ARGUMENT_ERROR: i32 = 2;
    pub const STORAGE_ERROR: i32 = 3;
    pub const EXTRACTION_ERROR: i32 = 4;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Store task error: {0}")]
    Actor(#[from] ActorError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<CommitError> for Error {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Validation(e) => Error::Validation(e),
            CommitError::Store(e) => Error::Store(e),
        }
    }
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::Toml(_) | Error::Validation(_) | Error::NotFound(_) => {
                exit_code::ARGUMENT_ERROR
            }
            Error::Io(_) | Error::Serialization(_) | Error::Persistence(_) => {
                exit_code::STORAGE_ERROR
            }
            Error::Extraction(_) | Error::Model(_) => exit_code::EXTRACTION_ERROR,
            Error::Store(_) | Error::Actor(_) => exit_code::GENERAL_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FieldError;

    #[test]
    fn test_commit_error_flattens() {
        let validation = ValidationErrors {
            errors: vec![FieldError {
                field: "name".to_string(),
                message: "Name is required".to_string(),
            }],
        };
        let err: Error = CommitError::Validation(validation).into();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.exit_code(), exit_code::ARGUMENT_ERROR);
        assert!(err.to_string().contains("name: Name is required"));
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(
            Error::from(PersistenceError::unavailable("down")).exit_code(),
            exit_code::STORAGE_ERROR
        );
        assert_eq!(
            Error::from(ExtractionError::Cancelled).exit_code(),
            exit_code::EXTRACTION_ERROR
        );
        assert_eq!(Error::not_found("day x").exit_code(), exit_code::ARGUMENT_ERROR);
    }
}
