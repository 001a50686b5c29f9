//! Error types for the persistence layer

use std::fmt;
use thiserror::Error;

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence error types
///
/// A failed write never rolls back the in-memory store; the error only says
/// that the slot may lag behind it.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The byte store failed to read or write
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key is not usable by the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Backend is not able to serve requests
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    pub fn invalid_key<E: fmt::Display>(key: E) -> Self {
        Self::InvalidKey(key.to_string())
    }

    pub fn unavailable<E: fmt::Display>(msg: E) -> Self {
        Self::Unavailable(msg.to_string())
    }

    /// Check if retrying the same write may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}
