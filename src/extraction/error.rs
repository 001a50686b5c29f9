//! Error types for the extraction pipeline

use std::fmt;
use thiserror::Error;

use super::client::ModelError;

/// Extraction error types
///
/// Every variant means the call contributed no drafts.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The model answered, but not with the expected tool call
    #[error("Unexpected response from model: {0}")]
    UnexpectedResponse(String),

    /// The tool call input did not match the exercise schema
    #[error("Model response failed validation: {0}")]
    InvalidPayload(String),

    /// The model collaborator itself failed
    #[error("Model request failed: {0}")]
    Model(#[from] ModelError),

    /// Text recognition failed before extraction started
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    /// The caller cancelled before a result was applied
    #[error("Extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    pub fn unexpected<E: fmt::Display>(msg: E) -> Self {
        Self::UnexpectedResponse(msg.to_string())
    }

    pub fn invalid<E: fmt::Display>(msg: E) -> Self {
        Self::InvalidPayload(msg.to_string())
    }

    /// Check if the same request may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Model(e) => e.is_retryable(),
            Self::UnexpectedResponse(_) | Self::InvalidPayload(_) => true,
            Self::Recognition(_) | Self::Cancelled => false,
        }
    }
}
