//! Structured extraction of exercises from recognized text
//!
//! A photographed exercise sheet goes through text recognition (external),
//! then a single forced tool call to a language model whose answer must
//! match a fixed schema. Anything else aborts the call with an
//! [`ExtractionError`] and contributes no drafts.
//!
//! # Architecture
//!
//! - [`ModelClient`] - provider seam; [`AnthropicClient`] talks HTTP
//! - [`ExtractionPipeline`] - builds the request, validates the answer
//! - [`CaptureFlow`] - recognize → extract → merge into a form
//! - [`ExerciseDraft`] - a validated candidate, not yet in the store

pub mod capture;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod schema;
#[cfg(test)]
mod tests;

pub use capture::{CaptureFlow, TextFileRecognizer, TextRecognizer};
pub use client::{AnthropicClient, ContentBlock, ModelClient, ModelError, ModelResponse, ToolRequest};
pub use error::ExtractionError;
pub use pipeline::{ExtractionPipeline, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, TOOL_NAME};
pub use schema::ExerciseDraft;
