//! Recognized text → validated exercise drafts

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::{ContentBlock, ModelClient, ToolDefinition, ToolRequest};
use super::error::ExtractionError;
use super::prompt::build_instructions;
use super::schema::{parse_payload, payload_schema, ExerciseDraft};

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Name of the single tool the model must call
pub const TOOL_NAME: &str = "json";

/// Turns recognized text into drafts through one forced tool call
///
/// The pipeline only produces candidates; committing them to the store is
/// the caller's job.
#[derive(Clone)]
pub struct ExtractionPipeline {
    client: Arc<dyn ModelClient>,
    model: String,
    max_tokens: u32,
}

impl ExtractionPipeline {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The exact request sent for `text`
    pub fn request_for(&self, text: &str) -> ToolRequest {
        ToolRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            prompt: build_instructions(text),
            tool: ToolDefinition {
                name: TOOL_NAME.to_string(),
                description: String::new(),
                input_schema: payload_schema(),
            },
        }
    }

    /// Extract drafts from `text`; any malformed answer yields zero drafts
    pub async fn get_exercises_from_text(
        &self,
        text: &str,
    ) -> Result<Vec<ExerciseDraft>, ExtractionError> {
        if text.trim().is_empty() {
            debug!("Skipping extraction of empty text");
            return Ok(Vec::new());
        }

        let request = self.request_for(text);
        let response = self.client.invoke(&request).await?;

        let input = match response.content.into_iter().next() {
            Some(ContentBlock::ToolUse { name, input, .. }) if name == TOOL_NAME => input,
            Some(ContentBlock::ToolUse { name, .. }) => {
                warn!("Model called unexpected tool '{}'", name);
                return Err(ExtractionError::unexpected(format!(
                    "call to unknown tool '{name}'"
                )));
            }
            Some(_) => {
                warn!("Model answered with prose instead of a tool call");
                return Err(ExtractionError::unexpected("expected a tool call"));
            }
            None => return Err(ExtractionError::unexpected("empty response")),
        };

        let drafts = parse_payload(input)?;
        info!("Extracted {} exercise drafts", drafts.len());
        Ok(drafts)
    }

    /// As [`Self::get_exercises_from_text`], abandoned as soon as `cancel`
    /// fires. A response arriving after cancellation is dropped.
    pub async fn get_exercises_from_text_cancellable(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExerciseDraft>, ExtractionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Extraction cancelled by caller");
                Err(ExtractionError::Cancelled)
            }
            result = self.get_exercises_from_text(text) => result,
        }
    }
}
