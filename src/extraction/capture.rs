//! Capture flow: recognize → extract → validate → merge into a form

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ExtractionError;
use super::pipeline::ExtractionPipeline;
use crate::form::WorkoutDayForm;

/// Image-to-text recognition collaborator
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize all text in the image at `image`
    async fn recognize_text(&self, image: &Path) -> Result<String>;
}

/// Treats the input file as already-recognized text
///
/// Lets the capture flow run on text exported by any external OCR tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFileRecognizer;

#[async_trait]
impl TextRecognizer for TextFileRecognizer {
    async fn recognize_text(&self, image: &Path) -> Result<String> {
        let text = tokio::fs::read_to_string(image).await?;
        Ok(text)
    }
}

/// Chains recognition and extraction, merging drafts into a form
///
/// Each stage observes the same cancellation token. The form is only
/// touched once every stage has succeeded.
pub struct CaptureFlow {
    recognizer: Arc<dyn TextRecognizer>,
    pipeline: ExtractionPipeline,
}

impl CaptureFlow {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, pipeline: ExtractionPipeline) -> Self {
        Self {
            recognizer,
            pipeline,
        }
    }

    /// Run the flow, returning how many entries were appended to `form`
    pub async fn run(
        &self,
        image: &Path,
        form: &mut WorkoutDayForm,
        cancel: &CancellationToken,
    ) -> Result<usize, ExtractionError> {
        let text = self.recognize(image, cancel).await?;
        debug!(
            "Recognized {} characters from {}",
            text.len(),
            image.display()
        );

        let drafts = self
            .pipeline
            .get_exercises_from_text_cancellable(&text, cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let count = drafts.len();
        for draft in drafts {
            form.append_draft(draft);
        }
        Ok(count)
    }

    async fn recognize(
        &self,
        image: &Path,
        cancel: &CancellationToken,
    ) -> Result<String, ExtractionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
            result = self.recognizer.recognize_text(image) => {
                result.map_err(|e| ExtractionError::Recognition(e.to_string()))
            }
        }
    }
}
