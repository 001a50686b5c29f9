//! Mock collaborators for testing

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::extraction::client::{ContentBlock, ModelClient, ModelError, ModelResponse, ToolRequest, Usage};
use crate::extraction::TextRecognizer;
use crate::persistence::{KeyValueStore, MemoryKeyValueStore, PersistenceError, PersistenceResult};

/// A model answer consisting of one forced tool call
pub fn tool_call_response(input: Value) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::ToolUse {
            id: "toolu_mock".to_string(),
            name: crate::extraction::TOOL_NAME.to_string(),
            input,
        }],
        model: "mock-model".to_string(),
        stop_reason: Some("tool_use".to_string()),
        usage: Usage::default(),
    }
}

/// A model answer consisting of prose only
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        model: "mock-model".to_string(),
        stop_reason: Some("end_turn".to_string()),
        usage: Usage::default(),
    }
}

/// Builder for creating configured mock model clients
pub struct MockModelClientBuilder {
    responses: VecDeque<Result<ModelResponse, ModelError>>,
    delay: Option<Duration>,
}

impl MockModelClientBuilder {
    pub fn new() -> Self {
        Self {
            responses: VecDeque::new(),
            delay: None,
        }
    }

    pub fn with_response(mut self, response: ModelResponse) -> Self {
        self.responses.push_back(Ok(response));
        self
    }

    pub fn with_tool_call(self, input: Value) -> Self {
        self.with_response(tool_call_response(input))
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_response(text_response(text))
    }

    pub fn with_error(mut self, error: ModelError) -> Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Wait this long before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn build(self) -> MockModelClient {
        MockModelClient {
            responses: Arc::new(Mutex::new(self.responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: self.delay,
        }
    }
}

impl Default for MockModelClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock implementation of ModelClient for testing
///
/// Answers are served in the order they were configured. Once exhausted,
/// every call gets a tool call with an empty exercise list.
#[derive(Clone)]
pub struct MockModelClient {
    responses: Arc<Mutex<VecDeque<Result<ModelResponse, ModelError>>>>,
    requests: Arc<Mutex<Vec<ToolRequest>>>,
    delay: Option<Duration>,
}

impl MockModelClient {
    pub fn new() -> Self {
        MockModelClientBuilder::new().build()
    }

    pub fn builder() -> MockModelClientBuilder {
        MockModelClientBuilder::new()
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ToolRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(&self, request: &ToolRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(tool_call_response(serde_json::json!({ "exercises": [] }))))
    }
}

/// Recognizer returning fixed text, or failing
#[derive(Debug, Clone)]
pub struct StaticRecognizer {
    text: Option<String>,
}

impl StaticRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextRecognizer for StaticRecognizer {
    async fn recognize_text(&self, image: &Path) -> Result<String> {
        self.text
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no text found in {}", image.display()))
    }
}

/// In-memory byte store whose writes can be switched to fail
#[derive(Debug, Clone, Default)]
pub struct FailingKeyValueStore {
    inner: MemoryKeyValueStore,
    failing: Arc<AtomicBool>,
}

impl FailingKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryKeyValueStore {
        &self.inner
    }

    fn check(&self) -> PersistenceResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::unavailable("simulated write failure"))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FailingKeyValueStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> PersistenceResult<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> PersistenceResult<()> {
        self.check()?;
        self.inner.delete(key)
    }
}
