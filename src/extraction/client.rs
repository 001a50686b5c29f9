//! Language-model collaborator: forced tool-call requests

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Default Messages API endpoint
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Longest wait between retries
const MAX_BACKOFF_MS: u64 = 60_000;

/// Model collaborator error types
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid API key")]
    Unauthorized,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    /// Check if an error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized | Self::Decode(_) | Self::Config(_) => false,
        }
    }
}

/// Tool the model is forced to call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A single-turn request whose answer must be a call to `tool`
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub model: String,
    pub max_tokens: u32,
    pub prompt: String,
    pub tool: ToolDefinition,
}

/// One block of model output
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Model answer as returned by the provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

/// Anything that can answer a [`ToolRequest`]
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, request: &ToolRequest) -> Result<ModelResponse, ModelError>;
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    tools: [&'a ToolDefinition; 1],
    tool_choice: ToolChoice<'a>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ToolChoice<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic Messages API client with retry logic
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    endpoint: String,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl AnthropicClient {
    /// Create a new client
    pub fn new(api_key: String, max_retries: u32, retry_delay_ms: u64) -> Result<Self, ModelError> {
        if api_key.trim().is_empty() {
            return Err(ModelError::Config("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ModelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: ANTHROPIC_API_URL.to_string(),
            max_retries,
            retry_delay_ms,
        })
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Make a single API request
    async fn make_request(&self, request: &ToolRequest) -> Result<ModelResponse, ModelError> {
        let body = ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            tools: [&request.tool],
            tool_choice: ToolChoice {
                kind: "tool",
                name: &request.tool.name,
            },
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<ModelResponse>()
                .await
                .map_err(|e| ModelError::Decode(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ModelError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ModelError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ModelError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Calculate exponential backoff delay, capped at [`MAX_BACKOFF_MS`]
    fn calculate_backoff(&self, retry_count: u32) -> u64 {
        let factor = 2u64.saturating_pow(retry_count.saturating_sub(1));
        self.retry_delay_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn invoke(&self, request: &ToolRequest) -> Result<ModelResponse, ModelError> {
        let mut retry_count = 0;
        loop {
            match self.make_request(request).await {
                Ok(response) => {
                    debug!(
                        "Model {} answered ({} in / {} out tokens, stop: {:?})",
                        response.model,
                        response.usage.input_tokens,
                        response.usage.output_tokens,
                        response.stop_reason
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if retry_count >= self.max_retries || !e.is_retryable() {
                        return Err(e);
                    }

                    retry_count += 1;
                    let delay = self.calculate_backoff(retry_count);
                    warn!(
                        "Model request failed ({}), retry {}/{} in {}ms",
                        e, retry_count, self.max_retries, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }
}
