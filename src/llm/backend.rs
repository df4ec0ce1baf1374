//! Inference backend abstraction.
//!
//! The classifier talks to a model through `InferenceBackend`; Ollama and
//! OpenAI-compatible servers differ only in request/response shape and in how
//! a resident model is unloaded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::config::{LlmConfig, LlmProvider};
use super::ollama::OllamaBackend;
use super::openai::OpenAiBackend;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Failed to connect to LLM service (refused, DNS, timeout)
    #[error("Connection error: {0}")]
    Connection(String),

    /// API returned an error status
    #[error("API error: {0}")]
    Api(String),

    /// Response body was not the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Model not available on the server
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Unload directive could not be carried out
    #[error("Unload failed: {0}")]
    Unload(String),
}

impl LlmError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Connection(format!("request timed out: {}", e))
        } else {
            LlmError::Connection(e.to_string())
        }
    }
}

/// A single chat-style classification request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A model server that can answer chat requests.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Human-readable name for CLI output.
    fn name(&self) -> &str;

    /// Model the backend sends requests to.
    fn model(&self) -> &str;

    /// Send one request and return the raw reply text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;

    /// Ask the server to release its resident model. It reloads lazily on
    /// the next request.
    async fn unload(&self) -> Result<(), LlmError>;

    /// Check if the service answers at all.
    async fn is_available(&self) -> bool;

    /// List models the server reports.
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Build the HTTP client shared by both backends.
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))
}

/// Create the backend selected by `config.provider`.
pub fn create_backend(config: &LlmConfig) -> Result<Arc<dyn InferenceBackend>, LlmError> {
    let backend: Arc<dyn InferenceBackend> = match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(config)?),
        LlmProvider::OpenAI => Arc::new(OpenAiBackend::new(config)?),
    };
    Ok(backend)
}

/// Truncate an HTTP error body for log output (UTF-8 safe).
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        return body.trim().to_string();
    }
    let mut end = MAX;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", body[..end].trim())
}
