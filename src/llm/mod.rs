//! Local LLM backends for domain classification.
//!
//! Supports Ollama and OpenAI-compatible servers (LM Studio, llama.cpp, vLLM).

mod backend;
mod config;
mod ollama;
mod openai;
mod prompts;

pub use backend::{create_backend, ChatRequest, InferenceBackend, LlmError};
pub use config::{LlmConfig, LlmProvider};
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use prompts::{DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT, NO_CONTENT_MARKER};
