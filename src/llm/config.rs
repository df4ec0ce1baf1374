//! Inference backend configuration.
//!
//! Read from the `llm` section of the config file. Connection settings can be
//! overridden from the environment:
//! LITDOMAIN_LLM_PROVIDER, LITDOMAIN_LLM_ENDPOINT, LITDOMAIN_LLM_MODEL,
//! LITDOMAIN_LLM_API_KEY (and OLLAMA_HOST for the Ollama provider).

use serde::{Deserialize, Serialize};

use super::prompts::{DEFAULT_PREFERRED_DOMAINS, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};

const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";
const DEFAULT_OPENAI_ENDPOINT: &str = "http://localhost:1234/v1";

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (LM Studio, llama.cpp server, vLLM, ...)
    #[serde(alias = "openai_api", alias = "lmstudio", alias = "openai-compatible")]
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "openai_api" | "lmstudio" | "openai-compatible" => Some(Self::OpenAI),
            _ => None,
        }
    }

    fn default_endpoint(&self) -> &'static str {
        match self {
            Self::Ollama => DEFAULT_OLLAMA_ENDPOINT,
            Self::OpenAI => DEFAULT_OPENAI_ENDPOINT,
        }
    }
}

/// Configuration for the inference backend and classification requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend API to speak
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model to use for classification
    #[serde(default = "default_model")]
    pub model: String,
    /// API endpoint (provider-specific default when unset)
    #[serde(default, alias = "api_base", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// API key for OpenAI-compatible servers that require one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation
    #[serde(default)]
    pub temperature: f32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Custom system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Custom user instruction (uses {domains}, {file_name} and {content} placeholders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    /// Domains the model should prefer before inventing its own label
    #[serde(default = "default_preferred_domains")]
    pub preferred_domains: Vec<String>,
    /// Command that unloads the resident model (OpenAI-compatible servers only,
    /// e.g. `["lms", "unload", "--all"]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unload_command: Option<Vec<String>>,
}

fn default_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_preferred_domains() -> Vec<String> {
    DEFAULT_PREFERRED_DOMAINS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            system_prompt: None,
            user_prompt: None,
            preferred_domains: default_preferred_domains(),
            unload_command: None,
        }
    }
}

impl LlmConfig {
    /// Effective endpoint without a trailing slash.
    pub fn endpoint(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
            .trim_end_matches('/')
            .to_string()
    }

    /// Get the system prompt, using custom or default.
    pub fn get_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Get the user prompt template, using custom or default.
    pub fn get_user_prompt(&self) -> &str {
        self.user_prompt.as_deref().unwrap_or(DEFAULT_USER_PROMPT)
    }

    /// Get the provider name for display.
    pub fn provider_name(&self) -> &'static str {
        match self.provider {
            LlmProvider::Ollama => "Ollama",
            LlmProvider::OpenAI => "OpenAI-compatible",
        }
    }

    /// Get a provider-aware availability hint for error messages.
    pub fn availability_hint(&self) -> String {
        match self.provider {
            LlmProvider::Ollama => format!(
                "Ollama not available at {}. Make sure Ollama is running: ollama serve",
                self.endpoint()
            ),
            LlmProvider::OpenAI => format!(
                "No OpenAI-compatible server at {}. Start the server (e.g. LM Studio) and load {}",
                self.endpoint(),
                self.model
            ),
        }
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(provider) = var("LITDOMAIN_LLM_PROVIDER").and_then(|v| LlmProvider::from_str(&v))
        {
            self.provider = provider;
        }

        // Explicit endpoint always wins, then OLLAMA_HOST for Ollama provider
        if let Some(endpoint) = var("LITDOMAIN_LLM_ENDPOINT") {
            self.endpoint = Some(endpoint);
        } else if self.endpoint.is_none() && self.provider == LlmProvider::Ollama {
            if let Some(host) = var("OLLAMA_HOST") {
                self.endpoint = Some(normalize_ollama_host(&host));
            }
        }

        if let Some(model) = var("LITDOMAIN_LLM_MODEL") {
            self.model = model;
        }
        if let Some(key) = var("LITDOMAIN_LLM_API_KEY") {
            self.api_key = Some(key);
        }
        self
    }
}

/// OLLAMA_HOST is commonly set as a bare `host:port`.
fn normalize_ollama_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
