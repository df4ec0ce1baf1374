//! OpenAI-compatible chat completions backend (LM Studio, llama.cpp server, vLLM).

use std::process::Command;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{http_client, snippet, ChatRequest, InferenceBackend, LlmError};
use super::config::LlmConfig;

/// Backend for servers exposing `/chat/completions`.
pub struct OpenAiBackend {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    unload_command: Option<Vec<String>>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Option<Vec<OpenAiChoice>>,
    error: Option<OpenAiError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

impl OpenAiBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: config.endpoint(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            unload_command: config
                .unload_command
                .clone()
                .filter(|argv| !argv.is_empty()),
            client: http_client(config.timeout_secs)?,
        })
    }

    fn build_request<'a>(&'a self, request: &'a ChatRequest) -> OpenAiRequest<'a> {
        OpenAiRequest {
            model: &self.model,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: &request.system,
                },
                OpenAiMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn parse_completion(body: &str) -> Result<String, LlmError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;

    if let Some(error) = resp.error {
        return Err(LlmError::Api(error.message));
    }

    resp.choices
        .and_then(|c| c.into_iter().next())
        .map(|c| c.message.content.unwrap_or_default().trim().to_string())
        .ok_or_else(|| LlmError::Parse("response has no choices".to_string()))
}

fn status_error(status: StatusCode, body: &str, model: &str) -> LlmError {
    let lowered = body.to_lowercase();
    if status == StatusCode::NOT_FOUND
        || (lowered.contains("model") && lowered.contains("not found"))
    {
        LlmError::ModelNotFound(format!("{} ({})", model, snippet(body)))
    } else {
        LlmError::Api(format!("HTTP {}: {}", status, snippet(body)))
    }
}

#[async_trait]
impl InferenceBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("POST {} (model {})", url, self.model);

        let resp = self
            .authorize(self.client.post(&url))
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(LlmError::from_reqwest)?;
        if !status.is_success() {
            return Err(status_error(status, &body, &self.model));
        }
        parse_completion(&body)
    }

    /// The chat completions API has no unload call, so this runs the
    /// configured command instead (e.g. `lms unload --all`).
    async fn unload(&self) -> Result<(), LlmError> {
        let Some(argv) = self.unload_command.clone() else {
            debug!("No unload_command configured, skipping unload");
            return Ok(());
        };

        let output = tokio::task::spawn_blocking(move || {
            Command::new(&argv[0]).args(&argv[1..]).output()
        })
        .await
        .map_err(|e| LlmError::Unload(e.to_string()))?
        .map_err(|e| LlmError::Unload(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::Unload(format!(
                "unload command exited with {}: {}",
                output.status,
                snippet(&stderr)
            )));
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/models", self.endpoint);
        match self.authorize(self.client.get(&url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/models", self.endpoint);
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            id: String,
        }

        let models: ModelsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}
