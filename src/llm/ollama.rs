//! Ollama API backend.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{http_client, snippet, ChatRequest, InferenceBackend, LlmError};
use super::config::LlmConfig;

/// Backend for a local Ollama server.
pub struct OllamaBackend {
    endpoint: String,
    model: String,
    client: Client,
}

/// Ollama `/api/chat` request format.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama `/api/chat` response format.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

/// `/api/generate` with `keep_alive: 0` and no prompt evicts the model.
#[derive(Debug, Serialize)]
struct OllamaUnloadRequest<'a> {
    model: &'a str,
    keep_alive: u32,
}

impl OllamaBackend {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: config.endpoint(),
            model: config.model.clone(),
            client: http_client(config.timeout_secs)?,
        })
    }

    fn build_request<'a>(&'a self, request: &'a ChatRequest) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.model,
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: &request.system,
                },
                OllamaMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

fn parse_chat_response(body: &str) -> Result<String, LlmError> {
    let resp: OllamaChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    if let Some(error) = resp.error {
        return Err(LlmError::Api(error));
    }
    resp.message
        .map(|m| m.content.trim().to_string())
        .ok_or_else(|| LlmError::Parse("response has no message".to_string()))
}

fn status_error(status: StatusCode, body: &str, model: &str) -> LlmError {
    if status == StatusCode::NOT_FOUND && body.contains("not found") {
        LlmError::ModelNotFound(format!("{} (try: ollama pull {})", model, model))
    } else {
        LlmError::Api(format!("HTTP {}: {}", status, snippet(body)))
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        debug!("POST {} (model {})", url, self.model);

        let resp = self
            .client
            .post(&url)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = resp.status();
        let body = resp.text().await.map_err(LlmError::from_reqwest)?;
        if !status.is_success() {
            return Err(status_error(status, &body, &self.model));
        }
        parse_chat_response(&body)
    }

    async fn unload(&self) -> Result<(), LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&OllamaUnloadRequest {
                model: &self.model,
                keep_alive: 0,
            })
            .send()
            .await
            .map_err(|e| LlmError::Unload(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Unload(format!("HTTP {}: {}", status, snippet(&body))));
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.endpoint);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        #[derive(Deserialize)]
        struct TagsResponse {
            models: Vec<ModelInfo>,
        }

        #[derive(Deserialize)]
        struct ModelInfo {
            name: String,
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> OllamaBackend {
        OllamaBackend::new(&LlmConfig::default()).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let backend = backend();
        let request = ChatRequest {
            system: "sys".to_string(),
            user: "usr".to_string(),
            temperature: 0.0,
            max_tokens: 64,
        };
        let json = serde_json::to_value(backend.build_request(&request)).unwrap();
        assert_eq!(json["model"], "qwen2.5:7b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "usr");
        assert_eq!(json["options"]["num_predict"], 64);
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"model":"qwen2.5:7b","message":{"role":"assistant","content":" {\"domain_cn\":\"免疫学\",\"domain_en\":\"Immunology\"}\n"},"done":true}"#;
        assert_eq!(
            parse_chat_response(body).unwrap(),
            r#"{"domain_cn":"免疫学","domain_en":"Immunology"}"#
        );

        assert!(matches!(
            parse_chat_response(r#"{"error":"out of memory"}"#),
            Err(LlmError::Api(_))
        ));
        assert!(matches!(parse_chat_response("<html>"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_model_not_found_status() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            r#"{"error":"model \"qwen9\" not found, try pulling it first"}"#,
            "qwen9",
        );
        assert!(matches!(err, LlmError::ModelNotFound(_)));

        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom", "qwen9");
        assert!(matches!(err, LlmError::Api(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Bind then drop to get a port nothing is listening on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let backend = OllamaBackend::new(&LlmConfig {
            endpoint: Some(format!("http://127.0.0.1:{}", port)),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();

        let request = ChatRequest {
            system: String::new(),
            user: "hello".to_string(),
            temperature: 0.0,
            max_tokens: 8,
        };
        assert!(matches!(
            backend.complete(&request).await,
            Err(LlmError::Connection(_))
        ));
        assert!(matches!(backend.unload().await, Err(LlmError::Unload(_))));
        assert!(!backend.is_available().await);
    }
}
