//! Single-retry classification against an inference backend.

use std::sync::Arc;

use tracing::{debug, warn};

use super::parse::{parse_reply, ParseOutcome};
use super::prompt::BuiltPrompt;
use crate::llm::{ChatRequest, InferenceBackend, LlmConfig};
use crate::models::DomainPair;

/// First attempt plus one retry, shared by parse and transport failures.
const MAX_ATTEMPTS: u32 = 2;

/// What a classification produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    /// Parsed labels, or the sentinel pair.
    pub domain: DomainPair,
    /// True when the labels came from a parsed reply.
    pub parsed: bool,
    /// Requests issued (1 or 2).
    pub attempts: u32,
    /// Last transport/endpoint error, if any attempt hit one.
    pub last_error: Option<String>,
}

/// Sends prompts to a backend and turns replies into domain labels.
pub struct Classifier {
    backend: Arc<dyn InferenceBackend>,
    temperature: f32,
    max_tokens: u32,
}

impl Classifier {
    pub fn new(backend: Arc<dyn InferenceBackend>, llm: &LlmConfig) -> Self {
        Self {
            backend,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        }
    }

    pub fn backend(&self) -> &dyn InferenceBackend {
        self.backend.as_ref()
    }

    /// Classify one prompt.
    ///
    /// An unparsable reply or a transport error is retried once with the same
    /// prompt; a second failure yields the sentinel pair. Never fails.
    pub async fn classify(&self, prompt: &BuiltPrompt) -> ClassificationOutcome {
        let request = ChatRequest {
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.backend.complete(&request).await {
                Ok(reply) => match parse_reply(&reply) {
                    ParseOutcome::Parsed(domain) => {
                        return ClassificationOutcome {
                            domain,
                            parsed: true,
                            attempts: attempt,
                            last_error,
                        };
                    }
                    ParseOutcome::Unparsed => {
                        debug!(
                            "Attempt {}/{}: unparsable reply: {:?}",
                            attempt,
                            MAX_ATTEMPTS,
                            reply.chars().take(200).collect::<String>()
                        );
                    }
                },
                Err(e) => {
                    warn!("Attempt {}/{}: {} request failed: {}", attempt, MAX_ATTEMPTS, self.backend.name(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        ClassificationOutcome {
            domain: DomainPair::uncategorized(),
            parsed: false,
            attempts: MAX_ATTEMPTS,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays canned replies and records requests.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        async fn unload(&self) -> Result<(), LlmError> {
            Ok(())
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            Ok(vec!["scripted-model".to_string()])
        }
    }

    fn prompt() -> BuiltPrompt {
        BuiltPrompt {
            system: "sys".to_string(),
            user: "classify this".to_string(),
            excerpt_chars: 13,
        }
    }

    fn classifier(backend: Arc<ScriptedBackend>) -> Classifier {
        Classifier::new(backend, &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_first_attempt_parses() {
        let backend = ScriptedBackend::new(vec![Ok(
            r#"{"domain_cn":"免疫学","domain_en":"Immunology"}"#.to_string(),
        )]);
        let outcome = classifier(backend.clone()).classify(&prompt()).await;
        assert_eq!(outcome.domain, DomainPair::new("免疫学", "Immunology"));
        assert!(outcome.parsed);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_once_with_same_prompt() {
        let backend = ScriptedBackend::new(vec![
            Ok("<think>hmm".to_string()),
            Ok(r#"{"domain_cn":"病毒学","domain_en":"Virology"}"#.to_string()),
        ]);
        let outcome = classifier(backend.clone()).classify(&prompt()).await;
        assert_eq!(outcome.domain, DomainPair::new("病毒学", "Virology"));
        assert_eq!(outcome.attempts, 2);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[0].temperature, 0.0);
        assert_eq!(requests[0].max_tokens, 256);
    }

    #[tokio::test]
    async fn test_two_parse_failures_yield_sentinel() {
        let backend = ScriptedBackend::new(vec![
            Ok("no idea".to_string()),
            Ok("still no idea".to_string()),
            Ok(r#"{"domain_cn":"不应使用","domain_en":"Unused"}"#.to_string()),
        ]);
        let outcome = classifier(backend.clone()).classify(&prompt()).await;
        assert_eq!(outcome.domain, DomainPair::new("未分类", "Uncategorized"));
        assert!(!outcome.parsed);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.last_error, None);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_retried_then_sentinel() {
        let backend = ScriptedBackend::new(vec![
            Err(LlmError::Connection("connection refused".to_string())),
            Err(LlmError::ModelNotFound("qwen".to_string())),
        ]);
        let outcome = classifier(backend.clone()).classify(&prompt()).await;
        assert!(outcome.domain.is_uncategorized());
        assert_eq!(backend.calls(), 2);
        assert!(outcome.last_error.unwrap().contains("Model not found"));
    }

    #[tokio::test]
    async fn test_transport_error_then_success() {
        let backend = ScriptedBackend::new(vec![
            Err(LlmError::Connection("timed out".to_string())),
            Ok("药理学 | Pharmacology".to_string()),
        ]);
        let outcome = classifier(backend).classify(&prompt()).await;
        assert_eq!(outcome.domain, DomainPair::new("药理学", "Pharmacology"));
        assert!(outcome.parsed);
        assert!(outcome.last_error.is_some());
    }
}
