//! Completion service client
//!
//! Talks to an OpenAI-compatible chat completions endpoint through a
//! bearer-token proxy. The `CompletionApi` trait is the seam the answer
//! pipeline is tested through.

use async_trait::async_trait;
use courseta_core::{CompletionConfig, CoursetaError, CoursetaResult, ErrorContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One message of a chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-style completion service
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// Send one completion request and return the reply text
    async fn complete(&self, messages: Vec<ChatMessage>, max_tokens: u32)
        -> CoursetaResult<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// HTTP client for the completion proxy
pub struct CompletionClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl CompletionClient {
    /// Build a client from configuration; the API key is a hard
    /// precondition.
    pub fn new(config: &CompletionConfig) -> CoursetaResult<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| CoursetaError::Config {
            message: "AIPROXY_TOKEN is not set".to_string(),
            source: None,
            context: ErrorContext::new("completion_client")
                .with_operation("new")
                .with_suggestion("Set the AIPROXY_TOKEN environment variable"),
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth_value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                CoursetaError::Config {
                    message: format!("API key contains invalid header characters: {}", e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("completion_client").with_operation("new"),
                }
            })?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .map_err(|e| CoursetaError::Config {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("completion_client").with_operation("new"),
            })?;

        info!(
            "Created completion client for {} (model: {})",
            config.base_url, config.model
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionApi for CompletionClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
    ) -> CoursetaResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("Completion request to {} ({} messages)", url, messages.len());

        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoursetaError::Processing {
                message: format!("Completion request failed: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("completion_client").with_operation("complete"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoursetaError::Processing {
                message: format!("Completion service returned HTTP {}: {}", status, body),
                source: None,
                context: ErrorContext::new("completion_client").with_operation("complete"),
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| CoursetaError::Processing {
                message: format!("Failed to parse completion response: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("completion_client").with_operation("complete"),
            })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CoursetaError::Processing {
                message: "Completion response contained no choices".to_string(),
                source: None,
                context: ErrorContext::new("completion_client").with_operation("complete"),
            })
    }
}
