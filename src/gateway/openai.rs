//! OpenAI-compatible chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::traits::LanguageModelGateway;
use crate::common::errors::{EngineError, Result};
use crate::config::types::{ApiCredentials, LlmConfig};

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat-completions response body (only the fields we read)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP gateway for any OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiGateway {
    /// HTTP client
    client: Client,
    /// Fully-resolved completions endpoint
    endpoint: Url,
    /// Model name
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Bearer credentials
    credentials: ApiCredentials,
}

impl OpenAiGateway {
    /// Create a gateway from configuration and resolved credentials
    pub fn new(config: &LlmConfig, credentials: ApiCredentials) -> Result<Self> {
        Self::with_timeout(config, credentials, config.request_timeout())
    }

    /// Create a gateway with a custom transport timeout
    pub fn with_timeout(
        config: &LlmConfig,
        credentials: ApiCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .map_err(|e| {
                EngineError::Configuration(format!("invalid llm.base_url {}: {}", config.base_url, e))
            })?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            credentials,
        })
    }

    /// The endpoint requests are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LanguageModelGateway for OpenAiGateway {
    #[instrument(skip(self, system_prompt, user_prompt), fields(model = %self.model))]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };
        debug!("Posting completion request to: {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.credentials.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Gateway(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Gateway(format!("unreadable completion body: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| EngineError::Gateway("completion returned no content".to_string()))
    }

    fn provider_name(&self) -> &str {
        &self.model
    }
}
