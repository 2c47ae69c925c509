//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model gateway configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Ingestion loop configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the API (the client appends `/chat/completions`)
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model name sent with every request
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Explicit API key; first credential source consulted
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variables consulted in order after `api_key`
    #[serde(default = "default_credential_env_vars")]
    pub credential_env_vars: Vec<String>,
    /// File holding the key; last credential source consulted
    #[serde(default)]
    pub api_key_file: Option<String>,
    /// Upper bound on a single completion call in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl LlmConfig {
    /// Completion timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            api_key: None,
            credential_env_vars: default_credential_env_vars(),
            api_key_file: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_credential_env_vars() -> Vec<String> {
    vec![
        "SIGNAL_ENGINE_LLM_API_KEY".to_string(),
        "OPENAI_API_KEY".to_string(),
        "DEEPSEEK_API_KEY".to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    60
}

/// Ingestion loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Capacity of the alert queue between the signal source and the loop
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_size: default_channel_size(),
        }
    }
}

fn default_channel_size() -> usize {
    crate::common::channels::DEFAULT_CHANNEL_SIZE
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format ("pretty" or "json")
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Resolved API credential for the language-model gateway
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    /// Name of the provider the key came from
    pub source: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, source: impl Into<String>) -> Self {
        Self {
            api_key,
            source: source.into(),
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}
