//! Ordered credential providers for the language-model gateway
//!
//! Providers are tried once, in order, at startup. The first one that yields
//! a non-empty key wins.

use tracing::{debug, info};

use crate::common::errors::{EngineError, Result};
use crate::config::types::{ApiCredentials, LlmConfig};

/// A single place an API key may come from
pub trait CredentialProvider: Send + Sync {
    /// Human-readable name of the source, logged on success
    fn name(&self) -> String;

    /// The key, if this source has one
    fn api_key(&self) -> Option<String>;
}

/// Key set directly in configuration
pub struct StaticKey(pub Option<String>);

impl CredentialProvider for StaticKey {
    fn name(&self) -> String {
        "config:llm.api_key".to_string()
    }

    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Key read from an environment variable
pub struct EnvVarKey(pub String);

impl CredentialProvider for EnvVarKey {
    fn name(&self) -> String {
        format!("env:{}", self.0)
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.0).ok()
    }
}

/// Key read from the first line of a file
pub struct FileKey(pub String);

impl CredentialProvider for FileKey {
    fn name(&self) -> String {
        format!("file:{}", self.0)
    }

    fn api_key(&self) -> Option<String> {
        std::fs::read_to_string(&self.0)
            .ok()
            .and_then(|contents| contents.lines().next().map(str::to_string))
    }
}

/// Build the provider chain described by the gateway configuration
pub fn providers_from_config(config: &LlmConfig) -> Vec<Box<dyn CredentialProvider>> {
    let mut providers: Vec<Box<dyn CredentialProvider>> =
        vec![Box::new(StaticKey(config.api_key.clone()))];

    providers.extend(
        config
            .credential_env_vars
            .iter()
            .map(|var| Box::new(EnvVarKey(var.clone())) as Box<dyn CredentialProvider>),
    );

    if let Some(path) = &config.api_key_file {
        providers.push(Box::new(FileKey(path.clone())));
    }

    providers
}

/// Walk the providers in order and return the first usable key
pub fn resolve_credentials(providers: &[Box<dyn CredentialProvider>]) -> Result<ApiCredentials> {
    for provider in providers {
        match provider.api_key() {
            Some(key) if !key.trim().is_empty() => {
                info!(source = %provider.name(), "Resolved language-model credentials");
                return Ok(ApiCredentials::new(key.trim().to_string(), provider.name()));
            }
            _ => debug!(source = %provider.name(), "No credentials from source"),
        }
    }

    let tried: Vec<String> = providers.iter().map(|p| p.name()).collect();
    Err(EngineError::Configuration(format!(
        "no language-model API key found (tried: {})",
        tried.join(", ")
    )))
}
