//! Trait definition for language-model gateways

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::common::errors::{EngineError, Result};

/// Text-completion service treated as an opaque function
///
/// Used identically by the directive parser and the risk evaluator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModelGateway: Send + Sync {
    /// Complete `user_prompt` under the fixed `system_prompt`
    ///
    /// Returns the raw response text, possibly wrapped in code fences.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Name of the backing provider, for logs
    fn provider_name(&self) -> &str {
        "llm"
    }
}

/// Call the gateway, failing with a recoverable gateway error once `timeout` elapses
pub async fn complete_with_timeout(
    gateway: &dyn LanguageModelGateway,
    system_prompt: &str,
    user_prompt: &str,
    timeout: Duration,
) -> Result<String> {
    match tokio::time::timeout(timeout, gateway.complete(system_prompt, user_prompt)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                provider = gateway.provider_name(),
                timeout_ms = timeout.as_millis() as u64,
                "Language-model call timed out"
            );
            Err(EngineError::Gateway(format!(
                "{} did not respond within {:?}",
                gateway.provider_name(),
                timeout
            )))
        }
    }
}
