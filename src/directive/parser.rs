//! Directive parser: raw alert text to a validated `Directive`

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::{Directive, DirectiveDraft};
use crate::common::errors::{EngineError, Result};
use crate::gateway::{complete_with_timeout, strip_code_fences, LanguageModelGateway};

/// Fixed system instruction for alert extraction
pub const PARSER_SYSTEM_PROMPT: &str = "You are a trading-alert extraction engine. \
Read the alert and reply with a single JSON object and nothing else, using exactly this shape:\n\
{\"signal_id\": \"\", \"symbol\": \"BTCUSDT\", \"direction\": \"long|short\", \
\"leverage_recommend\": 10, \
\"entry\": {\"price_target\": 0, \"range_low\": null, \"range_high\": null}, \
\"adds\": [{\"price\": 0, \"percent\": 0, \"condition\": \"\"}], \
\"take_profits\": [{\"price\": 0, \"percent\": 0}], \
\"stop_loss\": {\"price\": 0, \"trailing_rules\": [{\"trigger_price\": 0, \"new_stop_loss\": 0}]}, \
\"hedge\": {\"trigger_price\": 0, \"size_percent\": 0}, \
\"raw_text_summary\": \"\"}\n\
Rules: percents are of the planned position (0-100). Omit \"hedge\" when the alert has none. \
Leave \"signal_id\" empty. Use null for unknown range bounds. Do not invent levels that the alert does not state.";

/// Turns raw alert text into directives via one gateway call per alert
#[derive(Clone)]
pub struct DirectiveParser {
    gateway: Arc<dyn LanguageModelGateway>,
    timeout: Duration,
}

impl DirectiveParser {
    /// Create a parser whose gateway calls are bounded by `timeout`
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Parse one alert
    ///
    /// Fails with `Validation` on empty input, malformed JSON or a missing
    /// symbol/direction, and with `Gateway` when the completion call fails.
    #[instrument(skip(self, raw_text), fields(len = raw_text.len()))]
    pub async fn parse(&self, raw_text: &str) -> Result<Directive> {
        if raw_text.trim().is_empty() {
            return Err(EngineError::Validation("alert text is empty".into()));
        }

        let prompt = build_user_prompt(raw_text);
        let response =
            complete_with_timeout(self.gateway.as_ref(), PARSER_SYSTEM_PROMPT, &prompt, self.timeout)
                .await?;
        debug!(response_len = response.len(), "Received extraction response");

        let mut directive = decode_directive(&response).map_err(|e| {
            warn!("Rejected model output: {}", e);
            e
        })?;
        directive.raw_content = raw_text.to_string();

        Ok(directive)
    }
}

/// Embed the alert into the extraction prompt
pub fn build_user_prompt(raw_text: &str) -> String {
    format!(
        "Extract the trading directive from the following alert.\n\n<alert>\n{}\n</alert>",
        raw_text.trim()
    )
}

/// Decode a (possibly fenced) model response into a validated directive
pub fn decode_directive(response: &str) -> Result<Directive> {
    let body = strip_code_fences(response);
    if body.is_empty() {
        return Err(EngineError::Validation("model returned an empty response".into()));
    }

    let draft: DirectiveDraft = serde_json::from_str(body)?;
    Directive::try_from(draft)
}
