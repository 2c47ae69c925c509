//! Advisory risk re-evaluation through the language-model gateway

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::types::{AssessmentDraft, PositionSnapshot, RiskAssessment};
use crate::common::errors::{EngineError, Result};
use crate::directive::Directive;
use crate::gateway::{complete_with_timeout, strip_code_fences, LanguageModelGateway};

/// Fixed system instruction for risk evaluation
pub const EVALUATOR_SYSTEM_PROMPT: &str = "You are a risk officer supervising an open trading plan. \
Given the plan, the time since it was issued and the live position, decide whether to deviate from the plan. \
Reply with a single JSON object and nothing else: \
{\"action\": \"hold|reduce|close|add|hedge\", \"reason\": \"<one sentence>\", \"trade_percent\": 0}. \
trade_percent is the share of the current position (0-100) the action applies to; use 0 for hold.";

/// Re-evaluates an active directive against live market state
///
/// Advisory only: callers treat any error as "no evaluator action this
/// cycle" and keep driving the lifecycle engine.
#[derive(Clone)]
pub struct RiskEvaluator {
    gateway: Arc<dyn LanguageModelGateway>,
    timeout: Duration,
}

impl RiskEvaluator {
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Ask the model for an advisory action
    #[instrument(skip(self, directive, snapshot), fields(directive = %directive.id))]
    pub async fn evaluate(
        &self,
        directive: &Directive,
        accepted_at: DateTime<Utc>,
        snapshot: &PositionSnapshot,
    ) -> Result<RiskAssessment> {
        let prompt = build_user_prompt(directive, accepted_at, snapshot, Utc::now())?;
        let response = complete_with_timeout(
            self.gateway.as_ref(),
            EVALUATOR_SYSTEM_PROMPT,
            &prompt,
            self.timeout,
        )
        .await?;

        let assessment = decode_assessment(&response)?;
        debug!(action = %assessment.action, percent = %assessment.trade_percent, "Risk assessment");
        Ok(assessment)
    }

    /// Like [`evaluate`](Self::evaluate), but logs failures and yields `None`
    pub async fn evaluate_or_skip(
        &self,
        directive: &Directive,
        accepted_at: DateTime<Utc>,
        snapshot: &PositionSnapshot,
    ) -> Option<RiskAssessment> {
        match self.evaluate(directive, accepted_at, snapshot).await {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                warn!(directive = %directive.id, "Risk evaluation skipped this cycle: {}", e);
                None
            }
        }
    }
}

/// Embed the plan, its age and the live position into the evaluation prompt
pub fn build_user_prompt(
    directive: &Directive,
    accepted_at: DateTime<Utc>,
    snapshot: &PositionSnapshot,
    now: DateTime<Utc>,
) -> Result<String> {
    let plan = serde_json::to_string_pretty(directive)
        .map_err(|e| EngineError::Internal(format!("cannot serialize directive: {}", e)))?;
    let elapsed_minutes = (now - accepted_at).num_minutes().max(0);
    let position_side = snapshot
        .side
        .map(|side| side.to_string())
        .unwrap_or_else(|| "flat".to_string());

    Ok(format!(
        "Trading plan:\n{}\n\nMinutes since plan was issued: {}\n\n\
         Live position:\n- price: {}\n- side: {}\n- quantity: {}\n- unrealized PnL: {}%",
        plan,
        elapsed_minutes,
        snapshot.price,
        position_side,
        snapshot.quantity,
        snapshot.pnl_percent
    ))
}

/// Decode a (possibly fenced) model response into a validated assessment
pub fn decode_assessment(response: &str) -> Result<RiskAssessment> {
    let body = strip_code_fences(response);
    let draft: AssessmentDraft = serde_json::from_str(body)?;
    RiskAssessment::try_from(draft)
}
