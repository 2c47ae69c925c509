use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::errors::{EngineError, Result};
use crate::directive::Side;

/// Advisory action recommended by the risk model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAction {
    /// Keep following the deterministic plan
    Hold,
    /// Close `trade_percent` of the position early
    Reduce,
    /// Close the whole position
    Close,
    /// Add `trade_percent` to the position
    Add,
    /// Open an offsetting position of `trade_percent`
    Hedge,
}

impl RiskAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "hold" | "keep" | "none" => Some(RiskAction::Hold),
            "reduce" | "partial_close" | "take_partial" => Some(RiskAction::Reduce),
            "close" | "close_all" | "exit" => Some(RiskAction::Close),
            "add" | "add_position" => Some(RiskAction::Add),
            "hedge" => Some(RiskAction::Hedge),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskAction::Hold => write!(f, "hold"),
            RiskAction::Reduce => write!(f, "reduce"),
            RiskAction::Close => write!(f, "close"),
            RiskAction::Add => write!(f, "add"),
            RiskAction::Hedge => write!(f, "hedge"),
        }
    }
}

/// Caller's live view of the position, from the execution gateway
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub price: Decimal,
    /// `None` when flat
    pub side: Option<Side>,
    pub quantity: Decimal,
    pub pnl_percent: Decimal,
}

impl PositionSnapshot {
    /// Snapshot of an account with no position
    pub fn flat(price: Decimal) -> Self {
        Self {
            price,
            side: None,
            quantity: Decimal::ZERO,
            pnl_percent: Decimal::ZERO,
        }
    }
}

/// Validated evaluator output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub action: RiskAction,
    pub reason: String,
    /// Percent of the position the action applies to (0-100)
    pub trade_percent: Decimal,
}

impl RiskAssessment {
    /// Whether the caller should deviate from the deterministic plan
    pub fn is_actionable(&self) -> bool {
        self.action != RiskAction::Hold
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssessmentDraft {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "percent_or_zero")]
    pub trade_percent: Decimal,
}

impl TryFrom<AssessmentDraft> for RiskAssessment {
    type Error = EngineError;

    fn try_from(draft: AssessmentDraft) -> Result<Self> {
        let raw_action = draft.action.unwrap_or_default();
        let action = RiskAction::parse(&raw_action).ok_or_else(|| {
            EngineError::Validation(format!("unknown risk action: {:?}", raw_action))
        })?;

        if draft.trade_percent < Decimal::ZERO || draft.trade_percent > Decimal::ONE_HUNDRED {
            return Err(EngineError::Validation(format!(
                "trade_percent out of range: {}",
                draft.trade_percent
            )));
        }

        Ok(RiskAssessment {
            action,
            reason: draft.reason.unwrap_or_default().trim().to_string(),
            trade_percent: draft.trade_percent,
        })
    }
}

fn percent_or_zero<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}
