//! Directive data model and its wire shape

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::common::errors::{EngineError, Result};

/// Position side of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Parse a side from model output, accepting buy/sell synonyms
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "long" | "buy" => Some(Side::Long),
            "short" | "sell" => Some(Side::Short),
            _ => None,
        }
    }

    /// The opposite side, used for hedges
    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Entry zone: a target price with an optional acceptable range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub price_target: Decimal,
    #[serde(default)]
    pub range_low: Option<Decimal>,
    #[serde(default)]
    pub range_high: Option<Decimal>,
}

impl EntryZone {
    /// Both range bounds, ordered low to high, when the alert stated a range
    pub fn range(&self) -> Option<(Decimal, Decimal)> {
        match (self.range_low, self.range_high) {
            (Some(a), Some(b)) if a <= b => Some((a, b)),
            (Some(a), Some(b)) => Some((b, a)),
            _ => None,
        }
    }
}

/// A scale-in step placed as price moves against the position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleInStep {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub percent: Decimal,
    #[serde(default)]
    pub condition: String,
}

/// A take-profit step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitStep {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub price: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub percent: Decimal,
}

/// Trailing rule: once `trigger_price` is crossed, move the stop to `new_stop_loss`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingRule {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub trigger_price: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub new_stop_loss: Decimal,
}

/// Initial stop-loss and the ordered rules that tighten it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub price: Decimal,
    #[serde(default)]
    pub trailing_rules: Vec<TrailingRule>,
}

/// Price at which an offsetting position is recommended
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HedgeTrigger {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub trigger_price: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub size_percent: Decimal,
}

/// Structured trading instruction derived from a natural-language alert
///
/// Serializes to the directive wire shape used for audit and storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    /// Empty until the registry assigns a fingerprint
    #[serde(rename = "signal_id", default)]
    pub id: String,
    pub symbol: String,
    #[serde(rename = "direction")]
    pub side: Side,
    #[serde(rename = "leverage_recommend", default)]
    pub leverage: u32,
    #[serde(default)]
    pub entry: EntryZone,
    #[serde(default)]
    pub adds: Vec<ScaleInStep>,
    #[serde(default)]
    pub take_profits: Vec<TakeProfitStep>,
    #[serde(default)]
    pub stop_loss: StopLoss,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hedge: Option<HedgeTrigger>,
    #[serde(rename = "raw_text_summary", default)]
    pub summary: String,
    #[serde(default)]
    pub raw_content: String,
}

impl Directive {
    /// Whether the registry still has to assign an id
    pub fn needs_id(&self) -> bool {
        self.id.trim().is_empty()
    }
}

/// Loosely-typed mirror of the wire shape, as the model emits it
///
/// `symbol` and `direction` are plain strings so that missing or empty
/// values surface as validation errors instead of opaque decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DirectiveDraft {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub signal_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub direction: String,
    #[serde(default, deserialize_with = "leverage_or_zero")]
    pub leverage_recommend: u32,
    #[serde(default)]
    pub entry: Option<EntryZone>,
    #[serde(default)]
    pub adds: Option<Vec<ScaleInStep>>,
    #[serde(default)]
    pub take_profits: Option<Vec<TakeProfitStep>>,
    #[serde(default)]
    pub stop_loss: Option<StopLoss>,
    #[serde(default)]
    pub hedge: Option<HedgeTrigger>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub raw_text_summary: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub raw_content: String,
}

impl TryFrom<DirectiveDraft> for Directive {
    type Error = EngineError;

    fn try_from(draft: DirectiveDraft) -> Result<Self> {
        let symbol = draft.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(EngineError::Validation("directive is missing symbol".into()));
        }
        if draft.direction.trim().is_empty() {
            return Err(EngineError::Validation("directive is missing direction".into()));
        }
        let side = Side::parse(&draft.direction).ok_or_else(|| {
            EngineError::Validation(format!("unknown direction: {}", draft.direction))
        })?;

        Ok(Directive {
            id: draft.signal_id.trim().to_string(),
            symbol,
            side,
            leverage: draft.leverage_recommend,
            entry: draft.entry.unwrap_or_default(),
            adds: draft.adds.unwrap_or_default(),
            take_profits: draft.take_profits.unwrap_or_default(),
            stop_loss: draft.stop_loss.unwrap_or_default(),
            hedge: draft.hedge,
            summary: draft.raw_text_summary,
            raw_content: draft.raw_content,
        })
    }
}

fn decimal_or_zero<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Decimal>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Models emit leverage as `10`, `10.0` or `"10x"`
fn leverage_or_zero<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let leverage = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .unwrap_or(0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .trim_end_matches(['x', 'X'])
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f >= 0.0)
            .map(|f| f.round() as u64)
            .unwrap_or(0),
        _ => 0,
    };
    Ok(u32::try_from(leverage).unwrap_or(u32::MAX))
}
