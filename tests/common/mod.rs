//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use signal_engine::directive::{
    Directive, EntryZone, HedgeTrigger, ScaleInStep, Side, StopLoss, TakeProfitStep, TrailingRule,
};
use signal_engine::gateway::LanguageModelGateway;
use signal_engine::{EngineError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Gateway that answers from a fixed script, keyed by a substring of the prompt
pub struct ScriptedGateway {
    script: Vec<(&'static str, std::result::Result<&'static str, &'static str>)>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `response` when the user prompt contains `needle`
    pub fn reply(mut self, needle: &'static str, response: &'static str) -> Self {
        self.script.push((needle, Ok(response)));
        self
    }

    /// Fail with a gateway error when the user prompt contains `needle`
    pub fn fail(mut self, needle: &'static str, message: &'static str) -> Self {
        self.script.push((needle, Err(message)));
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelGateway for ScriptedGateway {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        for (needle, response) in &self.script {
            if user_prompt.contains(needle) {
                return response
                    .map(str::to_string)
                    .map_err(|msg| EngineError::Gateway(msg.to_string()));
            }
        }
        Err(EngineError::Gateway("no scripted response".to_string()))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Long directive with a full price ladder
pub fn sample_long_directive() -> Directive {
    Directive {
        id: "sig_fixture_long".to_string(),
        symbol: "BTCUSDT".to_string(),
        side: Side::Long,
        leverage: 10,
        entry: EntryZone {
            price_target: dec!(100),
            range_low: Some(dec!(99.5)),
            range_high: Some(dec!(100.5)),
        },
        adds: vec![ScaleInStep {
            price: dec!(96),
            percent: dec!(30),
            condition: "hold above 95".to_string(),
        }],
        take_profits: vec![
            TakeProfitStep {
                price: dec!(110),
                percent: dec!(50),
            },
            TakeProfitStep {
                price: dec!(120),
                percent: dec!(50),
            },
        ],
        stop_loss: StopLoss {
            price: dec!(95),
            trailing_rules: vec![TrailingRule {
                trigger_price: dec!(110),
                new_stop_loss: dec!(102),
            }],
        },
        hedge: Some(HedgeTrigger {
            trigger_price: dec!(97),
            size_percent: dec!(25),
        }),
        summary: "Long BTC at 100".to_string(),
        raw_content: "BTC long 100, SL 95, TP 110/120".to_string(),
    }
}

/// Minimal directive for scenario tests
pub fn bare_directive(id: &str, side: Side, entry: Decimal, stop: Decimal) -> Directive {
    Directive {
        id: id.to_string(),
        symbol: "ETHUSDT".to_string(),
        side,
        leverage: 5,
        entry: EntryZone {
            price_target: entry,
            range_low: None,
            range_high: None,
        },
        adds: vec![],
        take_profits: vec![],
        stop_loss: StopLoss {
            price: stop,
            trailing_rules: vec![],
        },
        hedge: None,
        summary: String::new(),
        raw_content: String::new(),
    }
}

/// Sample model responses
pub mod responses {
    pub const BTC_LONG: &str = r#"{
        "symbol": "BTCUSDT",
        "direction": "long",
        "leverage_recommend": 10,
        "entry": {"price_target": 100, "range_low": null, "range_high": null},
        "adds": [],
        "take_profits": [{"price": 110, "percent": 100}],
        "stop_loss": {"price": 95, "trailing_rules": []},
        "raw_text_summary": "Long BTC at 100"
    }"#;

    pub const BTC_LONG_FENCED: &str = "```json\n{\"symbol\": \"BTCUSDT\", \"direction\": \"long\", \"entry\": {\"price_target\": 101}}\n```";

    pub const ETH_SHORT: &str = r#"{"symbol": "ETHUSDT", "direction": "short", "entry": {"price_target": 3200}}"#;

    pub const MISSING_DIRECTION: &str = r#"{"symbol": "SOLUSDT", "entry": {"price_target": 150}}"#;

    pub const MISSING_SYMBOL: &str = r#"{"direction": "long"}"#;
}
