//! Strategy manager - the explicit engine instance built at startup
//!
//! Owns the registry handle, the parser and evaluator, and the ingestion
//! task. Consumers receive a read-only registry handle instead of reaching
//! for global state; only the ingestion loop writes.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::common::channels::AlertReceiver;
use crate::common::errors::{EngineError, Result};
use crate::directive::DirectiveParser;
use crate::gateway::LanguageModelGateway;
use crate::ingestion::{IngestionHandle, IngestionLoop, IngestionStats};
use crate::lifecycle::LifecycleEngine;
use crate::registry::{DirectiveRegistry, RegistryReader};
use crate::risk::RiskEvaluator;

/// Single-process engine with explicit start/stop
pub struct StrategyManager {
    registry: DirectiveRegistry,
    parser: DirectiveParser,
    evaluator: RiskEvaluator,
    lifecycle: LifecycleEngine,
    ingestion: Option<IngestionHandle>,
}

impl StrategyManager {
    /// Build a manager whose gateway calls are bounded by `request_timeout`
    pub fn new(gateway: Arc<dyn LanguageModelGateway>, request_timeout: Duration) -> Self {
        Self {
            registry: DirectiveRegistry::new(),
            parser: DirectiveParser::new(gateway.clone(), request_timeout),
            evaluator: RiskEvaluator::new(gateway, request_timeout),
            lifecycle: LifecycleEngine::new(),
            ingestion: None,
        }
    }

    /// Read handle for pollers and presentation layers
    pub fn registry(&self) -> RegistryReader {
        self.registry.reader()
    }

    pub fn parser(&self) -> &DirectiveParser {
        &self.parser
    }

    pub fn evaluator(&self) -> &RiskEvaluator {
        &self.evaluator
    }

    pub fn lifecycle(&self) -> LifecycleEngine {
        self.lifecycle
    }

    /// Start consuming alerts from `source`
    pub fn start(&mut self, source: AlertReceiver) -> Result<()> {
        if self.is_running() {
            return Err(EngineError::Internal("ingestion already running".into()));
        }

        let ingestion = IngestionLoop::new(self.parser.clone(), self.registry.clone());
        self.ingestion = Some(ingestion.spawn(source));
        info!("Strategy manager started");
        Ok(())
    }

    /// Stop ingestion and wait for the loop to exit
    ///
    /// Returns `None` when the manager was never started.
    pub async fn stop(&mut self) -> Result<Option<IngestionStats>> {
        let Some(handle) = self.ingestion.take() else {
            return Ok(None);
        };
        let stats = handle.stop().await?;
        info!("Strategy manager stopped");
        Ok(Some(stats))
    }

    /// Whether the ingestion loop is alive
    pub fn is_running(&self) -> bool {
        self.ingestion
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}
