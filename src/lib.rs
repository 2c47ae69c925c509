//! SignalEngine Library
//!
//! Turns natural-language trading alerts into structured directives, keeps
//! the active directive per instrument, and drives each directive through a
//! price-driven execution lifecycle.

pub mod common;
pub mod config;
pub mod directive;
pub mod gateway;
pub mod ingestion;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod risk;

// Re-export commonly used types
pub use common::errors::{EngineError, Result};
pub use config::types::AppConfig;
pub use directive::{Directive, DirectiveParser, Side};
pub use gateway::{LanguageModelGateway, OpenAiGateway};
pub use ingestion::{IngestionHandle, IngestionLoop, IngestionStats};
pub use lifecycle::{
    AccountBook, CycleOutcome, ExecutionRecord, LifecycleAction, LifecycleEngine, LifecycleStatus,
    StateAnomaly,
};
pub use manager::StrategyManager;
pub use registry::{DirectiveRegistry, RegistryEntry, RegistryReader, UpsertOutcome};
pub use risk::{PositionSnapshot, RiskAction, RiskAssessment, RiskEvaluator};
