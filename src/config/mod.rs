//! Configuration loading and types

pub mod loader;
pub mod types;

pub use loader::load_config;
pub use types::{ApiCredentials, AppConfig, AppSettings, IngestionConfig, LlmConfig};
