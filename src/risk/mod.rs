//! Risk evaluator - advisory model orthogonal to the lifecycle engine

pub mod evaluator;
mod types;

pub use evaluator::{decode_assessment, RiskEvaluator};
pub use types::{PositionSnapshot, RiskAction, RiskAssessment};
