//! Directive model, fingerprinting and the alert parser

pub mod fingerprint;
pub mod parser;
pub mod types;

pub use fingerprint::fingerprint;
pub use parser::{decode_directive, DirectiveParser};
pub use types::{
    Directive, EntryZone, HedgeTrigger, ScaleInStep, Side, StopLoss, TakeProfitStep, TrailingRule,
};
