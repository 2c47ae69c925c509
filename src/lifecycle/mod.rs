//! Lifecycle engine: per-account execution state for directives
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Per-account polling loop (caller)                          │
//! │    - reads RegistryReader::list_active()                    │
//! │    - fetches live price from the execution gateway          │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  LifecycleEngine::observe(&mut AccountBook, directive, px)  │
//! │    - lazily creates the ExecutionRecord                     │
//! │    - advances WAITING → ENTERED → ADD_n → CLOSED            │
//! │    - returns LifecycleActions                               │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  Caller places / cancels orders                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never locks. Two calls for the same account must be
//! serialized by the caller, which the `&mut AccountBook` borrow enforces.

mod engine;
pub mod threshold;
pub mod types;

pub use engine::{entry_reached, LifecycleEngine};
pub use threshold::{has_reached, is_tighter, Movement};
pub use types::{
    AccountBook, AnomalyKind, CycleOutcome, ExecutionRecord, LifecycleAction, LifecycleStatus,
    StateAnomaly, Transition,
};
