//! Lifecycle state, execution records and per-cycle outcomes

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::directive::{Directive, Side};

/// Execution status of a directive for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStatus {
    /// Waiting for price to reach the entry zone
    Waiting,
    /// Initial position opened
    Entered,
    /// `n` scale-in steps applied
    Added(u32),
    /// Terminal
    Closed,
}

impl LifecycleStatus {
    /// Position in the forward order of the state machine
    pub fn rank(self) -> u32 {
        match self {
            LifecycleStatus::Waiting => 0,
            LifecycleStatus::Entered => 1,
            LifecycleStatus::Added(n) => n.saturating_add(1).min(u32::MAX - 1),
            LifecycleStatus::Closed => u32::MAX,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleStatus::Closed
    }

    /// Whether a position is currently open
    pub fn is_open(self) -> bool {
        matches!(self, LifecycleStatus::Entered | LifecycleStatus::Added(_))
    }

    /// Transitions only move forward; nothing leaves `Closed`
    pub fn can_advance_to(self, next: LifecycleStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleStatus::Waiting => write!(f, "WAITING"),
            LifecycleStatus::Entered => write!(f, "ENTERED"),
            LifecycleStatus::Added(n) => write!(f, "ADD_{}", n),
            LifecycleStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A rejected stop move or status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Stop update that would widen risk
    LooseningStop {
        current: Option<Decimal>,
        proposed: Decimal,
    },
    /// Transition that would move the lifecycle backwards
    RegressingTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },
}

/// Monotonicity violation, recorded on the execution record and logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAnomaly {
    pub directive_id: String,
    pub kind: AnomalyKind,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for StateAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AnomalyKind::LooseningStop { current, proposed } => write!(
                f,
                "directive {}: stop move {} -> {} would loosen risk",
                self.directive_id,
                current.map(|c| c.to_string()).unwrap_or_else(|| "none".into()),
                proposed
            ),
            AnomalyKind::RegressingTransition { from, to } => write!(
                f,
                "directive {}: transition {} -> {} would regress",
                self.directive_id, from, to
            ),
        }
    }
}

/// One accepted status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: LifecycleStatus,
    pub to: LifecycleStatus,
    pub price: Decimal,
    pub at: DateTime<Utc>,
}

/// Execution progress of one directive for one trading account
///
/// Created lazily the first time an account observes the directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub account_id: String,
    pub directive_id: String,
    pub symbol: String,
    pub side: Side,
    pub status: LifecycleStatus,
    /// Current stop; `None` when the alert gave no usable stop
    pub stop_price: Option<Decimal>,
    /// Directive stop this record was last reconciled against
    #[serde(default)]
    pub planned_stop: Option<Decimal>,
    /// Realized PnL reported by the execution gateway
    pub realized_pnl: Decimal,
    /// Percent of the planned position still open
    pub open_percent: Decimal,
    pub entry_price: Option<Decimal>,
    pub entered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Scale-in steps consumed so far, in order
    pub adds_consumed: usize,
    /// Consumed flags, one per take-profit step
    pub take_profits_consumed: Vec<bool>,
    /// Trailing rules consumed so far, in order
    pub trailing_consumed: usize,
    pub hedge_fired: bool,
    pub transitions: Vec<Transition>,
    pub anomalies: Vec<StateAnomaly>,
}

impl ExecutionRecord {
    /// Fresh record in `Waiting` for a directive first seen at `now`
    pub fn new(account_id: impl Into<String>, directive: &Directive, now: DateTime<Utc>) -> Self {
        let stop_price = Some(directive.stop_loss.price).filter(|p| !p.is_zero());
        Self {
            account_id: account_id.into(),
            directive_id: directive.id.clone(),
            symbol: directive.symbol.clone(),
            side: directive.side,
            status: LifecycleStatus::Waiting,
            stop_price,
            planned_stop: stop_price,
            realized_pnl: Decimal::ZERO,
            open_percent: Decimal::ZERO,
            entry_price: None,
            entered_at: None,
            closed_at: None,
            updated_at: now,
            adds_consumed: 0,
            take_profits_consumed: vec![false; directive.take_profits.len()],
            trailing_consumed: 0,
            hedge_fired: false,
            transitions: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// Timestamp of the most recent transition into `status`
    pub fn transitioned_at(&self, status: LifecycleStatus) -> Option<DateTime<Utc>> {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.to == status)
            .map(|t| t.at)
    }
}

/// Instruction for the caller, who owns order placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LifecycleAction {
    /// Open the initial position
    Enter { price: Decimal, leverage: u32 },
    /// Apply scale-in step `step` (1-based)
    ScaleIn {
        step: u32,
        percent: Decimal,
        price: Decimal,
    },
    /// Realize take-profit step `index` (0-based)
    TakeProfit {
        index: usize,
        percent: Decimal,
        price: Decimal,
    },
    /// Stop-loss hit; close what remains
    StopOut { percent: Decimal, price: Decimal },
    /// Move the resting stop order
    MoveStop {
        from: Option<Decimal>,
        to: Decimal,
    },
    /// Open an offsetting position on the other side
    Hedge {
        side: Side,
        size_percent: Decimal,
        price: Decimal,
    },
    /// Close requested by the caller
    Close { percent: Decimal, price: Decimal },
}

/// Result of one evaluation cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleOutcome {
    pub actions: Vec<LifecycleAction>,
    pub anomalies: Vec<StateAnomaly>,
}

impl CycleOutcome {
    pub fn is_idle(&self) -> bool {
        self.actions.is_empty() && self.anomalies.is_empty()
    }
}

/// All execution records of one trading account
///
/// The engine holds no locks: callers serialize access per account by
/// owning the book mutably.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountBook {
    pub account_id: String,
    records: HashMap<String, ExecutionRecord>,
}

impl AccountBook {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            records: HashMap::new(),
        }
    }

    /// Record for `directive`, created on first observation
    pub fn record_for(&mut self, directive: &Directive, now: DateTime<Utc>) -> &mut ExecutionRecord {
        let account_id = &self.account_id;
        self.records
            .entry(directive.id.clone())
            .or_insert_with(|| ExecutionRecord::new(account_id.clone(), directive, now))
    }

    pub fn get(&self, directive_id: &str) -> Option<&ExecutionRecord> {
        self.records.get(directive_id)
    }

    pub fn get_mut(&mut self, directive_id: &str) -> Option<&mut ExecutionRecord> {
        self.records.get_mut(directive_id)
    }

    /// Accumulate PnL the execution gateway reported for a directive
    ///
    /// Returns false when the account has never observed the directive.
    pub fn record_realized_pnl(&mut self, directive_id: &str, amount: Decimal) -> bool {
        match self.records.get_mut(directive_id) {
            Some(record) => {
                record.realized_pnl += amount;
                true
            }
            None => false,
        }
    }

    /// Records whose position is open or still waiting for entry
    pub fn active_records(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.values().filter(|r| !r.status.is_terminal())
    }

    /// Total realized PnL across all directives
    pub fn total_realized_pnl(&self) -> Decimal {
        self.records.values().map(|r| r.realized_pnl).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
