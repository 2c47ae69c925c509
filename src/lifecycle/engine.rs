//! Price-driven lifecycle state machine
//!
//! `WAITING -> ENTERED -> ADD_1 -> ADD_2 -> ... -> CLOSED`
//!
//! The engine is stateless and performs no I/O. Each call reads and writes
//! one [`ExecutionRecord`] and returns the actions the caller should place
//! through its execution gateway.
//!
//! A directive revised in place (same id) is reconciled into the record at
//! the start of each cycle: the take-profit ladder is resized and a changed
//! stop goes through the same monotonic update as trailing rules.
//!
//! While waiting for entry, a stop reached before the entry zone invalidates
//! the plan: the record closes without any order action.
//!
//! Order of checks inside one cycle, once a position is open:
//! 1. stop-loss against the current stop
//! 2. take-profit steps
//! 3. trailing rules (may tighten the stop for the next cycle)
//! 4. scale-in steps
//! 5. hedge trigger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::threshold::{has_reached, is_tighter, Movement};
use super::types::{
    AccountBook, AnomalyKind, CycleOutcome, ExecutionRecord, LifecycleAction, LifecycleStatus,
    StateAnomaly, Transition,
};
use crate::common::errors::{EngineError, Result};
use crate::directive::Directive;

const FULL_POSITION: Decimal = Decimal::ONE_HUNDRED;

/// Stateless lifecycle evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleEngine;

impl LifecycleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one cycle for `directive` on the account owning `book`
    ///
    /// Creates the execution record on first observation.
    pub fn observe(
        &self,
        book: &mut AccountBook,
        directive: &Directive,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let record = book.record_for(directive, now);
        self.step(record, directive, price, now)
    }

    /// Evaluate one cycle against an existing record
    pub fn step(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        if record.status.is_terminal() {
            return outcome;
        }
        if record.directive_id != directive.id {
            warn!(
                record = %record.directive_id,
                directive = %directive.id,
                "Execution record observed with a different directive, skipping"
            );
            return outcome;
        }

        self.reconcile(record, directive, now, &mut outcome);

        if record.status == LifecycleStatus::Waiting {
            if !entry_reached(directive, price) {
                self.check_invalidation(record, price, now, &mut outcome);
                return outcome;
            }
            if let Err(anomaly) = self.advance(record, LifecycleStatus::Entered, price, now) {
                outcome.anomalies.push(anomaly);
                return outcome;
            }
            record.entry_price = Some(price);
            record.entered_at = Some(now);
            record.open_percent = FULL_POSITION;
            outcome.actions.push(LifecycleAction::Enter {
                price,
                leverage: directive.leverage,
            });
        }

        if self.check_stop_loss(record, price, now, &mut outcome)
            || self.check_take_profits(record, directive, price, now, &mut outcome)
        {
            record.updated_at = now;
            return outcome;
        }

        self.apply_trailing_rules(record, directive, price, now, &mut outcome);
        self.check_scale_ins(record, directive, price, now, &mut outcome);
        self.check_hedge(record, directive, price, &mut outcome);

        record.updated_at = now;
        outcome
    }

    /// Move the stop to `proposed` if that reduces risk
    ///
    /// Returns `Ok(true)` when the stop moved and `Ok(false)` when it already
    /// sat at `proposed`. A loosening move is recorded as a state anomaly and
    /// leaves the stop unchanged.
    pub fn apply_stop_update(
        &self,
        record: &mut ExecutionRecord,
        proposed: Decimal,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        match record.stop_price {
            Some(current) if current == proposed => return Ok(false),
            Some(current) if !is_tighter(record.side, proposed, current) => {
                let anomaly = StateAnomaly {
                    directive_id: record.directive_id.clone(),
                    kind: AnomalyKind::LooseningStop {
                        current: Some(current),
                        proposed,
                    },
                    at: now,
                };
                warn!(account = %record.account_id, "Rejected stop update: {}", anomaly);
                record.anomalies.push(anomaly.clone());
                return Err(EngineError::StateAnomaly(anomaly));
            }
            _ => {}
        }

        info!(
            account = %record.account_id,
            directive = %record.directive_id,
            from = ?record.stop_price,
            to = %proposed,
            "Stop tightened"
        );
        record.stop_price = Some(proposed);
        record.updated_at = now;
        Ok(true)
    }

    /// Caller-driven status change, subject to forward-only ordering
    pub fn transition(
        &self,
        record: &mut ExecutionRecord,
        to: LifecycleStatus,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.advance(record, to, price, now)
            .map_err(EngineError::StateAnomaly)
    }

    /// Close an open or waiting record at the caller's request
    ///
    /// Used when the risk evaluator recommends a full exit.
    pub fn close_manually(
        &self,
        record: &mut ExecutionRecord,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let remaining = record.open_percent;
        let was_open = record.status.is_open();
        self.transition(record, LifecycleStatus::Closed, price, now)?;

        let mut outcome = CycleOutcome::default();
        if was_open {
            outcome.actions.push(LifecycleAction::Close {
                percent: remaining,
                price,
            });
        }
        Ok(outcome)
    }

    fn advance(
        &self,
        record: &mut ExecutionRecord,
        to: LifecycleStatus,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), StateAnomaly> {
        let from = record.status;
        if !from.can_advance_to(to) {
            let anomaly = StateAnomaly {
                directive_id: record.directive_id.clone(),
                kind: AnomalyKind::RegressingTransition { from, to },
                at: now,
            };
            warn!(account = %record.account_id, "Rejected transition: {}", anomaly);
            record.anomalies.push(anomaly.clone());
            return Err(anomaly);
        }

        record.transitions.push(Transition {
            from,
            to,
            price,
            at: now,
        });
        record.status = to;
        record.updated_at = now;
        if to.is_terminal() {
            record.closed_at = Some(now);
            record.open_percent = Decimal::ZERO;
        }

        info!(
            account = %record.account_id,
            directive = %record.directive_id,
            symbol = %record.symbol,
            %price,
            "{} -> {}",
            from,
            to
        );
        Ok(())
    }

    /// Pick up changes from a directive revised under the same id
    fn reconcile(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) {
        let steps = directive.take_profits.len();
        if record.take_profits_consumed.len() != steps {
            debug!(
                from = record.take_profits_consumed.len(),
                to = steps,
                "Take-profit ladder revised"
            );
            record.take_profits_consumed.resize(steps, false);
        }

        let planned_stop = Some(directive.stop_loss.price).filter(|p| !p.is_zero());
        if planned_stop == record.planned_stop {
            return;
        }
        record.planned_stop = planned_stop;
        // A revision that drops the stop keeps the current one
        let Some(proposed) = planned_stop else {
            return;
        };

        let from = record.stop_price;
        match self.apply_stop_update(record, proposed, now) {
            Ok(true) if record.status.is_open() => {
                outcome.actions.push(LifecycleAction::MoveStop { from, to: proposed })
            }
            Ok(_) => {}
            Err(EngineError::StateAnomaly(anomaly)) => outcome.anomalies.push(anomaly),
            Err(other) => warn!("Unexpected stop revision failure: {}", other),
        }
    }

    /// Close a waiting plan whose stop was reached before entry
    fn check_invalidation(
        &self,
        record: &mut ExecutionRecord,
        price: Decimal,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) {
        let Some(stop) = record.stop_price else {
            return;
        };
        if !has_reached(record.side, Movement::Adverse, price, stop) {
            return;
        }

        info!(
            account = %record.account_id,
            directive = %record.directive_id,
            %price,
            %stop,
            "Stop reached before entry, plan invalidated"
        );
        if let Err(anomaly) = self.advance(record, LifecycleStatus::Closed, price, now) {
            outcome.anomalies.push(anomaly);
        }
    }

    fn check_stop_loss(
        &self,
        record: &mut ExecutionRecord,
        price: Decimal,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) -> bool {
        let Some(stop) = record.stop_price else {
            return false;
        };
        if !has_reached(record.side, Movement::Adverse, price, stop) {
            return false;
        }

        let remaining = record.open_percent;
        match self.advance(record, LifecycleStatus::Closed, price, now) {
            Ok(()) => outcome.actions.push(LifecycleAction::StopOut {
                percent: remaining,
                price,
            }),
            Err(anomaly) => outcome.anomalies.push(anomaly),
        }
        true
    }

    fn check_take_profits(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        price: Decimal,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) -> bool {
        for (index, step) in directive.take_profits.iter().enumerate() {
            if record.take_profits_consumed.get(index).copied().unwrap_or(true) {
                continue;
            }
            if step.price.is_zero() {
                record.take_profits_consumed[index] = true;
                debug!(index, "Skipping take-profit step without a price");
                continue;
            }
            if !has_reached(record.side, Movement::Favorable, price, step.price) {
                continue;
            }

            record.take_profits_consumed[index] = true;
            let last_step = record.take_profits_consumed.iter().all(|consumed| *consumed);
            let realized = if last_step {
                record.open_percent
            } else {
                step.percent.min(record.open_percent).max(Decimal::ZERO)
            };
            record.open_percent -= realized;
            outcome.actions.push(LifecycleAction::TakeProfit {
                index,
                percent: realized,
                price,
            });
            debug!(index, %realized, "Take-profit step realized");
        }

        let all_consumed = !record.take_profits_consumed.is_empty()
            && record.take_profits_consumed.iter().all(|consumed| *consumed);
        let flat = record.open_percent <= Decimal::ZERO;
        let realized_any = outcome
            .actions
            .iter()
            .any(|action| matches!(action, LifecycleAction::TakeProfit { .. }));

        if realized_any && (all_consumed || flat) {
            if let Err(anomaly) = self.advance(record, LifecycleStatus::Closed, price, now) {
                outcome.anomalies.push(anomaly);
            }
            return true;
        }
        false
    }

    fn apply_trailing_rules(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        price: Decimal,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) {
        while let Some(rule) = directive.stop_loss.trailing_rules.get(record.trailing_consumed) {
            if rule.trigger_price.is_zero() || rule.new_stop_loss.is_zero() {
                record.trailing_consumed += 1;
                debug!("Skipping incomplete trailing rule");
                continue;
            }
            if !has_reached(record.side, Movement::Favorable, price, rule.trigger_price) {
                break;
            }

            record.trailing_consumed += 1;
            let from = record.stop_price;
            match self.apply_stop_update(record, rule.new_stop_loss, now) {
                Ok(true) => outcome.actions.push(LifecycleAction::MoveStop {
                    from,
                    to: rule.new_stop_loss,
                }),
                Ok(false) => {}
                Err(EngineError::StateAnomaly(anomaly)) => outcome.anomalies.push(anomaly),
                Err(other) => warn!("Unexpected trailing failure: {}", other),
            }
        }
    }

    fn check_scale_ins(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        price: Decimal,
        now: DateTime<Utc>,
        outcome: &mut CycleOutcome,
    ) {
        while let Some(step) = directive.adds.get(record.adds_consumed) {
            if step.price.is_zero() {
                record.adds_consumed += 1;
                debug!("Skipping scale-in step without a price");
                continue;
            }
            if !has_reached(record.side, Movement::Adverse, price, step.price) {
                break;
            }

            let applied = match record.status {
                LifecycleStatus::Added(n) => n + 1,
                _ => 1,
            };
            record.adds_consumed += 1;
            match self.advance(record, LifecycleStatus::Added(applied), price, now) {
                Ok(()) => {
                    record.open_percent += step.percent;
                    outcome.actions.push(LifecycleAction::ScaleIn {
                        step: applied,
                        percent: step.percent,
                        price,
                    });
                }
                Err(anomaly) => {
                    outcome.anomalies.push(anomaly);
                    break;
                }
            }
        }
    }

    fn check_hedge(
        &self,
        record: &mut ExecutionRecord,
        directive: &Directive,
        price: Decimal,
        outcome: &mut CycleOutcome,
    ) {
        let Some(hedge) = &directive.hedge else {
            return;
        };
        if record.hedge_fired || hedge.trigger_price.is_zero() {
            return;
        }
        if has_reached(record.side, Movement::Adverse, price, hedge.trigger_price) {
            record.hedge_fired = true;
            info!(
                account = %record.account_id,
                directive = %record.directive_id,
                %price,
                "Hedge trigger reached"
            );
            outcome.actions.push(LifecycleAction::Hedge {
                side: record.side.opposite(),
                size_percent: hedge.size_percent,
                price,
            });
        }
    }
}

/// Whether `price` reaches the directive's entry zone
///
/// Inside a stated range always counts. Otherwise price must be at or beyond
/// the target in the position's favorable direction. A zero target with no
/// range means "enter at market".
pub fn entry_reached(directive: &Directive, price: Decimal) -> bool {
    let in_range = directive
        .entry
        .range()
        .map(|(low, high)| price >= low && price <= high);
    let target = directive.entry.price_target;

    if target.is_zero() {
        return in_range.unwrap_or(true);
    }
    in_range.unwrap_or(false) || has_reached(directive.side, Movement::Favorable, price, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::{
        EntryZone, HedgeTrigger, ScaleInStep, Side, StopLoss, TakeProfitStep, TrailingRule,
    };
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn directive(side: Side, entry: Decimal, stop: Decimal) -> Directive {
        Directive {
            id: "sig_test".to_string(),
            symbol: "BTCUSDT".to_string(),
            side,
            leverage: 10,
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

    fn run(
        engine: &LifecycleEngine,
        book: &mut AccountBook,
        directive: &Directive,
        prices: &[Decimal],
    ) -> Vec<CycleOutcome> {
        prices
            .iter()
            .map(|price| engine.observe(book, directive, *price, Utc::now()))
            .collect()
    }

    #[test]
    fn test_long_enters_then_takes_profit() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(95));
        d.take_profits = vec![TakeProfitStep {
            price: dec!(110),
            percent: dec!(100),
        }];

        let outcomes = run(&engine, &mut book, &d, &[dec!(99), dec!(101), dec!(111)]);
        let record = book.get("sig_test").unwrap();

        assert!(outcomes[0].is_idle());
        assert_eq!(
            outcomes[1].actions,
            vec![LifecycleAction::Enter {
                price: dec!(101),
                leverage: 10
            }]
        );
        assert_eq!(
            outcomes[2].actions,
            vec![LifecycleAction::TakeProfit {
                index: 0,
                percent: dec!(100),
                price: dec!(111)
            }]
        );
        assert_eq!(record.status, LifecycleStatus::Closed);
        assert_eq!(record.entry_price, Some(dec!(101)));
        assert_eq!(record.stop_price, Some(dec!(95)));
        let path: Vec<LifecycleStatus> = record.transitions.iter().map(|t| t.to).collect();
        assert_eq!(path, vec![LifecycleStatus::Entered, LifecycleStatus::Closed]);

        let entered_at = record.transitioned_at(LifecycleStatus::Entered).unwrap();
        let closed_at = record.transitioned_at(LifecycleStatus::Closed).unwrap();
        assert_eq!(Some(entered_at), record.entered_at);
        assert_eq!(Some(closed_at), record.closed_at);
        assert!(entered_at <= closed_at);
        assert_eq!(record.transitioned_at(LifecycleStatus::Added(1)), None);
    }

    #[test]
    fn test_short_trailing_rule_tightens_stop() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Short, dec!(100), dec!(105));
        d.stop_loss.trailing_rules = vec![TrailingRule {
            trigger_price: dec!(95),
            new_stop_loss: dec!(98),
        }];

        let outcomes = run(&engine, &mut book, &d, &[dec!(100), dec!(95), dec!(97)]);
        let record = book.get("sig_test").unwrap();

        assert!(matches!(outcomes[0].actions[0], LifecycleAction::Enter { .. }));
        assert_eq!(
            outcomes[1].actions,
            vec![LifecycleAction::MoveStop {
                from: Some(dec!(105)),
                to: dec!(98)
            }]
        );
        assert!(outcomes[2].is_idle());
        assert_eq!(record.status, LifecycleStatus::Entered);
        assert_eq!(record.stop_price, Some(dec!(98)));
        assert_eq!(record.trailing_consumed, 1);
    }

    #[test]
    fn test_short_stop_hit_after_trailing() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Short, dec!(100), dec!(105));
        d.stop_loss.trailing_rules = vec![TrailingRule {
            trigger_price: dec!(95),
            new_stop_loss: dec!(98),
        }];

        let outcomes = run(&engine, &mut book, &d, &[dec!(100), dec!(95), dec!(99)]);

        assert_eq!(
            outcomes[2].actions,
            vec![LifecycleAction::StopOut {
                percent: dec!(100),
                price: dec!(99)
            }]
        );
        assert_eq!(book.get("sig_test").unwrap().status, LifecycleStatus::Closed);
    }

    #[test]
    fn test_loosening_stop_is_rejected() {
        let engine = LifecycleEngine::new();
        let now = Utc::now();
        let d = directive(Side::Short, dec!(100), dec!(105));
        let mut record = ExecutionRecord::new("acct-1", &d, now);

        assert!(engine.apply_stop_update(&mut record, dec!(98), now).unwrap());
        let err = engine.apply_stop_update(&mut record, dec!(105), now).unwrap_err();

        assert!(matches!(err, EngineError::StateAnomaly(_)));
        assert_eq!(record.stop_price, Some(dec!(98)));
        assert_eq!(record.anomalies.len(), 1);
        assert_eq!(
            record.anomalies[0].kind,
            AnomalyKind::LooseningStop {
                current: Some(dec!(98)),
                proposed: dec!(105)
            }
        );
    }

    #[test]
    fn test_loosening_trailing_rule_flagged_in_cycle() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(95));
        d.stop_loss.trailing_rules = vec![
            TrailingRule {
                trigger_price: dec!(105),
                new_stop_loss: dec!(100),
            },
            TrailingRule {
                trigger_price: dec!(108),
                new_stop_loss: dec!(97),
            },
        ];

        let outcomes = run(&engine, &mut book, &d, &[dec!(100), dec!(109)]);
        let record = book.get("sig_test").unwrap();

        assert_eq!(outcomes[1].actions.len(), 1);
        assert_eq!(outcomes[1].anomalies.len(), 1);
        assert_eq!(record.stop_price, Some(dec!(100)));
        assert_eq!(record.trailing_consumed, 2);
    }

    #[test]
    fn test_scale_ins_advance_in_order() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(80));
        d.adds = vec![
            ScaleInStep {
                price: dec!(95),
                percent: dec!(30),
                condition: "first dip".into(),
            },
            ScaleInStep {
                price: dec!(90),
                percent: dec!(20),
                condition: "second dip".into(),
            },
        ];

        run(&engine, &mut book, &d, &[dec!(100), dec!(96), dec!(94)]);
        assert_eq!(book.get("sig_test").unwrap().status, LifecycleStatus::Added(1));

        let outcomes = run(&engine, &mut book, &d, &[dec!(89)]);
        let record = book.get("sig_test").unwrap();
        assert_eq!(record.status, LifecycleStatus::Added(2));
        assert_eq!(record.open_percent, dec!(150));
        assert_eq!(
            outcomes[0].actions,
            vec![LifecycleAction::ScaleIn {
                step: 2,
                percent: dec!(20),
                price: dec!(89)
            }]
        );
    }

    #[test]
    fn test_gap_through_two_adds_applies_both() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Short, dec!(100), dec!(130));
        d.adds = vec![
            ScaleInStep {
                price: dec!(105),
                percent: dec!(25),
                condition: String::new(),
            },
            ScaleInStep {
                price: dec!(110),
                percent: dec!(25),
                condition: String::new(),
            },
        ];

        run(&engine, &mut book, &d, &[dec!(100), dec!(112)]);
        let record = book.get("sig_test").unwrap();
        assert_eq!(record.status, LifecycleStatus::Added(2));
        assert_eq!(record.adds_consumed, 2);
    }

    #[test]
    fn test_partial_take_profit_keeps_state() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(90));
        d.adds = vec![ScaleInStep {
            price: dec!(95),
            percent: dec!(50),
            condition: String::new(),
        }];
        d.take_profits = vec![
            TakeProfitStep {
                price: dec!(110),
                percent: dec!(50),
            },
            TakeProfitStep {
                price: dec!(120),
                percent: dec!(50),
            },
        ];

        run(&engine, &mut book, &d, &[dec!(100), dec!(95), dec!(111)]);
        let record = book.get("sig_test").unwrap();
        assert_eq!(record.status, LifecycleStatus::Added(1));
        assert_eq!(record.open_percent, dec!(100));
        assert_eq!(record.take_profits_consumed, vec![true, false]);

        let outcomes = run(&engine, &mut book, &d, &[dec!(121)]);
        let record = book.get("sig_test").unwrap();
        assert_eq!(record.status, LifecycleStatus::Closed);
        assert_eq!(
            outcomes[0].actions,
            vec![LifecycleAction::TakeProfit {
                index: 1,
                percent: dec!(100),
                price: dec!(121)
            }]
        );
    }

    #[test]
    fn test_hedge_surfaced_once_without_state_change() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(90));
        d.hedge = Some(HedgeTrigger {
            trigger_price: dec!(94),
            size_percent: dec!(50),
        });

        let outcomes = run(&engine, &mut book, &d, &[dec!(100), dec!(93), dec!(92)]);
        let record = book.get("sig_test").unwrap();

        assert_eq!(
            outcomes[1].actions,
            vec![LifecycleAction::Hedge {
                side: Side::Short,
                size_percent: dec!(50),
                price: dec!(93)
            }]
        );
        assert!(outcomes[2].is_idle());
        assert_eq!(record.status, LifecycleStatus::Entered);
        assert!(record.hedge_fired);
    }

    #[test]
    fn test_entry_inside_range() {
        let mut d = directive(Side::Long, dec!(100), dec!(90));
        d.entry.range_low = Some(dec!(97));
        d.entry.range_high = Some(dec!(99));

        assert!(!entry_reached(&d, dec!(96)));
        assert!(entry_reached(&d, dec!(98)));
        assert!(entry_reached(&d, dec!(100)));

        let market = directive(Side::Short, Decimal::ZERO, dec!(110));
        assert!(entry_reached(&market, dec!(123)));
    }

    #[test]
    fn test_closed_record_is_terminal() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let d = directive(Side::Long, dec!(100), dec!(95));

        run(&engine, &mut book, &d, &[dec!(100), dec!(94)]);
        let outcomes = run(&engine, &mut book, &d, &[dec!(100), dec!(200)]);
        assert!(outcomes.iter().all(CycleOutcome::is_idle));

        let record = book.get_mut("sig_test").unwrap();
        let err = engine
            .transition(record, LifecycleStatus::Entered, dec!(100), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::StateAnomaly(_)));
        assert_eq!(record.status, LifecycleStatus::Closed);
    }

    #[test]
    fn test_close_manually_realizes_remaining() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let d = directive(Side::Long, dec!(100), dec!(95));
        run(&engine, &mut book, &d, &[dec!(101)]);

        let record = book.get_mut("sig_test").unwrap();
        let outcome = engine.close_manually(record, dec!(103), Utc::now()).unwrap();
        assert_eq!(
            outcome.actions,
            vec![LifecycleAction::Close {
                percent: dec!(100),
                price: dec!(103)
            }]
        );
        assert_eq!(record.status, LifecycleStatus::Closed);
        assert!(record.closed_at.is_some());
        assert!(book.record_realized_pnl("sig_test", dec!(12.5)));
        assert_eq!(book.total_realized_pnl(), dec!(12.5));
    }

    #[test]
    fn test_missing_stop_never_stops_out() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let d = directive(Side::Short, dec!(100), Decimal::ZERO);

        run(&engine, &mut book, &d, &[dec!(100), dec!(1000)]);
        let record = book.get("sig_test").unwrap();
        assert_eq!(record.status, LifecycleStatus::Entered);
        assert_eq!(record.stop_price, None);
    }

    #[test]
    fn test_revised_directive_reconciled_in_place() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let mut d = directive(Side::Long, dec!(100), dec!(95));
        d.take_profits = vec![TakeProfitStep {
            price: dec!(110),
            percent: dec!(50),
        }];
        run(&engine, &mut book, &d, &[dec!(100)]);

        let mut revised = d.clone();
        revised.stop_loss.price = dec!(98);
        revised.take_profits.push(TakeProfitStep {
            price: dec!(120),
            percent: dec!(50),
        });

        let outcomes = run(&engine, &mut book, &revised, &[dec!(99), dec!(111)]);
        let record = book.get("sig_test").unwrap();

        assert_eq!(
            outcomes[0].actions,
            vec![LifecycleAction::MoveStop {
                from: Some(dec!(95)),
                to: dec!(98)
            }]
        );
        assert_eq!(
            outcomes[1].actions,
            vec![LifecycleAction::TakeProfit {
                index: 0,
                percent: dec!(50),
                price: dec!(111)
            }]
        );
        assert_eq!(record.status, LifecycleStatus::Entered);
        assert_eq!(record.stop_price, Some(dec!(98)));
        assert_eq!(record.take_profits_consumed, vec![true, false]);
        assert_eq!(record.open_percent, dec!(50));
    }

    #[test]
    fn test_revised_looser_stop_flagged_once() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let d = directive(Side::Short, dec!(100), dec!(105));
        run(&engine, &mut book, &d, &[dec!(100)]);

        let mut revised = d.clone();
        revised.stop_loss.price = dec!(110);
        let outcomes = run(&engine, &mut book, &revised, &[dec!(101), dec!(102)]);
        let record = book.get("sig_test").unwrap();

        assert_eq!(outcomes[0].anomalies.len(), 1);
        assert!(outcomes[1].is_idle());
        assert_eq!(record.stop_price, Some(dec!(105)));
        assert_eq!(record.planned_stop, Some(dec!(110)));
    }

    #[test]
    fn test_stop_before_entry_invalidates_plan() {
        let engine = LifecycleEngine::new();
        let mut book = AccountBook::new("acct-1");
        let d = directive(Side::Long, dec!(100), dec!(95));

        let outcomes = run(&engine, &mut book, &d, &[dec!(97), dec!(94), dec!(101)]);
        let record = book.get("sig_test").unwrap();

        assert!(outcomes.iter().all(|o| o.actions.is_empty()));
        assert_eq!(record.status, LifecycleStatus::Closed);
        assert_eq!(record.entry_price, None);
        assert_eq!(record.open_percent, Decimal::ZERO);
        assert_eq!(record.transitions[0].from, LifecycleStatus::Waiting);
    }
}
