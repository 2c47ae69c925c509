//! Directive registry: the one active directive per instrument
//!
//! Two cloneable handles over one `RwLock`. The ingestion loop holds the
//! only [`DirectiveRegistry`] writer; per-account lifecycle pollers and
//! presentation layers read through [`RegistryReader::active_latest`] and
//! [`RegistryReader::list_active`].

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::directive::{fingerprint, Directive};

/// A directive plus its acceptance timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub directive: Directive,
    pub accepted_at: DateTime<Utc>,
    /// Acceptance order; breaks ties between identical timestamps
    pub sequence: u64,
}

/// What an upsert did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Id of the stored directive (assigned if it had none)
    pub id: String,
    /// Ids of entries removed because they targeted the same instrument
    pub superseded: Vec<String>,
    /// True when an entry with the same id was overwritten in place
    pub updated_in_place: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<String, RegistryEntry>,
    next_sequence: u64,
}

/// Writer handle over the store of active directives
///
/// Held by the ingestion loop; everyone else gets a [`RegistryReader`].
#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    inner: Arc<RwLock<RegistryState>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view over the same directives
    pub fn reader(&self) -> RegistryReader {
        RegistryReader {
            inner: self.inner.clone(),
        }
    }

    /// Insert or replace a directive
    ///
    /// All mutation happens under one write guard, so readers observe either
    /// the state before or the state after, never a partial upsert.
    #[instrument(skip(self, directive), fields(symbol = %directive.symbol))]
    pub async fn upsert(&self, mut directive: Directive) -> UpsertOutcome {
        let mut state = self.inner.write().await;
        let now = Utc::now();

        state.next_sequence += 1;
        let sequence = state.next_sequence;

        if directive.needs_id() {
            directive.id = fingerprint(&directive, now, sequence);
            debug!(id = %directive.id, "Assigned directive id");
        }

        let superseded: Vec<String> = state
            .entries
            .iter()
            .filter(|(id, entry)| {
                entry.directive.symbol == directive.symbol && **id != directive.id
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in &superseded {
            state.entries.remove(id);
            info!(superseded = %id, "Directive superseded by newer alert");
        }

        let id = directive.id.clone();
        let updated_in_place = state
            .entries
            .insert(
                id.clone(),
                RegistryEntry {
                    directive,
                    accepted_at: now,
                    sequence,
                },
            )
            .is_some();

        info!(id = %id, updated_in_place, "Directive accepted");
        UpsertOutcome {
            id,
            superseded,
            updated_in_place,
        }
    }
}

/// Read-only handle for lifecycle pollers and presentation layers
#[derive(Debug, Clone)]
pub struct RegistryReader {
    inner: Arc<RwLock<RegistryState>>,
}

impl RegistryReader {
    /// The most recently accepted directive across all instruments
    pub async fn active_latest(&self) -> Option<(Directive, DateTime<Utc>)> {
        let state = self.inner.read().await;
        state
            .entries
            .values()
            .max_by_key(|entry| (entry.accepted_at, entry.sequence))
            .map(|entry| (entry.directive.clone(), entry.accepted_at))
    }

    /// Snapshot of all active directives in a stable order
    ///
    /// Ordered by acceptance time ascending, ties by symbol ascending, so
    /// independent pollers visit directives in the same relative order.
    pub async fn list_active(&self) -> Vec<RegistryEntry> {
        let state = self.inner.read().await;
        let mut entries: Vec<RegistryEntry> = state.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.accepted_at
                .cmp(&b.accepted_at)
                .then_with(|| a.directive.symbol.cmp(&b.directive.symbol))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        entries
    }

    /// Look up an entry by directive id
    pub async fn get(&self, id: &str) -> Option<RegistryEntry> {
        self.inner.read().await.entries.get(id).cloned()
    }

    /// Look up the active entry for an instrument
    pub async fn get_by_symbol(&self, symbol: &str) -> Option<RegistryEntry> {
        self.inner
            .read()
            .await
            .entries
            .values()
            .find(|entry| entry.directive.symbol == symbol)
            .cloned()
    }

    /// Number of active directives
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether the registry holds no directives
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}
