//! Ingestion loop: signal source -> parser -> registry
//!
//! A single consumer task. It waits on the next alert or a stop message;
//! a stop arriving while a parse is in flight abandons that parse before
//! anything reaches the registry.

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::channels::AlertReceiver;
use crate::common::errors::{EngineError, Result};
use crate::directive::DirectiveParser;
use crate::registry::DirectiveRegistry;

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    /// Alerts taken off the queue
    pub received: u64,
    /// Alerts that produced a registry upsert
    pub accepted: u64,
    /// Alerts dropped after a parser failure
    pub rejected: u64,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitReason {
    StopRequested,
    SourceClosed,
}

/// Dispatcher wiring the signal source to the parser and registry
pub struct IngestionLoop {
    parser: DirectiveParser,
    registry: DirectiveRegistry,
}

impl IngestionLoop {
    pub fn new(parser: DirectiveParser, registry: DirectiveRegistry) -> Self {
        Self { parser, registry }
    }

    /// Spawn the loop on the runtime and return a handle to stop it
    pub fn spawn(self, source: AlertReceiver) -> IngestionHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(source, stop_rx));
        IngestionHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    /// Run until a stop message arrives, the stop sender is dropped, or the
    /// source closes
    pub async fn run(
        self,
        mut source: AlertReceiver,
        mut stop: oneshot::Receiver<()>,
    ) -> IngestionStats {
        let mut stats = IngestionStats::default();
        info!("Ingestion loop started");

        let reason = loop {
            let raw_text = tokio::select! {
                biased;
                _ = &mut stop => break ExitReason::StopRequested,
                next = source.recv() => match next {
                    Some(text) => text,
                    None => break ExitReason::SourceClosed,
                },
            };
            stats.received += 1;

            let parsed = tokio::select! {
                biased;
                _ = &mut stop => break ExitReason::StopRequested,
                parsed = self.parser.parse(&raw_text) => parsed,
            };

            match parsed {
                Ok(directive) => {
                    let outcome = self.registry.upsert(directive).await;
                    stats.accepted += 1;
                    debug!(id = %outcome.id, superseded = outcome.superseded.len(), "Alert ingested");
                }
                Err(e) => {
                    stats.rejected += 1;
                    match e {
                        EngineError::Gateway(_) => error!("Dropping alert, gateway failed: {}", e),
                        _ => warn!("Dropping alert: {}", e),
                    }
                }
            }
        };

        info!(
            ?reason,
            received = stats.received,
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Ingestion loop stopped"
        );
        stats
    }
}

/// Handle to a running ingestion loop
pub struct IngestionHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<IngestionStats>,
}

impl IngestionHandle {
    /// Signal the loop to stop and wait for it to exit
    pub async fn stop(mut self) -> Result<IngestionStats> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The loop may already have exited on a closed source
            let _ = stop_tx.send(());
        }
        self.join().await
    }

    /// Wait for the loop to exit on its own
    pub async fn join(self) -> Result<IngestionStats> {
        self.task
            .await
            .map_err(|e| EngineError::Internal(format!("ingestion task failed: {}", e)))
    }

    /// Whether the loop task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
