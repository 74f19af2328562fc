//! Structural change watcher
//!
//! Consumes the host's structural change feed and escalates net removals of
//! critical elements.

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::escalation::CriticalErrorEscalator;
use crate::host::StructuralChange;

/// Flags removal of structurally monitored elements as critical errors.
#[derive(Debug, Clone)]
pub struct StructuralWatcher {
    monitored: Vec<String>,
    escalator: CriticalErrorEscalator,
}

impl StructuralWatcher {
    pub fn new(monitored: Vec<String>, escalator: CriticalErrorEscalator) -> Self {
        Self {
            monitored,
            escalator,
        }
    }

    /// Returns the number of monitored elements this batch removed.
    /// Replacements (removed and re-inserted in one batch) are ignored.
    pub async fn handle_change(&self, change: &StructuralChange) -> usize {
        let removed: Vec<String> = change
            .net_removed()
            .filter(|d| self.monitored.contains(&d.id))
            .map(|d| d.id.clone())
            .collect();

        for id in &removed {
            self.escalator
                .handle_critical_error(
                    &format!("Critical UI element removed: {}", id),
                    json!({ "element": id }),
                )
                .await;
        }
        removed.len()
    }

    pub async fn run(
        self,
        mut changes: mpsc::UnboundedReceiver<StructuralChange>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                change = changes.recv() => match change {
                    Some(change) => {
                        self.handle_change(&change).await;
                    }
                    None => break,
                },
            }
        }
        debug!("Structural watcher stopped");
    }
}
