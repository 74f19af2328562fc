//! Runtime error classification
//!
//! Uncaught errors and unhandled rejections from the host are logged, matched
//! against known signatures of broken settings wiring, and escalated when
//! critical.

use regex::{Regex, RegexBuilder};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};

use super::context::MonitorContext;
use super::escalation::CriticalErrorEscalator;
use crate::host::RuntimeError;
use crate::observability::telemetry::sanitize_for_log;

fn critical_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"openSettings is not a function",
            r"closeSettings is not a function",
            r"Cannot read property.*settingsModal",
            r"settingsModal is null",
            r"critical.*missing",
        ]
        .iter()
        .filter_map(|p| RegexBuilder::new(p).case_insensitive(true).build().ok())
        .collect()
    })
}

/// Whether a runtime error message indicates broken core UI wiring.
pub fn is_critical_error(message: &str) -> bool {
    critical_patterns().iter().any(|re| re.is_match(message))
}

/// Consumes the host's runtime error feed.
#[derive(Debug, Clone)]
pub struct RuntimeErrorWatcher {
    ctx: Arc<MonitorContext>,
    escalator: CriticalErrorEscalator,
}

impl RuntimeErrorWatcher {
    pub fn new(ctx: Arc<MonitorContext>, escalator: CriticalErrorEscalator) -> Self {
        Self { ctx, escalator }
    }

    /// Returns whether the error was escalated as critical.
    pub async fn handle_runtime_error(&self, err: &RuntimeError) -> bool {
        error!(
            kind = ?err.kind,
            error = %sanitize_for_log(&err.message),
            source = err.source.as_deref().unwrap_or(""),
            line = err.line.unwrap_or(0),
            "Runtime error caught"
        );

        let critical = is_critical_error(&err.message);
        if critical {
            let details = serde_json::to_value(err).unwrap_or_default();
            self.escalator
                .handle_critical_error(&err.message, details)
                .await;
        }

        if self.ctx.config.features.telemetry {
            if let Err(e) = self.ctx.host.report_error(err).await {
                warn!(error = %e, "Failed to forward runtime error to telemetry");
            }
        }
        critical
    }

    pub async fn run(
        self,
        mut errors: mpsc::UnboundedReceiver<RuntimeError>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                err = errors.recv() => match err {
                    Some(err) => {
                        self.handle_runtime_error(&err).await;
                    }
                    None => break,
                },
            }
        }
        debug!("Runtime error watcher stopped");
    }
}
