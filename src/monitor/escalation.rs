//! Critical error escalation
//!
//! The critical error count is cumulative for the process lifetime. Reaching
//! the threshold offers the user a restart exactly once.

use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::context::MonitorContext;
use super::reporter::IssueReporter;

/// Restart confirmation text for `count` critical errors.
pub fn restart_prompt(count: u32, reported: bool) -> String {
    let mut prompt = format!(
        "The app has encountered {} critical errors. \
Would you like to restart the application to restore functionality?",
        count
    );
    if reported {
        prompt.push_str("\n\n(A bug report has been automatically created)");
    }
    prompt
}

/// Counts critical errors, reports them, and offers one restart when the
/// count reaches the configured threshold.
#[derive(Debug, Clone)]
pub struct CriticalErrorEscalator {
    ctx: Arc<MonitorContext>,
    reporter: IssueReporter,
}

impl CriticalErrorEscalator {
    pub fn new(ctx: Arc<MonitorContext>, reporter: IssueReporter) -> Self {
        Self { ctx, reporter }
    }

    /// Returns the critical error count after this error.
    pub async fn handle_critical_error(&self, message: &str, details: Value) -> u32 {
        let count = self.ctx.state.critical_errors.fetch_add(1, Ordering::SeqCst) + 1;
        error!(count, error = message, "Critical UI error");

        if self.ctx.config.features.auto_reporting {
            self.reporter.report_issue(message, details).await;
        }

        // Exactly one caller observes the crossing.
        if count == self.ctx.config.limits.critical_error_threshold {
            self.offer_restart(count).await;
        }
        count
    }

    pub fn critical_error_count(&self) -> u32 {
        self.ctx.state.critical_errors.load(Ordering::SeqCst)
    }

    async fn offer_restart(&self, count: u32) {
        warn!(count, "Critical error threshold reached, offering restart");
        let host = &self.ctx.host;
        let prompt = restart_prompt(count, self.ctx.config.features.auto_reporting);
        if !host.confirm(&prompt).await {
            info!("Restart declined");
            return;
        }
        if let Err(e) = host.restart().await {
            error!(error = %e, "Host restart failed");
        }
    }
}
