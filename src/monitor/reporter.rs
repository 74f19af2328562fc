//! Deduplicated issue reporting.
//!
//! Every report is keyed by the first [`DEDUP_KEY_CHARS`] characters of its
//! title. A key is recorded before the tracker call, so a failed submission
//! is never retried for the lifetime of the process.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::context::MonitorContext;
use super::health;
use crate::errors::ReportError;
use crate::observability::telemetry::{redact_secrets, sanitize_for_log};
use crate::tracker::{CreatedIssue, IssueKind, IssueRequest};

pub const DEDUP_KEY_CHARS: usize = 50;
pub const TITLE_PREFIX: &str = "[Auto-Detected] ";
pub const REPORT_LABELS: [&str; 2] = ["auto-detected", "ui-health-monitor"];

/// Deduplication key for an issue title.
pub fn dedup_key(title: &str) -> String {
    title.chars().take(DEDUP_KEY_CHARS).collect()
}

/// Keys of every issue the reporter has attempted, in first-seen order.
#[derive(Debug, Default)]
pub struct ReportedIssues {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl ReportedIssues {
    /// Record a key. Returns false if it was already present.
    pub fn insert(&mut self, key: String) -> bool {
        if !self.seen.insert(key.clone()) {
            return false;
        }
        self.order.push(key);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Filed(CreatedIssue),
    Duplicate,
    Disabled,
    Failed(ReportError),
}

#[derive(Debug, Clone)]
pub struct IssueReporter {
    ctx: Arc<MonitorContext>,
}

impl IssueReporter {
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self { ctx }
    }

    pub async fn report_issue(&self, title: &str, details: Value) -> ReportOutcome {
        let key = dedup_key(title);
        {
            let mut reported = self.ctx.state.reported.lock();
            if reported.contains(&key) {
                debug!(key = %sanitize_for_log(&key), "Issue already reported, skipping duplicate");
                return ReportOutcome::Duplicate;
            }
            if !self.ctx.config.features.auto_reporting {
                info!(title = %sanitize_for_log(title), "Auto-reporting disabled, not filing issue");
                return ReportOutcome::Disabled;
            }
            reported.insert(key);
        }

        let request = self.build_request(title, &details).await;
        match self.ctx.tracker.create_issue(&request).await {
            Ok(created) => {
                info!(
                    number = created.issue_number,
                    url = %created.issue_url,
                    "Issue auto-reported"
                );
                ReportOutcome::Filed(created)
            }
            Err(e) => {
                error!(error = %e, title = %sanitize_for_log(title), "Failed to auto-report issue");
                ReportOutcome::Failed(e)
            }
        }
    }

    /// Assemble the tracker payload. Reads current state but mutates nothing.
    pub async fn build_request(&self, title: &str, details: &Value) -> IssueRequest {
        let host = self.ctx.host.as_ref();
        let ids = &self.ctx.config.elements;

        let snapshot: Vec<String> = health::evaluate(host, ids)
            .await
            .iter()
            .map(ToString::to_string)
            .collect();
        let attempts = self.ctx.state.attempts.lock().render();
        let app_version = host
            .app_version()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        let identity = host.identity();

        let details = serde_json::to_string_pretty(details).unwrap_or_else(|_| details.to_string());
        let snapshot =
            serde_json::to_string_pretty(&snapshot).unwrap_or_else(|_| format!("{:?}", snapshot));

        let body = format!(
            "## Auto-Detected Issue\n\n\
             **Title:** {title}\n\n\
             **Details:**\n```json\n{details}\n```\n\n\
             **Health Check Results:**\n```json\n{snapshot}\n```\n\n\
             **Host:** {identity}\n\
             **Timestamp:** {timestamp}\n\
             **Auto-Fix Attempts:** {attempts}\n",
            timestamp = Utc::now().to_rfc3339(),
        );

        IssueRequest {
            title: format!("{}{}", TITLE_PREFIX, title),
            body: redact_secrets(&body),
            labels: REPORT_LABELS.iter().map(|l| l.to_string()).collect(),
            kind: IssueKind::Bug,
            host_identity: identity,
            app_version,
        }
    }

    pub fn reported_keys(&self) -> Vec<String> {
        self.ctx.state.reported.lock().keys().to_vec()
    }
}
