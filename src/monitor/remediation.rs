//! Bounded auto-remediation
//!
//! Each remediation target owns an attempt counter. An attempt is reserved
//! under the counter lock before its repair procedure runs, so two
//! concurrent failures can never push a target past the configured maximum.
//! Counters reset only when a later verification of the same target passes.

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::context::MonitorContext;
use super::reporter::IssueReporter;
use crate::config::ElementIds;
use crate::errors::HostError;
use crate::host::{ActivationHandler, UiHost};
use crate::observability::telemetry::track_remediation;

pub const SETTINGS_BUTTON: &str = "settingsButton";
pub const CHAT_BUTTON: &str = "chatButton";
pub const TEST_CONNECTION: &str = "testConnection";

/// A named repair for one remediation target.
#[async_trait]
pub trait RepairProcedure: Send + Sync {
    /// Remediation target key, e.g. `settingsButton`.
    fn target(&self) -> &str;

    /// Human-readable subject used in health issue text and report titles.
    fn subject(&self) -> &str;

    /// Element the procedure works on.
    fn element<'a>(&self, ids: &'a ElementIds) -> &'a str;

    fn matches_issue(&self, issue: &str) -> bool {
        issue.contains(self.subject())
    }

    /// Returns whether a repair was applied. `Ok(false)` means there was
    /// nothing the procedure could do.
    async fn repair(&self, host: &dyn UiHost, ids: &ElementIds) -> Result<bool, HostError>;
}

/// Rebinds the settings trigger to the open-settings capability.
#[derive(Debug, Default)]
pub struct SettingsButtonRepair;

#[async_trait]
impl RepairProcedure for SettingsButtonRepair {
    fn target(&self) -> &str {
        SETTINGS_BUTTON
    }

    fn subject(&self) -> &str {
        "Settings button"
    }

    fn element<'a>(&self, ids: &'a ElementIds) -> &'a str {
        &ids.settings_trigger
    }

    async fn repair(&self, host: &dyn UiHost, ids: &ElementIds) -> Result<bool, HostError> {
        if host.element(&ids.settings_trigger).await.is_none() {
            error!(element = %ids.settings_trigger, "Cannot fix - settings button not found");
            return Ok(false);
        }
        host.replace_element(
            &ids.settings_trigger,
            ActivationHandler::InvokeCapability(ids.open_settings.clone()),
        )
        .await?;
        host.mark_handler_attached(&ids.settings_trigger).await?;
        info!("Settings button handler reattached");
        Ok(true)
    }
}

/// Rebinds the chat trigger to activate the chat panel.
#[derive(Debug, Default)]
pub struct ChatButtonRepair;

#[async_trait]
impl RepairProcedure for ChatButtonRepair {
    fn target(&self) -> &str {
        CHAT_BUTTON
    }

    fn subject(&self) -> &str {
        "Chat button"
    }

    fn element<'a>(&self, ids: &'a ElementIds) -> &'a str {
        &ids.chat_trigger
    }

    async fn repair(&self, host: &dyn UiHost, ids: &ElementIds) -> Result<bool, HostError> {
        if host.element(&ids.chat_trigger).await.is_none() {
            error!(element = %ids.chat_trigger, "Cannot fix - chat button not found");
            return Ok(false);
        }
        host.replace_element(
            &ids.chat_trigger,
            ActivationHandler::Activate(ids.chat_panel.clone()),
        )
        .await?;
        host.mark_handler_attached(&ids.chat_trigger).await?;
        info!("Chat button handler reattached");
        Ok(true)
    }
}

/// Connection tests depend on external state; log only.
#[derive(Debug, Default)]
pub struct ConnectionTestProbe;

#[async_trait]
impl RepairProcedure for ConnectionTestProbe {
    fn target(&self) -> &str {
        TEST_CONNECTION
    }

    fn subject(&self) -> &str {
        "Connection test"
    }

    fn element<'a>(&self, ids: &'a ElementIds) -> &'a str {
        &ids.connection_result
    }

    async fn repair(&self, _host: &dyn UiHost, _ids: &ElementIds) -> Result<bool, HostError> {
        warn!("Test connection appears broken, logging for investigation");
        Ok(false)
    }
}

pub fn default_procedures() -> Vec<Arc<dyn RepairProcedure>> {
    vec![
        Arc::new(SettingsButtonRepair),
        Arc::new(ChatButtonRepair),
        Arc::new(ConnectionTestProbe),
    ]
}

/// Per-target attempt counts.
#[derive(Debug, Default, Clone)]
pub struct AttemptCounters {
    counts: BTreeMap<String, u32>,
}

impl AttemptCounters {
    pub fn get(&self, target: &str) -> u32 {
        self.counts.get(target).copied().unwrap_or(0)
    }

    /// Reserve the next attempt unless `max` is reached. Returns the new count.
    pub fn try_reserve(&mut self, target: &str, max: u32) -> Option<u32> {
        let count = self.counts.entry(target.to_string()).or_insert(0);
        if *count >= max {
            return None;
        }
        *count += 1;
        Some(*count)
    }

    /// Reset to zero. Returns the previous count.
    pub fn reset(&mut self, target: &str) -> u32 {
        self.counts.insert(target.to_string(), 0).unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u32> {
        self.counts.clone()
    }

    /// `target=count` pairs for issue bodies, `None` when nothing was tried.
    pub fn render(&self) -> String {
        let pairs: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(t, n)| format!("{}={}", t, n))
            .collect();
        if pairs.is_empty() {
            "None".to_string()
        } else {
            pairs.join(", ")
        }
    }
}

#[derive(Clone)]
pub struct RemediationEngine {
    ctx: Arc<MonitorContext>,
    reporter: IssueReporter,
    procedures: Arc<Vec<Arc<dyn RepairProcedure>>>,
}

impl std::fmt::Debug for RemediationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let targets: Vec<&str> = self.procedures.iter().map(|p| p.target()).collect();
        f.debug_struct("RemediationEngine")
            .field("targets", &targets)
            .finish()
    }
}

impl RemediationEngine {
    pub fn new(
        ctx: Arc<MonitorContext>,
        reporter: IssueReporter,
        procedures: Vec<Arc<dyn RepairProcedure>>,
    ) -> Self {
        Self {
            ctx,
            reporter,
            procedures: Arc::new(procedures),
        }
    }

    fn procedure(&self, target: &str) -> Option<&Arc<dyn RepairProcedure>> {
        self.procedures.iter().find(|p| p.target() == target)
    }

    /// Remediation target whose subject appears in a health issue.
    pub fn target_for_issue(&self, issue: &str) -> Option<String> {
        self.procedures
            .iter()
            .find(|p| p.matches_issue(issue))
            .map(|p| p.target().to_string())
    }

    pub fn attempts(&self, target: &str) -> u32 {
        self.ctx.state.attempts.lock().get(target)
    }

    /// Run one bounded repair attempt for `target`.
    ///
    /// Once the counter reaches the maximum the target is given up on and a
    /// single report is filed; further calls only hit the reporter's dedup.
    pub async fn attempt_fix(&self, target: &str) -> bool {
        let Some(procedure) = self.procedure(target).cloned() else {
            warn!(fix_target = target, "No repair procedure registered");
            return false;
        };
        let max = self.ctx.config.limits.max_auto_fix_attempts;

        let reserved = self.ctx.state.attempts.lock().try_reserve(target, max);
        let Some(attempt) = reserved else {
            error!(fix_target = target, attempts = max, "Auto-fix failed after max attempts, giving up");
            self.report_gave_up(procedure.as_ref(), max).await;
            return false;
        };

        info!(fix_target = target, attempt, max, "Attempting auto-fix");
        let host = self.ctx.host.clone();
        let ids = &self.ctx.config.elements;
        let applied = track_remediation(target, attempt, || procedure.repair(host.as_ref(), ids))
            .await
            .unwrap_or(false);

        if attempt >= max {
            error!(fix_target = target, attempts = attempt, "Auto-fix attempts exhausted");
            self.report_gave_up(procedure.as_ref(), attempt).await;
        }
        applied
    }

    /// Record that `target` verified successfully, clearing its counter.
    pub fn confirm_repair(&self, target: &str) {
        let previous = self.ctx.state.attempts.lock().reset(target);
        if previous > 0 {
            info!(fix_target = target, previous, "Verification passed, auto-fix counter reset");
        }
    }

    async fn report_gave_up(&self, procedure: &dyn RepairProcedure, attempts: u32) {
        let title = format!("{} not working after auto-fix attempts", procedure.subject());
        let details = json!({
            "attempts": attempts,
            "element": procedure.element(&self.ctx.config.elements),
        });
        self.reporter.report_issue(&title, details).await;
    }
}
