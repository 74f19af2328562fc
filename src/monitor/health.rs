//! Periodic health checks.
//!
//! [`evaluate`] is a pure inspection of the host, reused by the reporter for
//! its health snapshot. [`HealthChecker::perform_health_check`] acts on the
//! result.

use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::context::MonitorContext;
use super::escalation::CriticalErrorEscalator;
use super::remediation::RemediationEngine;
use crate::config::ElementIds;
use crate::host::UiHost;

pub const MISSING_ELEMENTS_MESSAGE: &str = "Some critical UI elements are missing on page load";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HealthIssue {
    MissingElement { id: String },
    MissingHandler { id: String },
    MissingCapability { name: String },
}

impl std::fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingElement { id } => write!(f, "Missing element: {}", id),
            Self::MissingHandler { .. } => write!(f, "Settings button has no click handler"),
            Self::MissingCapability { name } => write!(f, "{} function is not defined", name),
        }
    }
}

/// Inspect the host without side effects.
///
/// Issues come back in a fixed order: missing critical elements, a settings
/// trigger without its handler marker, then missing capabilities.
pub async fn evaluate(host: &dyn UiHost, ids: &ElementIds) -> Vec<HealthIssue> {
    let mut issues = Vec::new();

    for (id, _) in ids.critical_checklist() {
        if host.element(id).await.is_none() {
            issues.push(HealthIssue::MissingElement { id: id.to_string() });
        }
    }

    if let Some(trigger) = host.element(&ids.settings_trigger).await {
        if !trigger.has_handler {
            issues.push(HealthIssue::MissingHandler {
                id: ids.settings_trigger.clone(),
            });
        }
    }

    for name in ids.required_capabilities() {
        if !host.has_capability(name).await {
            issues.push(HealthIssue::MissingCapability {
                name: name.to_string(),
            });
        }
    }

    issues
}

#[derive(Debug, Clone)]
pub struct HealthChecker {
    ctx: Arc<MonitorContext>,
    remediation: RemediationEngine,
    escalator: CriticalErrorEscalator,
}

impl HealthChecker {
    pub fn new(
        ctx: Arc<MonitorContext>,
        remediation: RemediationEngine,
        escalator: CriticalErrorEscalator,
    ) -> Self {
        Self {
            ctx,
            remediation,
            escalator,
        }
    }

    pub async fn perform_health_check(&self) -> Vec<HealthIssue> {
        let issues = evaluate(self.ctx.host.as_ref(), &self.ctx.config.elements).await;
        if issues.is_empty() {
            debug!("Health check passed");
            return issues;
        }

        let summary: Vec<String> = issues.iter().map(ToString::to_string).collect();
        warn!(count = issues.len(), issues = ?summary, "Health check found issues");

        // Missing capabilities cannot be repaired in place.
        for issue in &issues {
            if let HealthIssue::MissingCapability { name } = issue {
                self.escalator
                    .handle_critical_error(
                        &format!("Core function missing: {}", name),
                        json!({ "issue": issue.to_string() }),
                    )
                    .await;
            }
        }

        if self.ctx.config.features.auto_fix {
            let targets: BTreeSet<String> = issues
                .iter()
                .filter(|i| !matches!(i, HealthIssue::MissingCapability { .. }))
                .filter_map(|i| self.remediation.target_for_issue(&i.to_string()))
                .collect();
            for target in targets {
                self.remediation.attempt_fix(&target).await;
            }
        }

        issues
    }

    /// One-time presence check of the critical elements. Returns true when
    /// all are present.
    pub async fn verify_critical_elements(&self) -> bool {
        let host = self.ctx.host.as_ref();
        let mut missing = Vec::new();
        for (id, label) in self.ctx.config.elements.critical_checklist() {
            if host.element(id).await.is_none() {
                error!(element = id, label, "Critical element missing");
                missing.push(json!({ "id": id, "label": label }));
            }
        }

        if missing.is_empty() {
            info!("All critical UI elements present");
            return true;
        }

        self.escalator
            .handle_critical_error(MISSING_ELEMENTS_MESSAGE, json!({ "missing": missing }))
            .await;
        false
    }

    /// Run checks every configured interval until shutdown. The first check
    /// happens one full interval after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.ctx.config.timing.health_check_interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("Health check loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.perform_health_check().await;
                }
            }
        }
    }
}
