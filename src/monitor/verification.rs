//! Deferred verification of monitored interactions.
//!
//! Each monitored interaction gets one timer. When it fires, the expected
//! post-condition is checked against the live host. Timers are never
//! cancelled; a record evicted before its timer fires is skipped.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::category::ActionCategory;
use super::context::MonitorContext;
use super::recorder::{InteractionId, InteractionRecorder};
use super::remediation::RemediationEngine;
use crate::host::TargetDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// Post-condition not met; `repaired` is whether a repair was applied
    Failed { target: &'static str, repaired: bool },
    /// Save left the settings modal open; logged only
    Inconclusive,
    /// Record evicted or category not monitored
    Skipped,
}

#[derive(Debug, Clone)]
pub struct VerificationEngine {
    ctx: Arc<MonitorContext>,
    recorder: InteractionRecorder,
    remediation: RemediationEngine,
}

impl VerificationEngine {
    pub fn new(
        ctx: Arc<MonitorContext>,
        recorder: InteractionRecorder,
        remediation: RemediationEngine,
    ) -> Self {
        Self {
            ctx,
            recorder,
            remediation,
        }
    }

    /// Delay before a category's post-condition is checked.
    pub fn delay_for(&self, category: ActionCategory) -> Duration {
        let timing = &self.ctx.config.timing;
        let base = timing.verification_delay();
        match category {
            ActionCategory::ConnectionTest => {
                base + Duration::from_millis(timing.connection_test_delay_ms)
            }
            ActionCategory::SettingsSave => {
                base + Duration::from_millis(timing.save_verification_delay_ms)
            }
            _ => base,
        }
    }

    /// Arm the verification timer. Returns `None` for unmonitored targets.
    pub fn schedule_verification(
        &self,
        id: InteractionId,
        category: ActionCategory,
        target: TargetDescriptor,
    ) -> Option<JoinHandle<VerificationOutcome>> {
        if !category.is_monitored() {
            return None;
        }
        let delay = self.delay_for(category);
        let engine = self.clone();
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.verify(&id, category, &target).await
        }))
    }

    /// Check the post-condition for one interaction now.
    pub async fn verify(
        &self,
        id: &InteractionId,
        category: ActionCategory,
        target: &TargetDescriptor,
    ) -> VerificationOutcome {
        if !self.ctx.state.interactions.lock().contains(id) {
            debug!(interaction = %id, "Interaction evicted before verification");
            return VerificationOutcome::Skipped;
        }

        let host = self.ctx.host.as_ref();
        let ids = &self.ctx.config.elements;
        let passed = match category {
            ActionCategory::SettingsOpen => host.is_active(&ids.settings_modal).await,
            ActionCategory::ChatOpen => host.is_active(&ids.chat_panel).await,
            ActionCategory::ConnectionTest => host
                .text_content(&ids.connection_result)
                .await
                .is_some_and(|t| !t.trim().is_empty()),
            ActionCategory::SettingsSave => {
                if host.is_active(&ids.settings_modal).await {
                    warn!(interaction = %id, "Settings modal still open after save");
                    return VerificationOutcome::Inconclusive;
                }
                true
            }
            ActionCategory::Unmonitored => return VerificationOutcome::Skipped,
        };

        if passed {
            self.recorder.mark_verified(id);
            if let Some(fix_target) = category.remediation_target() {
                self.remediation.confirm_repair(fix_target);
            }
            debug!(interaction = %id, category = %category, "Interaction verified");
            return VerificationOutcome::Verified;
        }

        // Only monitored open/test categories can reach here.
        let Some(fix_target) = category.remediation_target() else {
            return VerificationOutcome::Skipped;
        };
        error!(
            interaction = %id,
            category = %category,
            element = target.description(),
            "Interaction had no visible effect"
        );

        if !self.ctx.config.features.auto_fix {
            info!(fix_target, "Auto-fix disabled, not attempting repair");
            return VerificationOutcome::Failed {
                target: fix_target,
                repaired: false,
            };
        }

        let repaired = self.remediation.attempt_fix(fix_target).await;
        VerificationOutcome::Failed {
            target: fix_target,
            repaired,
        }
    }
}
