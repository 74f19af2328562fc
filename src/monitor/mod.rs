//! UI health monitor
//!
//! Observes a host UI, verifies that monitored interactions have their
//! expected effect, repairs known failure modes within a bounded attempt
//! budget, and escalates unrecoverable failures to an issue tracker.
//!
//! ```text
//! interactions ─► recorder ─► verification ─┐
//! structure ────► watcher ─────────────────┐│
//! runtime errors ► runtime_errors ────────┐││
//! interval ─────► health ──────────────┐  │││
//!                                      ▼  ▼▼▼
//!                    remediation ─► escalation ─► reporter ─► tracker
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod category;
pub mod context;
pub mod escalation;
pub mod health;
pub mod recorder;
pub mod remediation;
pub mod reporter;
pub mod runtime_errors;
pub mod verification;
pub mod watcher;

pub use category::ActionCategory;
pub use context::{MonitorContext, MonitorState};
pub use escalation::CriticalErrorEscalator;
pub use health::{HealthChecker, HealthIssue};
pub use recorder::{InteractionId, InteractionRecord, InteractionRecorder};
pub use remediation::{RemediationEngine, RepairProcedure};
pub use reporter::{IssueReporter, ReportOutcome};
pub use runtime_errors::RuntimeErrorWatcher;
pub use verification::{VerificationEngine, VerificationOutcome};
pub use watcher::StructuralWatcher;

use crate::config::MonitorConfig;
use crate::errors::Result;
use crate::host::{HostFeeds, InteractionEvent, TargetDescriptor, UiHost};
use crate::tracker::IssueTracker;

/// Point-in-time counters exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatistics {
    pub total_interactions: usize,
    pub verified_interactions: usize,
    pub auto_fix_attempts: BTreeMap<String, u32>,
    pub critical_error_count: u32,
    pub issues_reported: Vec<String>,
}

/// Background tasks started by [`UiHealthMonitor::initialize`].
#[derive(Debug)]
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop the feed loops and the health interval. Verification timers
    /// already armed still run to completion.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for result in futures::future::join_all(self.tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "Monitor task ended abnormally");
            }
        }
        debug!("Monitor stopped");
    }
}

/// Composition root wiring every component to one shared context.
#[derive(Debug, Clone)]
pub struct UiHealthMonitor {
    ctx: Arc<MonitorContext>,
    recorder: InteractionRecorder,
    verification: VerificationEngine,
    watcher: StructuralWatcher,
    health: HealthChecker,
    escalator: CriticalErrorEscalator,
    reporter: IssueReporter,
    remediation: RemediationEngine,
    runtime_errors: RuntimeErrorWatcher,
    initialized: Arc<AtomicBool>,
}

impl UiHealthMonitor {
    /// Fails with [`MonitorError::Config`](crate::errors::MonitorError::Config)
    /// when `config` does not validate.
    pub fn new(
        config: MonitorConfig,
        host: Arc<dyn UiHost>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Result<Self> {
        Self::with_procedures(config, host, tracker, remediation::default_procedures())
    }

    /// Build with a custom set of repair procedures.
    pub fn with_procedures(
        config: MonitorConfig,
        host: Arc<dyn UiHost>,
        tracker: Arc<dyn IssueTracker>,
        procedures: Vec<Arc<dyn RepairProcedure>>,
    ) -> Result<Self> {
        config.validate()?;
        let ctx = MonitorContext::new(config, host, tracker);
        let reporter = IssueReporter::new(ctx.clone());
        let escalator = CriticalErrorEscalator::new(ctx.clone(), reporter.clone());
        let remediation = RemediationEngine::new(ctx.clone(), reporter.clone(), procedures);
        let recorder = InteractionRecorder::new(ctx.clone());
        let verification =
            VerificationEngine::new(ctx.clone(), recorder.clone(), remediation.clone());
        let watcher = StructuralWatcher::new(
            ctx.config.elements.structurally_monitored(),
            escalator.clone(),
        );
        let health = HealthChecker::new(ctx.clone(), remediation.clone(), escalator.clone());
        let runtime_errors = RuntimeErrorWatcher::new(ctx.clone(), escalator.clone());

        Ok(Self {
            ctx,
            recorder,
            verification,
            watcher,
            health,
            escalator,
            reporter,
            remediation,
            runtime_errors,
            initialized: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Start observing. Returns `None` when already initialized.
    pub async fn initialize(&self, feeds: HostFeeds) -> Option<MonitorHandle> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("UI health monitor already initialized");
            return None;
        }
        info!(host = %self.ctx.host.identity(), "Initializing UI health monitor");

        let HostFeeds {
            interactions,
            structure,
            runtime_errors,
        } = feeds;
        let (shutdown, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(self.clone().interaction_loop(interactions, shutdown_rx.clone())),
            tokio::spawn(self.watcher.clone().run(structure, shutdown_rx.clone())),
            tokio::spawn(
                self.runtime_errors
                    .clone()
                    .run(runtime_errors, shutdown_rx.clone()),
            ),
            tokio::spawn(self.health.clone().run(shutdown_rx)),
        ];

        self.health.verify_critical_elements().await;
        info!("UI health monitor active");

        Some(MonitorHandle { shutdown, tasks })
    }

    /// Record and classify one interaction, arming its verification.
    pub fn handle_interaction(
        &self,
        target: TargetDescriptor,
    ) -> (InteractionId, Option<JoinHandle<VerificationOutcome>>) {
        let category = ActionCategory::classify(&target, &self.ctx.config.elements);
        let id = self.recorder.record_interaction(category, target.clone());
        let pending = self
            .verification
            .schedule_verification(id.clone(), category, target);
        (id, pending)
    }

    async fn interaction_loop(
        self,
        mut events: mpsc::UnboundedReceiver<InteractionEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_interaction(event.target);
                    }
                    None => break,
                },
            }
        }
        debug!("Interaction loop stopped");
    }

    pub fn get_statistics(&self) -> MonitorStatistics {
        let (total_interactions, verified_interactions) = {
            let mut log = self.ctx.state.interactions.lock();
            log.prune();
            (log.len(), log.verified_count())
        };
        MonitorStatistics {
            total_interactions,
            verified_interactions,
            auto_fix_attempts: self.ctx.state.attempts.lock().snapshot(),
            critical_error_count: self.escalator.critical_error_count(),
            issues_reported: self.reporter.reported_keys(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.ctx
    }

    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    pub fn remediation(&self) -> &RemediationEngine {
        &self.remediation
    }

    pub fn escalator(&self) -> &CriticalErrorEscalator {
        &self.escalator
    }

    pub fn reporter(&self) -> &IssueReporter {
        &self.reporter
    }

    pub fn verification(&self) -> &VerificationEngine {
        &self.verification
    }

    pub fn watcher(&self) -> &StructuralWatcher {
        &self.watcher
    }

    pub fn runtime_errors(&self) -> &RuntimeErrorWatcher {
        &self.runtime_errors
    }
}
