//! Explicit context shared by every monitor component.
//!
//! The composition root builds one [`MonitorContext`] and hands an `Arc` of
//! it to each component. All mutable state lives in [`MonitorState`]; a
//! fresh context means fresh counters, which keeps tests isolated.

use parking_lot::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use super::recorder::InteractionLog;
use super::remediation::AttemptCounters;
use super::reporter::ReportedIssues;
use crate::config::MonitorConfig;
use crate::host::UiHost;
use crate::tracker::IssueTracker;

/// Process-wide mutable state.
///
/// Each structure sits behind its own lock; no lock is ever held across an
/// `.await`, and check-then-increment sequences happen inside one critical
/// section so concurrent callbacks cannot race past a limit.
#[derive(Debug)]
pub struct MonitorState {
    pub interactions: Mutex<InteractionLog>,
    pub attempts: Mutex<AttemptCounters>,
    pub reported: Mutex<ReportedIssues>,
    pub critical_errors: AtomicU32,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            interactions: Mutex::new(InteractionLog::new(config.retention.clone())),
            attempts: Mutex::new(AttemptCounters::default()),
            reported: Mutex::new(ReportedIssues::default()),
            critical_errors: AtomicU32::new(0),
        }
    }
}

pub struct MonitorContext {
    pub config: Arc<MonitorConfig>,
    pub host: Arc<dyn UiHost>,
    pub tracker: Arc<dyn IssueTracker>,
    pub state: MonitorState,
}

impl MonitorContext {
    pub fn new(
        config: MonitorConfig,
        host: Arc<dyn UiHost>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Arc<Self> {
        let state = MonitorState::new(&config);
        Arc::new(Self {
            config: Arc::new(config),
            host,
            tracker,
            state,
        })
    }
}

impl std::fmt::Debug for MonitorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorContext")
            .field("config", &self.config)
            .field("host", &self.host.identity())
            .field("state", &self.state)
            .finish()
    }
}
