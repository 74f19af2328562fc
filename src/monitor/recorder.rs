//! Interaction recording and bounded retention.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::category::ActionCategory;
use super::context::MonitorContext;
use crate::config::RetentionConfig;
use crate::host::TargetDescriptor;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Unique interaction identifier: wall-clock millis, a process-wide
/// sequence number and a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InteractionId(String);

impl InteractionId {
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let suffix: u32 = rand::random();
        Self(format!("{}-{}-{:08x}", millis, seq, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InteractionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    pub id: InteractionId,
    pub category: ActionCategory,
    pub target: TargetDescriptor,
    pub timestamp: DateTime<Utc>,
    pub verified: bool,
    #[serde(skip)]
    recorded_at: Instant,
}

impl InteractionRecord {
    /// A fresh, unverified record stamped with the current time.
    pub fn new(category: ActionCategory, target: TargetDescriptor) -> Self {
        Self {
            id: InteractionId::generate(),
            category,
            target,
            timestamp: Utc::now(),
            verified: false,
            recorded_at: Instant::now(),
        }
    }
}

/// Insertion-ordered interaction store, bounded by count and age.
#[derive(Debug)]
pub struct InteractionLog {
    records: HashMap<InteractionId, InteractionRecord>,
    order: VecDeque<InteractionId>,
    retention: RetentionConfig,
}

impl InteractionLog {
    pub fn new(retention: RetentionConfig) -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            retention,
        }
    }

    pub fn insert(&mut self, record: InteractionRecord) {
        self.order.push_back(record.id.clone());
        self.records.insert(record.id.clone(), record);
        self.evict(Instant::now());
    }

    fn evict(&mut self, now: Instant) {
        let max_age = Duration::from_secs(self.retention.max_age_secs);
        while let Some(oldest) = self.order.front() {
            let expired = self
                .records
                .get(oldest)
                .map(|r| now.saturating_duration_since(r.recorded_at) > max_age)
                .unwrap_or(true);
            if self.order.len() <= self.retention.max_records && !expired {
                break;
            }
            if let Some(id) = self.order.pop_front() {
                self.records.remove(&id);
            }
        }
    }

    /// Drop records older than the configured age.
    pub fn prune(&mut self) {
        self.evict(Instant::now());
    }

    pub fn get(&self, id: &InteractionId) -> Option<&InteractionRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &InteractionId) -> bool {
        self.records.contains_key(id)
    }

    /// Set the verified flag. Returns false when the record is gone.
    pub fn mark_verified(&mut self, id: &InteractionId) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.verified = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn verified_count(&self) -> usize {
        self.records.values().filter(|r| r.verified).count()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &InteractionRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

#[derive(Debug, Clone)]
pub struct InteractionRecorder {
    ctx: Arc<MonitorContext>,
}

impl InteractionRecorder {
    pub fn new(ctx: Arc<MonitorContext>) -> Self {
        Self { ctx }
    }

    pub fn record_interaction(
        &self,
        category: ActionCategory,
        target: TargetDescriptor,
    ) -> InteractionId {
        let record = InteractionRecord::new(category, target);
        let id = record.id.clone();
        debug!(
            interaction = %id,
            category = %category,
            element = record.target.description(),
            "Interaction recorded"
        );
        self.ctx.state.interactions.lock().insert(record);
        id
    }

    pub fn mark_verified(&self, id: &InteractionId) -> bool {
        self.ctx.state.interactions.lock().mark_verified(id)
    }

    pub fn get(&self, id: &InteractionId) -> Option<InteractionRecord> {
        self.ctx.state.interactions.lock().get(id).cloned()
    }
}
