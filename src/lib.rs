//! UI Health Monitor
//!
//! Watches a host user interface for broken interactions, repairs known
//! failure modes within a bounded attempt budget, and files deduplicated
//! issue reports for what cannot be repaired.
//!
//! - **Verification**: every monitored click is checked after a short delay
//! - **Remediation**: lost handlers are reattached, at most N times per target
//! - **Escalation**: critical errors are counted, reported, and a restart offered
//! - **Health checks**: periodic inspection of critical elements and capabilities
//!
//! # Quick Start
//!
//! ```ignore
//! use uihealth::{host::InMemoryHost, tracker::RecordingTracker, MonitorConfig, UiHealthMonitor};
//!
//! let config = MonitorConfig::load(None)?;
//! let (host, feeds) = InMemoryHost::with_default_layout(&config.elements);
//! let monitor = UiHealthMonitor::new(config, host, Arc::new(RecordingTracker::new()))?;
//! let handle = monitor.initialize(feeds).await;
//! ```

// ─── Core ──────────────────────────────────────────────────────────
pub mod config;
pub mod errors;
pub mod monitor;

// ─── Capabilities ──────────────────────────────────────────────────
pub mod host;
pub mod tracker;

// ─── Infrastructure ────────────────────────────────────────────────
pub mod cli;
pub mod observability;
pub mod testing;

pub use config::MonitorConfig;
pub use errors::{MonitorError, Result};
pub use monitor::{MonitorHandle, MonitorStatistics, UiHealthMonitor};
