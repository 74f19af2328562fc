//! Unit tests for issue reporting through the monitor
//!
//! Tests cover:
//! - Deduplication across components
//! - Disabled reporting
//! - Tracker failures are not retried

use serde_json::json;
use std::sync::Arc;
use uihealth::errors::ReportError;
use uihealth::host::InMemoryHost;
use uihealth::monitor::ReportOutcome;
use uihealth::testing::RecordingTracker;
use uihealth::{MonitorConfig, UiHealthMonitor};

fn monitor(config: MonitorConfig) -> (UiHealthMonitor, Arc<InMemoryHost>, Arc<RecordingTracker>) {
    let (host, _feeds) = InMemoryHost::with_default_layout(&config.elements);
    let tracker = Arc::new(RecordingTracker::new());
    let monitor = UiHealthMonitor::new(config, host.clone(), tracker.clone()).unwrap();
    (monitor, host, tracker)
}

#[tokio::test]
async fn test_same_critical_message_reported_once() {
    let (monitor, _, tracker) = monitor(MonitorConfig::default());
    let escalator = monitor.escalator();

    escalator
        .handle_critical_error("Critical UI element removed: settingsModal", json!({}))
        .await;
    escalator
        .handle_critical_error("Critical UI element removed: settingsModal", json!({}))
        .await;

    assert_eq!(escalator.critical_error_count(), 2);
    assert_eq!(tracker.requests().len(), 1);
    assert_eq!(
        monitor.get_statistics().issues_reported,
        vec!["Critical UI element removed: settingsModal".to_string()]
    );
}

#[tokio::test]
async fn test_escalator_and_remediation_share_dedup() {
    let (monitor, _, tracker) = monitor(MonitorConfig::default());
    let title = "Chat button not working after auto-fix attempts";

    let outcome = monitor.reporter().report_issue(title, json!({})).await;
    assert!(matches!(outcome, ReportOutcome::Filed(_)));

    for _ in 0..3 {
        monitor.remediation().attempt_fix("chatButton").await;
    }
    assert_eq!(tracker.requests().len(), 1);
}

#[tokio::test]
async fn test_reporting_disabled_through_config() {
    let mut config = MonitorConfig::default();
    config.features.auto_reporting = false;
    let (monitor, _, tracker) = monitor(config);

    monitor
        .escalator()
        .handle_critical_error("Core function missing: openSettings", json!({}))
        .await;
    let outcome = monitor
        .reporter()
        .report_issue("Core function missing: openSettings", json!({}))
        .await;

    assert_eq!(outcome, ReportOutcome::Disabled);
    assert!(tracker.requests().is_empty());
    assert_eq!(monitor.get_statistics().critical_error_count, 1);
}

#[tokio::test]
async fn test_missing_credential_is_logged_not_retried() {
    let (monitor, _, tracker) = monitor(MonitorConfig::default());
    tracker.fail_with(ReportError::MissingCredential);

    let first = monitor.reporter().report_issue("No token", json!({})).await;
    assert_eq!(first, ReportOutcome::Failed(ReportError::MissingCredential));

    tracker.succeed();
    let second = monitor.reporter().report_issue("No token", json!({})).await;
    assert_eq!(second, ReportOutcome::Duplicate);
    assert_eq!(tracker.requests().len(), 1);
}

#[tokio::test]
async fn test_report_carries_host_version() {
    let (monitor, host, tracker) = monitor(MonitorConfig::default());
    host.set_version("2.4.1");
    monitor.reporter().report_issue("Versioned", json!({})).await;
    assert_eq!(tracker.requests()[0].app_version, "2.4.1");
}

#[tokio::test]
async fn test_health_snapshot_has_no_side_effects() {
    let (monitor, host, _) = monitor(MonitorConfig::default());
    host.detach_handler("settingsFab").unwrap();
    host.remove_capability("closeSettings");

    let request = monitor
        .reporter()
        .build_request("Snapshot", &json!({}))
        .await;

    assert!(request.body.contains("Settings button has no click handler"));
    assert!(request.body.contains("closeSettings function is not defined"));
    let stats = monitor.get_statistics();
    assert_eq!(stats.critical_error_count, 0);
    assert!(stats.auto_fix_attempts.is_empty());
    assert_eq!(host.replacement_count("settingsFab"), 0);
}
