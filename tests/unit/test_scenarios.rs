//! End-to-end monitor scenarios against the in-memory host
//!
//! Time is paused, so verification delays and the health-check interval
//! advance deterministically.

use std::sync::Arc;
use std::time::Duration;
use uihealth::host::{HostFeeds, InMemoryHost, RuntimeError, RuntimeErrorKind, UiHost};
use uihealth::monitor::escalation::restart_prompt;
use uihealth::monitor::remediation::{CHAT_BUTTON, SETTINGS_BUTTON};
use uihealth::testing::RecordingTracker;
use uihealth::{MonitorConfig, MonitorHandle, UiHealthMonitor};

struct Harness {
    monitor: UiHealthMonitor,
    host: Arc<InMemoryHost>,
    tracker: Arc<RecordingTracker>,
    handle: MonitorHandle,
}

async fn start(config: MonitorConfig) -> Harness {
    let (host, feeds) = InMemoryHost::with_default_layout(&config.elements);
    start_with(config, host, feeds).await
}

async fn start_with(config: MonitorConfig, host: Arc<InMemoryHost>, feeds: HostFeeds) -> Harness {
    let tracker = Arc::new(RecordingTracker::new());
    let monitor = UiHealthMonitor::new(config, host.clone(), tracker.clone()).unwrap();
    let handle = monitor.initialize(feeds).await.unwrap();
    Harness {
        monitor,
        host,
        tracker,
        handle,
    }
}

fn titles(tracker: &RecordingTracker) -> Vec<String> {
    tracker.requests().into_iter().map(|r| r.title).collect()
}

async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_three_failing_settings_clicks_give_up_and_report() {
    let h = start(MonitorConfig::default()).await;
    h.host.remove_capability("openSettings");

    h.host.click("settingsFab").unwrap();
    advance_ms(600).await;
    assert_eq!(h.monitor.remediation().attempts(SETTINGS_BUTTON), 1);
    assert!(titles(&h.tracker).is_empty());

    h.host.click("settingsFab").unwrap();
    advance_ms(600).await;
    h.host.click("settingsFab").unwrap();
    advance_ms(600).await;

    assert_eq!(h.monitor.remediation().attempts(SETTINGS_BUTTON), 3);
    assert_eq!(
        titles(&h.tracker),
        vec!["[Auto-Detected] Settings button not working after auto-fix attempts"]
    );

    // A fourth failure is deduplicated and does not exceed the budget
    h.host.click("settingsFab").unwrap();
    advance_ms(600).await;
    assert_eq!(h.monitor.remediation().attempts(SETTINGS_BUTTON), 3);
    assert_eq!(h.tracker.requests().len(), 1);

    let stats = h.monitor.get_statistics();
    assert_eq!(stats.total_interactions, 4);
    assert_eq!(stats.verified_interactions, 0);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_gave_up_report_carries_attempts_and_element() {
    let h = start(MonitorConfig::default()).await;
    h.host.remove_capability("openSettings");
    for _ in 0..3 {
        h.host.click("settingsFab").unwrap();
        advance_ms(600).await;
    }
    let body = &h.tracker.requests()[0].body;
    assert!(body.contains("\"attempts\": 3"));
    assert!(body.contains("\"element\": \"settingsFab\""));
    assert!(body.contains("openSettings function is not defined"));
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_lost_handler_is_repaired_and_counter_resets() {
    let h = start(MonitorConfig::default()).await;
    h.host.detach_handler("chatFab").unwrap();

    h.host.click("chatFab").unwrap();
    advance_ms(600).await;
    assert_eq!(h.monitor.remediation().attempts(CHAT_BUTTON), 1);
    assert_eq!(h.host.replacement_count("chatFab"), 1);

    h.host.click("chatFab").unwrap();
    advance_ms(600).await;
    assert!(h.host.is_active("chatPanel").await);
    assert_eq!(h.monitor.remediation().attempts(CHAT_BUTTON), 0);
    assert!(h.tracker.requests().is_empty());

    let stats = h.monitor.get_statistics();
    assert_eq!(stats.verified_interactions, 1);
    assert_eq!(stats.critical_error_count, 0);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_close_capability_is_critical_without_fix() {
    let h = start(MonitorConfig::default()).await;
    h.host.remove_capability("closeSettings");

    advance_ms(5_100).await;

    let stats = h.monitor.get_statistics();
    assert_eq!(stats.critical_error_count, 1);
    assert!(stats.auto_fix_attempts.values().all(|n| *n == 0));
    assert_eq!(
        titles(&h.tracker),
        vec!["[Auto-Detected] Core function missing: closeSettings"]
    );

    // Same message on the next interval is counted but not re-filed
    advance_ms(5_000).await;
    assert_eq!(h.monitor.get_statistics().critical_error_count, 2);
    assert_eq!(h.tracker.requests().len(), 1);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_threshold_prompts_exactly_once() {
    let h = start(MonitorConfig::default()).await;
    h.host.set_confirm_answer(false);
    h.host.remove_capability("closeSettings");

    // One critical error per health check interval
    advance_ms(4 * 5_000 + 100).await;

    assert_eq!(h.monitor.get_statistics().critical_error_count, 4);
    let prompts = h.host.prompts();
    assert_eq!(prompts, vec![restart_prompt(3, true)]);
    assert!(prompts[0].contains("3 critical errors"));
    assert_eq!(h.host.restart_count(), 0);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_removed_modal_escalates_but_replacement_does_not() {
    let h = start(MonitorConfig::default()).await;

    // Repair-style replacement of the trigger is not a removal
    h.host
        .replace_element(
            "settingsFab",
            uihealth::host::ActivationHandler::InvokeCapability("openSettings".into()),
        )
        .await
        .unwrap();
    advance_ms(10).await;
    assert_eq!(h.monitor.get_statistics().critical_error_count, 0);

    h.host.remove_element("settingsModal").unwrap();
    advance_ms(10).await;
    assert_eq!(h.monitor.get_statistics().critical_error_count, 1);
    assert_eq!(
        titles(&h.tracker),
        vec!["[Auto-Detected] Critical UI element removed: settingsModal"]
    );
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_missing_elements_at_startup() {
    let config = MonitorConfig::default();
    let (host, feeds) = InMemoryHost::with_default_layout(&config.elements);
    host.remove_element("chatPanel").unwrap();

    let h = start_with(config, host, feeds).await;
    assert_eq!(h.monitor.get_statistics().critical_error_count, 1);
    assert_eq!(
        titles(&h.tracker),
        vec!["[Auto-Detected] Some critical UI elements are missing on page load"]
    );
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_connection_test_verified_after_extended_delay() {
    let h = start(MonitorConfig::default()).await;

    h.host.click("testConnectionBtn").unwrap();
    advance_ms(600).await;
    assert_eq!(h.monitor.get_statistics().verified_interactions, 0);

    advance_ms(2_000).await;
    assert_eq!(h.monitor.get_statistics().verified_interactions, 1);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_runtime_errors_classified() {
    let h = start(MonitorConfig::default()).await;

    h.host.emit_runtime_error(RuntimeError::new(
        RuntimeErrorKind::UnhandledRejection,
        "fetch aborted",
    ));
    h.host.emit_runtime_error(RuntimeError::new(
        RuntimeErrorKind::Error,
        "TypeError: openSettings is not a function",
    ));
    advance_ms(10).await;

    assert_eq!(h.monitor.get_statistics().critical_error_count, 1);
    assert_eq!(h.host.reported_errors().len(), 2);
    assert_eq!(
        titles(&h.tracker),
        vec!["[Auto-Detected] TypeError: openSettings is not a function"]
    );
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unmonitored_clicks_recorded_not_verified() {
    let h = start(MonitorConfig::default()).await;
    h.host.insert_element(
        uihealth::host::TargetDescriptor::new("helpLink").with_tag("A").with_text("Help"),
        None,
    );
    h.host.click("helpLink").unwrap();
    advance_ms(3_000).await;

    let stats = h.monitor.get_statistics();
    assert_eq!(stats.total_interactions, 1);
    assert_eq!(stats.verified_interactions, 0);
    assert_eq!(stats.critical_error_count, 0);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_fix_disabled_leaves_ui_untouched() {
    let mut config = MonitorConfig::default();
    config.features.auto_fix = false;
    let h = start(config).await;
    h.host.detach_handler("settingsFab").unwrap();

    h.host.click("settingsFab").unwrap();
    advance_ms(5_100).await;

    assert_eq!(h.host.replacement_count("settingsFab"), 0);
    assert_eq!(h.monitor.remediation().attempts(SETTINGS_BUTTON), 0);
    h.handle.shutdown().await;
}
