use std::sync::Arc;
use std::time::Duration;
use uihealth::config::{MonitorConfig, TrackerConfig};
use uihealth::host::InMemoryHost;
use uihealth::testing::MockTrackerServer;
use uihealth::tracker::GitHubTracker;
use uihealth::UiHealthMonitor;

fn fast_config(api_base: &str) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.timing.verification_delay_ms = 20;
    config.timing.health_check_interval_ms = 60_000;
    config.tracker = TrackerConfig {
        repo: "acme/desktop".into(),
        token: Some("ghp_flowtoken000000000000".into()),
        api_base: api_base.to_string(),
        timeout_secs: 5,
    };
    config
}

#[tokio::test]
async fn test_removed_modal_files_github_issue() {
    let server = MockTrackerServer::builder().build().await.unwrap();
    let config = fast_config(server.url());
    let tracker = Arc::new(GitHubTracker::new(&config.tracker).unwrap());
    let (host, feeds) = InMemoryHost::with_default_layout(&config.elements);

    let monitor = UiHealthMonitor::new(config, host.clone(), tracker).unwrap();
    let handle = monitor.initialize(feeds).await.unwrap();

    host.remove_element("settingsModal").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    let payload = requests[0].json().unwrap();
    assert_eq!(
        payload["title"],
        "[Auto-Detected] Critical UI element removed: settingsModal"
    );
    let body = payload["body"].as_str().unwrap();
    assert!(body.contains("Missing element: settingsModal"));
    assert!(!body.contains("ghp_flowtoken"));

    assert_eq!(monitor.get_statistics().critical_error_count, 1);
    handle.shutdown().await;
    server.stop().await;
}

#[tokio::test]
async fn test_tracker_failure_does_not_stop_monitoring() {
    let server = MockTrackerServer::builder()
        .with_error(500, r#"{"message":"Server Error"}"#)
        .build()
        .await
        .unwrap();
    let config = fast_config(server.url());
    let tracker = Arc::new(GitHubTracker::new(&config.tracker).unwrap());
    let (host, feeds) = InMemoryHost::with_default_layout(&config.elements);

    let monitor = UiHealthMonitor::new(config, host.clone(), tracker).unwrap();
    let handle = monitor.initialize(feeds).await.unwrap();

    host.remove_element("settingsModal").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Still verifying interactions after the failed submission
    host.click("chatFab").unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = monitor.get_statistics();
    assert_eq!(stats.verified_interactions, 1);
    assert_eq!(stats.issues_reported.len(), 1);
    assert_eq!(server.requests().await.len(), 1);

    handle.shutdown().await;
    server.stop().await;
}
