use uihealth::config::TrackerConfig;
use uihealth::errors::ReportError;
use uihealth::testing::MockTrackerServer;
use uihealth::tracker::{GitHubTracker, IssueKind, IssueRequest, IssueTracker};

fn request() -> IssueRequest {
    IssueRequest {
        title: "[Auto-Detected] Core function missing: closeSettings".into(),
        body: "## Auto-Detected Issue\n\ndetails".into(),
        labels: vec!["auto-detected".into(), "ui-health-monitor".into()],
        kind: IssueKind::Bug,
        host_identity: "integration-host".into(),
        app_version: "3.1.0".into(),
    }
}

fn tracker(server: &MockTrackerServer, token: Option<&str>) -> GitHubTracker {
    GitHubTracker::new(&TrackerConfig {
        repo: "acme/desktop".into(),
        token: token.map(String::from),
        api_base: server.url().to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_issue_posts_expected_payload() {
    let server = MockTrackerServer::builder()
        .with_created(17)
        .build()
        .await
        .unwrap();
    let tracker = tracker(&server, Some("ghp_integrationtoken000000"));

    let created = tracker.create_issue(&request()).await.unwrap();
    assert_eq!(created.issue_number, 17);
    assert_eq!(created.issue_url, "https://github.com/acme/desktop/issues/17");

    let requests = server.requests().await;
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/repos/acme/desktop/issues");
    assert_eq!(
        req.header("authorization"),
        Some("token ghp_integrationtoken000000")
    );
    assert_eq!(req.header("accept"), Some("application/vnd.github.v3+json"));

    let payload = req.json().unwrap();
    assert_eq!(payload["title"], request().title);
    assert_eq!(
        payload["labels"],
        serde_json::json!(["auto-detected", "ui-health-monitor", "bug"])
    );
    let body = payload["body"].as_str().unwrap();
    assert!(body.contains("## Auto-Detected Issue"));
    assert!(body.contains("**App Version:** 3.1.0"));

    server.stop().await;
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = MockTrackerServer::builder().build().await.unwrap();
    let tracker = tracker(&server, None);

    let err = tracker.create_issue(&request()).await.unwrap_err();
    assert_eq!(err, ReportError::MissingCredential);
    assert!(server.requests().await.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_http_error_surfaces_status_and_body() {
    let server = MockTrackerServer::builder()
        .with_error(401, r#"{"message":"Bad credentials"}"#)
        .build()
        .await
        .unwrap();
    let tracker = tracker(&server, Some("ghp_badtoken00000000000000"));

    match tracker.create_issue(&request()).await {
        Err(ReportError::HttpStatus { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Bad credentials"));
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }
    assert_eq!(server.requests().await.len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_response_is_parse_error() {
    let server = MockTrackerServer::builder()
        .with_malformed("not json")
        .build()
        .await
        .unwrap();
    let tracker = tracker(&server, Some("ghp_token0000000000000000"));

    let err = tracker.create_issue(&request()).await.unwrap_err();
    assert!(matches!(err, ReportError::Parse(_)));

    server.stop().await;
}

#[tokio::test]
async fn test_unreachable_tracker_is_network_error() {
    let server = MockTrackerServer::builder().build().await.unwrap();
    let url = server.url().to_string();
    server.stop().await;

    let tracker = GitHubTracker::new(&TrackerConfig {
        repo: "acme/desktop".into(),
        token: Some("ghp_token0000000000000000".into()),
        api_base: url,
        timeout_secs: 2,
    })
    .unwrap();

    let err = tracker.create_issue(&request()).await.unwrap_err();
    assert!(matches!(err, ReportError::Network(_)));
}
