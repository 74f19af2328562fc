//! In-process issue tracker
//!
//! Keeps every submitted request. On its own it numbers issues locally; in
//! forwarding mode it hands each request to another tracker and records the
//! titles that tracker accepted.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{CreatedIssue, IssueRequest, IssueTracker};
use crate::errors::ReportError;

#[derive(Debug, Default)]
struct Inner {
    requests: Vec<IssueRequest>,
    filed: Vec<String>,
    failure: Option<ReportError>,
}

/// In-process tracker that keeps every request.
///
/// Used for dry runs and as a test double. Requests are stored even when a
/// failure is configured, so callers can assert on what was attempted.
#[derive(Default)]
pub struct RecordingTracker {
    inner: Mutex<Inner>,
    forward: Option<Arc<dyn IssueTracker>>,
}

impl std::fmt::Debug for RecordingTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingTracker")
            .field("inner", &self.inner)
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record requests, then file them through `tracker`.
    pub fn forwarding(tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            inner: Mutex::default(),
            forward: Some(tracker),
        }
    }

    /// Fail every subsequent submission with `error`.
    pub fn fail_with(&self, error: ReportError) {
        self.inner.lock().failure = Some(error);
    }

    pub fn succeed(&self) {
        self.inner.lock().failure = None;
    }

    pub fn requests(&self) -> Vec<IssueRequest> {
        self.inner.lock().requests.clone()
    }

    /// Titles of requests that resulted in a created issue.
    pub fn filed_titles(&self) -> Vec<String> {
        self.inner.lock().filed.clone()
    }
}

#[async_trait]
impl IssueTracker for RecordingTracker {
    async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, ReportError> {
        let number = {
            let mut inner = self.inner.lock();
            inner.requests.push(request.clone());
            if let Some(err) = &inner.failure {
                return Err(err.clone());
            }
            inner.requests.len() as u64
        };

        let created = match &self.forward {
            Some(tracker) => tracker.create_issue(request).await?,
            None => CreatedIssue {
                issue_number: number,
                issue_url: format!("memory://issues/{}", number),
            },
        };
        self.inner.lock().filed.push(request.title.clone());
        Ok(created)
    }
}
