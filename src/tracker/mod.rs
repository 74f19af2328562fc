//! Issue-creation capability
//!
//! The reporter hands a fully assembled [`IssueRequest`] to an
//! [`IssueTracker`]. [`github::GitHubTracker`] files it through the GitHub
//! REST API; [`recording::RecordingTracker`] keeps it in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ReportError;

pub mod github;
pub mod recording;

pub use github::GitHubTracker;
pub use recording::RecordingTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Bug,
    Enhancement,
}

/// A structured report ready to be filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub kind: IssueKind,
    pub host_identity: String,
    pub app_version: String,
}

/// Tracker-side identity of a filed issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedIssue {
    pub issue_number: u64,
    pub issue_url: String,
}

/// Trait abstraction over the issue tracker, enabling test doubles.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// File one issue. Fails with [`ReportError::MissingCredential`] when no
    /// credential is configured.
    async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, ReportError>;
}
