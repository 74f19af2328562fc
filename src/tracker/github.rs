//! GitHub Issues tracker
//!
//! Files reports with `POST /repos/{owner}/{repo}/issues` using token auth.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{CreatedIssue, IssueKind, IssueRequest, IssueTracker};
use crate::config::TrackerConfig;
use crate::errors::ReportError;
use crate::observability::telemetry::sanitize_for_log;

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    html_url: String,
}

/// GitHub Issues client. One POST per issue, no retry.
pub struct GitHubTracker {
    client: Client,
    api_base: String,
    repo: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubTracker")
            .field("api_base", &self.api_base)
            .field("repo", &self.repo)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl GitHubTracker {
    pub fn new(config: &TrackerConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("uihealth/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReportError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_base, self.repo)
    }

    /// Body sent to GitHub: the reporter's body plus a system information block.
    pub fn render_body(request: &IssueRequest) -> String {
        format!(
            "## Issue Description\n\n{}\n\n---\n\n## System Information\n\n\
             - **App Version:** {}\n\
             - **Host:** {}\n\
             - **Platform:** {}\n\
             - **Reported via:** UI health monitor\n",
            request.body,
            request.app_version,
            request.host_identity,
            std::env::consts::OS,
        )
    }

    fn labels(request: &IssueRequest) -> Vec<String> {
        let mut labels = request.labels.clone();
        let kind = match request.kind {
            IssueKind::Bug => "bug",
            IssueKind::Enhancement => "enhancement",
        };
        if !labels.iter().any(|l| l == kind) {
            labels.push(kind.to_string());
        }
        labels
    }
}

#[async_trait]
impl IssueTracker for GitHubTracker {
    async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, ReportError> {
        let token = self.token.as_ref().ok_or(ReportError::MissingCredential)?;

        let payload = serde_json::json!({
            "title": request.title,
            "body": Self::render_body(request),
            "labels": Self::labels(request),
        });

        let url = self.issues_url();
        info!(title = %sanitize_for_log(&request.title), "Creating GitHub issue");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReportError::Network(e.to_string()))?;

        if status != StatusCode::CREATED {
            error!(status = status.as_u16(), "GitHub API error");
            return Err(ReportError::HttpStatus {
                status: status.as_u16(),
                message: text,
            });
        }

        let issue: GitHubIssue =
            serde_json::from_str(&text).map_err(|e| ReportError::Parse(e.to_string()))?;
        info!(number = issue.number, "GitHub issue created");

        Ok(CreatedIssue {
            issue_number: issue.number,
            issue_url: issue.html_url,
        })
    }
}
