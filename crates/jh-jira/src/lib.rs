//! Jira REST client for the issue history exporter.
//!
//! Talks to Jira Server / Data Center's REST API v2 with a personal access
//! token and implements [`IssueTracker`] for the aggregator.

mod wire;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use thiserror::Error;

use jh_core::{ChangeEvent, Issue, IssueKey, IssueTracker, ProjectKey, TrackerError};

use crate::wire::{IssueWithChangelog, SearchResponse, UserField};

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues requested per search page.
pub const PAGE_SIZE: usize = 100;

const SEARCH_FIELDS: &str = "summary,assignee,issuetype,parent,created";

/// Jira client errors.
#[derive(Debug, Error)]
pub enum JiraError {
    /// The base URL was empty or not HTTP(S).
    #[error("invalid Jira URL: {reason}")]
    InvalidUrl { reason: &'static str },
    /// The provided access token was invalid.
    #[error("invalid access token: {reason}")]
    InvalidToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Jira rejected the credentials.
    #[error("authentication failed (status {status}): {message}")]
    Unauthorized { status: u16, message: String },
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Jira returned an error response.
    #[error("Jira API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<JiraError> for TrackerError {
    fn from(err: JiraError) -> Self {
        match err {
            JiraError::Unauthorized { message, .. } => Self::Unauthorized(message),
            JiraError::NotFound(resource) => Self::NotFound(resource),
            JiraError::Api { status, message } => Self::Api { status, message },
            JiraError::InvalidResponse(message) => Self::InvalidResponse(message),
            other => Self::Transport(Box::new(other)),
        }
    }
}

/// Jira REST API client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    /// Creates a client with the default request timeout.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, JiraError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or not HTTP(S), if the token is
    /// empty or whitespace-only, or if the HTTP client fails to build.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, JiraError> {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(JiraError::InvalidUrl {
                reason: "URL cannot be empty",
            });
        }
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(JiraError::InvalidUrl {
                reason: "URL must start with http:// or https://",
            });
        }

        let token = token.into();
        if token.trim().is_empty() {
            return Err(JiraError::InvalidToken {
                reason: "token cannot be empty or whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(JiraError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            token,
        })
    }

    /// The normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the display name of the authenticated user.
    pub async fn current_user(&self) -> Result<String, JiraError> {
        let user: UserField = self.get("/rest/api/2/myself", &[]).await?;
        user.label()
            .ok_or_else(|| JiraError::InvalidResponse("user without a name".to_string()))
    }

    /// Lists up to `limit` issues of a project, oldest first, following
    /// search pagination.
    pub async fn search_issues(
        &self,
        project: &ProjectKey,
        limit: usize,
    ) -> Result<Vec<Issue>, JiraError> {
        let jql = search_jql(project);
        let mut issues = Vec::new();

        while issues.len() < limit {
            let page_size = PAGE_SIZE.min(limit - issues.len());
            let page: SearchResponse = self
                .get(
                    "/rest/api/2/search",
                    &[
                        ("jql", jql.clone()),
                        ("startAt", issues.len().to_string()),
                        ("maxResults", page_size.to_string()),
                        ("fields", SEARCH_FIELDS.to_string()),
                    ],
                )
                .await?;

            let fetched = page.issues.len();
            tracing::debug!(
                project = %project,
                start_at = page.start_at,
                fetched,
                total = ?page.total,
                "fetched search page"
            );
            for issue in page.issues {
                issues.push(issue.into_issue()?);
            }

            let exhausted = fetched == 0
                || page
                    .total
                    .map_or(fetched < page_size, |total| issues.len() >= total);
            if exhausted {
                break;
            }
        }

        issues.truncate(limit);
        Ok(issues)
    }

    /// Returns an issue's changelog, oldest entry first.
    pub async fn issue_changelog(&self, issue: &IssueKey) -> Result<Vec<ChangeEvent>, JiraError> {
        let path = format!("/rest/api/2/issue/{issue}");
        let body: IssueWithChangelog = self
            .get(&path, &[("expand", "changelog".to_string())])
            .await?;
        Ok(body.into_events())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, JiraError> {
        let url = format!("{}{path}", self.base_url);
        tracing::trace!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_failure(status, &body, path));
        }

        serde_json::from_str(&body).map_err(|err| JiraError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn authenticate(&self) -> Result<String, TrackerError> {
        Ok(self.current_user().await?)
    }

    async fn list_issues(
        &self,
        project: &ProjectKey,
        limit: usize,
    ) -> Result<Vec<Issue>, TrackerError> {
        Ok(self.search_issues(project, limit).await?)
    }

    async fn change_history(&self, issue: &IssueKey) -> Result<Vec<ChangeEvent>, TrackerError> {
        Ok(self.issue_changelog(issue).await?)
    }
}

fn search_jql(project: &ProjectKey) -> String {
    format!("project = \"{project}\" ORDER BY created ASC")
}

fn classify_failure(status: StatusCode, body: &str, resource: &str) -> JiraError {
    let message = wire::error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => JiraError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => JiraError::NotFound(format!("{resource}: {message}")),
        _ => JiraError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
