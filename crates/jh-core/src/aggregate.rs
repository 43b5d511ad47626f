//! Project-wide aggregation of issue timelines.
//!
//! Lists a project's issues, fetches each changelog, and reconstructs one
//! [`IssueHistory`] per issue. Issues keep the order the tracker returned
//! them in, even when changelogs are fetched concurrently.

use std::future::Future;

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use crate::issue::{ChangeEvent, Issue};
use crate::sentinel::{NONE, UNASSIGNED};
use crate::timeline::{TimelineRecord, TimelineWarning, reconstruct};
use crate::timestamp::{Timestamp, parse_timestamp};
use crate::tracker::{IssueTracker, TrackerError};
use crate::types::{IssueKey, ProjectKey};

/// Default cap on the number of issues fetched per project.
pub const DEFAULT_MAX_ISSUES: usize = 100;

/// What to do when a single issue's changelog cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure and continue with the remaining issues.
    #[default]
    Collect,
    /// Abort the whole run.
    Abort,
}

/// Options for [`aggregate`].
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Maximum number of issues to fetch.
    pub max_issues: usize,
    /// Maximum number of changelog fetches in flight. `1` is sequential.
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    /// Every tracker call must finish before this instant.
    pub deadline: Option<Instant>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_issues: DEFAULT_MAX_ISSUES,
            concurrency: 1,
            failure_policy: FailurePolicy::default(),
            deadline: None,
        }
    }
}

/// An issue's exported metadata together with its timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueHistory {
    pub key: IssueKey,
    pub summary: String,
    /// Assignee display name, or [`UNASSIGNED`].
    pub assignee: String,
    pub issue_type: String,
    /// Parent issue key, or [`NONE`].
    pub parent: String,
    /// Creation timestamp used for the synthetic `created` record.
    pub created: Option<Timestamp>,
    pub records: Vec<TimelineRecord>,
}

impl IssueHistory {
    /// Reconstructs an issue's timeline and applies metadata defaults.
    pub fn assemble(issue: Issue, events: &[ChangeEvent]) -> (Self, Vec<TimelineWarning>) {
        let mut warnings = Vec::new();
        let created = issue
            .created
            .as_deref()
            .filter(|value| !value.is_empty())
            .and_then(|value| match parse_timestamp(value) {
                Ok(ts) => Some(ts),
                Err(_) => {
                    warnings.push(TimelineWarning::InvalidCreated {
                        value: value.to_string(),
                    });
                    None
                }
            });

        let reconstruction = reconstruct(&issue.issue_type, created, events);
        warnings.extend(reconstruction.warnings);

        let history = Self {
            key: issue.key,
            summary: issue.summary,
            assignee: issue
                .assignee
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            issue_type: issue.issue_type,
            parent: issue.parent.map_or_else(|| NONE.to_string(), String::from),
            created: reconstruction.created,
            records: reconstruction.records,
        };
        (history, warnings)
    }
}

/// A timeline warning attributed to its issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueWarning {
    pub issue_key: IssueKey,
    pub warning: TimelineWarning,
}

/// An issue whose changelog could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFailure {
    pub issue_key: IssueKey,
    pub error: String,
}

/// Everything one aggregation run produced.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub project: ProjectKey,
    /// Issues in tracker order.
    pub issues: Vec<IssueHistory>,
    pub warnings: Vec<IssueWarning>,
    /// Issues skipped under [`FailurePolicy::Collect`].
    pub failures: Vec<IssueFailure>,
}

impl AggregateReport {
    /// Looks up an issue by key.
    pub fn get(&self, key: &IssueKey) -> Option<&IssueHistory> {
        self.issues.iter().find(|issue| &issue.key == key)
    }

    /// Total number of timeline records across all issues.
    pub fn record_count(&self) -> usize {
        self.issues.iter().map(|issue| issue.records.len()).sum()
    }
}

/// Errors that end an aggregation run.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to list issues of project {project}")]
    ListIssues {
        project: ProjectKey,
        #[source]
        source: TrackerError,
    },
    #[error("failed to fetch changelog of {issue_key}")]
    ChangeHistory {
        issue_key: IssueKey,
        #[source]
        source: TrackerError,
    },
    #[error("deadline exceeded while {during}")]
    DeadlineExceeded { during: String },
}

async fn within<T>(
    deadline: Option<Instant>,
    during: impl FnOnce() -> String,
    fut: impl Future<Output = T>,
) -> Result<T, AggregateError> {
    match deadline {
        None => Ok(fut.await),
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| AggregateError::DeadlineExceeded { during: during() }),
    }
}

/// Builds the timeline of every issue in a project.
pub async fn aggregate(
    tracker: &dyn IssueTracker,
    project: &ProjectKey,
    options: &AggregateOptions,
) -> Result<AggregateReport, AggregateError> {
    let issues = within(
        options.deadline,
        || format!("listing issues of {project}"),
        tracker.list_issues(project, options.max_issues),
    )
    .await?
    .map_err(|source| AggregateError::ListIssues {
        project: project.clone(),
        source,
    })?;
    tracing::info!(project = %project, issues = issues.len(), "fetched issues");

    let deadline = options.deadline;
    let fetches = stream::iter(issues)
        .map(|issue| async move {
            let history = within(
                deadline,
                || format!("fetching changelog of {}", issue.key),
                tracker.change_history(&issue.key),
            )
            .await;
            (issue, history)
        })
        .buffered(options.concurrency.max(1));
    let mut fetches = std::pin::pin!(fetches);

    let mut report = AggregateReport {
        project: project.clone(),
        issues: Vec::new(),
        warnings: Vec::new(),
        failures: Vec::new(),
    };

    while let Some((issue, history)) = fetches.next().await {
        match history? {
            Ok(events) => {
                let key = issue.key.clone();
                let (history, warnings) = IssueHistory::assemble(issue, &events);
                for warning in warnings {
                    tracing::warn!(issue = %key, %warning, "changelog parse warning");
                    report.warnings.push(IssueWarning {
                        issue_key: key.clone(),
                        warning,
                    });
                }
                tracing::debug!(
                    issue = %key,
                    events = events.len(),
                    records = history.records.len(),
                    "reconstructed timeline"
                );
                report.issues.push(history);
            }
            Err(source) => match options.failure_policy {
                FailurePolicy::Abort => {
                    return Err(AggregateError::ChangeHistory {
                        issue_key: issue.key,
                        source,
                    });
                }
                FailurePolicy::Collect => {
                    tracing::warn!(
                        issue = %issue.key,
                        error = %source,
                        "failed to fetch changelog, continuing"
                    );
                    report.failures.push(IssueFailure {
                        issue_key: issue.key,
                        error: source.to_string(),
                    });
                }
            },
        }
    }

    Ok(report)
}
