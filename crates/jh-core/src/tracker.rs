//! The seam between the aggregator and an issue-tracking service.

use async_trait::async_trait;
use thiserror::Error;

use crate::issue::{ChangeEvent, Issue};
use crate::types::{IssueKey, ProjectKey};

/// Errors reported by an [`IssueTracker`].
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker rejected the configured credentials.
    #[error("tracker rejected credentials: {0}")]
    Unauthorized(String),
    /// The requested resource does not exist (or is not visible).
    #[error("not found: {0}")]
    NotFound(String),
    /// The tracker answered with an error status.
    #[error("tracker returned status {status}: {message}")]
    Api { status: u16, message: String },
    /// The tracker's response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The request never produced a response.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// Read access to an issue tracker.
///
/// Implementations are expected to be authenticated already; the
/// aggregator only reads.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Verifies the credentials and returns the authenticated user's
    /// display name.
    async fn authenticate(&self) -> Result<String, TrackerError>;

    /// Lists at most `limit` issues of a project, in the tracker's order.
    async fn list_issues(
        &self,
        project: &ProjectKey,
        limit: usize,
    ) -> Result<Vec<Issue>, TrackerError>;

    /// Returns an issue's changelog, oldest entry first.
    async fn change_history(&self, issue: &IssueKey) -> Result<Vec<ChangeEvent>, TrackerError>;
}
