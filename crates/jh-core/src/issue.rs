//! Raw issue data as supplied by a tracker.

use serde::{Deserialize, Serialize};

use crate::types::IssueKey;

/// An issue and the metadata exported alongside its timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: IssueKey,
    pub summary: String,
    /// Display name of the assignee, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueKey>,
    /// Creation timestamp exactly as the tracker reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

/// One entry of an issue's changelog: every field the tracker recorded as
/// changing at a single instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Timestamp exactly as the tracker reported it.
    pub created: String,
    #[serde(default)]
    pub items: Vec<FieldTransition>,
}

/// A single field's old and new value within a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTransition {
    pub field: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl FieldTransition {
    pub fn new(field: impl Into<String>, from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            field: field.into(),
            from: from.map(String::from),
            to: to.map(String::from),
        }
    }
}
