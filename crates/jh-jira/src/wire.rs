//! Jira REST v2 response shapes and their conversion to core types.

use serde::Deserialize;

use jh_core::{ChangeEvent, FieldTransition, Issue, IssueKey};

use crate::JiraError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub start_at: usize,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub issues: Vec<WireIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireIssue {
    key: String,
    #[serde(default)]
    fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    summary: Option<String>,
    assignee: Option<UserField>,
    issuetype: Option<NamedField>,
    parent: Option<ParentField>,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserField {
    pub display_name: Option<String>,
    pub name: Option<String>,
}

impl UserField {
    pub fn label(self) -> Option<String> {
        self.display_name
            .filter(|n| !n.is_empty())
            .or(self.name.filter(|n| !n.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct NamedField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ParentField {
    key: String,
}

impl WireIssue {
    pub fn into_issue(self) -> Result<Issue, JiraError> {
        let key = IssueKey::new(self.key)
            .map_err(|e| JiraError::InvalidResponse(format!("issue with {e}")))?;
        let parent = self
            .fields
            .parent
            .map(|p| IssueKey::new(p.key))
            .transpose()
            .map_err(|e| JiraError::InvalidResponse(format!("parent of {key}: {e}")))?;

        Ok(Issue {
            summary: self.fields.summary.unwrap_or_default(),
            assignee: self.fields.assignee.and_then(UserField::label),
            issue_type: self
                .fields
                .issuetype
                .map(|t| t.name)
                .unwrap_or_default(),
            parent,
            created: self.fields.created,
            key,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IssueWithChangelog {
    #[serde(default)]
    changelog: Option<Changelog>,
}

#[derive(Debug, Deserialize)]
struct Changelog {
    #[serde(default)]
    histories: Vec<History>,
}

#[derive(Debug, Deserialize)]
struct History {
    created: String,
    #[serde(default)]
    items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
struct HistoryItem {
    field: String,
    #[serde(rename = "fromString")]
    from_value: Option<String>,
    #[serde(rename = "toString")]
    to_value: Option<String>,
}

impl IssueWithChangelog {
    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.changelog
            .map(|c| c.histories)
            .unwrap_or_default()
            .into_iter()
            .map(|history| ChangeEvent {
                created: history.created,
                items: history
                    .items
                    .into_iter()
                    .map(|item| FieldTransition {
                        field: item.field,
                        from: item.from_value,
                        to: item.to_value,
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Extracts Jira's `errorMessages`/`errors` from an error body.
pub(crate) fn error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ErrorBody {
        #[serde(default)]
        error_messages: Vec<String>,
        #[serde(default)]
        errors: std::collections::BTreeMap<String, String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let messages: Vec<String> = parsed
        .error_messages
        .into_iter()
        .chain(
            parsed
                .errors
                .into_iter()
                .map(|(field, message)| format!("{field}: {message}")),
        )
        .collect();
    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"{
        "startAt": 0,
        "maxResults": 100,
        "total": 2,
        "issues": [
            {
                "key": "ABC-1",
                "fields": {
                    "summary": "Login fails",
                    "assignee": {"name": "ada", "displayName": "Ada Lovelace"},
                    "issuetype": {"name": "Bug"},
                    "created": "2024-01-01T00:00:00.000+0000"
                }
            },
            {
                "key": "ABC-2",
                "fields": {
                    "summary": "Write docs",
                    "assignee": null,
                    "issuetype": {"name": "Sub-task"},
                    "parent": {"key": "ABC-1", "fields": {"summary": "Login fails"}}
                }
            }
        ]
    }"#;

    #[test]
    fn search_page_converts_to_issues() {
        let page: SearchResponse = serde_json::from_str(SEARCH_PAGE).unwrap();
        assert_eq!(page.total, Some(2));

        let issues: Vec<Issue> = page
            .issues
            .into_iter()
            .map(|i| i.into_issue().unwrap())
            .collect();

        assert_eq!(issues[0].key.as_str(), "ABC-1");
        assert_eq!(issues[0].assignee.as_deref(), Some("Ada Lovelace"));
        assert_eq!(issues[0].issue_type, "Bug");
        assert_eq!(issues[0].parent, None);
        assert_eq!(
            issues[0].created.as_deref(),
            Some("2024-01-01T00:00:00.000+0000")
        );
        assert_eq!(issues[1].assignee, None);
        assert_eq!(issues[1].parent.as_ref().map(IssueKey::as_str), Some("ABC-1"));
        assert_eq!(issues[1].created, None);
    }

    #[test]
    fn assignee_falls_back_to_username() {
        let user = UserField {
            display_name: Some(String::new()),
            name: Some("ada".to_string()),
        };
        assert_eq!(user.label().as_deref(), Some("ada"));
    }

    #[test]
    fn issue_without_key_is_rejected() {
        let wire: WireIssue = serde_json::from_str(r#"{"key": "", "fields": {}}"#).unwrap();
        let err = wire.into_issue().unwrap_err();
        assert!(matches!(err, JiraError::InvalidResponse(_)));
    }

    #[test]
    fn changelog_converts_in_source_order() {
        let body = r#"{
            "key": "ABC-1",
            "fields": {"created": "2024-01-01T00:00:00.000+0000"},
            "changelog": {
                "startAt": 0,
                "maxResults": 2,
                "total": 2,
                "histories": [
                    {
                        "id": "100",
                        "created": "2024-01-02T00:00:00.000+0000",
                        "items": [
                            {"field": "status", "fieldtype": "jira", "from": "1", "fromString": "Open", "to": "3", "toString": "In Progress"},
                            {"field": "assignee", "fieldtype": "jira", "from": null, "fromString": null, "to": "ada", "toString": "Ada Lovelace"}
                        ]
                    },
                    {
                        "id": "101",
                        "created": "2024-01-03T00:00:00.000+0000",
                        "items": [
                            {"field": "resolution", "fieldtype": "jira", "fromString": null, "toString": "Fixed"}
                        ]
                    }
                ]
            }
        }"#;
        let parsed: IssueWithChangelog = serde_json::from_str(body).unwrap();
        let events = parsed.into_events();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].created, "2024-01-02T00:00:00.000+0000");
        assert_eq!(
            events[0].items,
            vec![
                FieldTransition::new("status", Some("Open"), Some("In Progress")),
                FieldTransition::new("assignee", None, Some("Ada Lovelace")),
            ]
        );
        assert_eq!(events[1].items[0].field, "resolution");
    }

    #[test]
    fn missing_changelog_is_empty() {
        let parsed: IssueWithChangelog = serde_json::from_str(r#"{"key": "ABC-1"}"#).unwrap();
        assert!(parsed.into_events().is_empty());
    }

    #[test]
    fn error_message_joins_jira_errors() {
        let body = r#"{"errorMessages": ["The value 'NOPE' does not exist for the field 'project'."], "errors": {"jql": "bad"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("The value 'NOPE' does not exist for the field 'project'.; jql: bad")
        );
    }

    #[test]
    fn error_message_ignores_non_jira_bodies() {
        assert_eq!(error_message("<html>Unauthorized</html>"), None);
        assert_eq!(error_message(r#"{"errorMessages": []}"#), None);
    }
}
