//! Flat CSV export of aggregated issue histories.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::aggregate::IssueHistory;
use crate::timestamp::format_timestamp;
use crate::types::ProjectKey;

/// Column names of the export file, in order.
pub const HEADER: [&str; 11] = [
    "Issue Key",
    "Summary",
    "Assignee",
    "Issue Type",
    "Parent Issue",
    "Created Date",
    "Field",
    "From",
    "To",
    "Changed At",
    "Duration",
];

/// Prefix shared by every export filename.
pub const FILENAME_PREFIX: &str = "All_Issues_History_";

/// Errors from writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write CSV")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV")]
    Flush(#[source] io::Error),
}

/// One exported row: an issue's metadata joined with one timeline record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub issue_key: String,
    pub summary: String,
    pub assignee: String,
    pub issue_type: String,
    pub parent_issue: String,
    pub created: String,
    pub field: String,
    pub from: String,
    pub to: String,
    pub changed_at: String,
    pub duration: String,
}

impl HistoryRow {
    fn as_record(&self) -> [&str; 11] {
        [
            self.issue_key.as_str(),
            self.summary.as_str(),
            self.assignee.as_str(),
            self.issue_type.as_str(),
            self.parent_issue.as_str(),
            self.created.as_str(),
            self.field.as_str(),
            self.from.as_str(),
            self.to.as_str(),
            self.changed_at.as_str(),
            self.duration.as_str(),
        ]
    }
}

/// Flattens histories into rows, one per timeline record.
///
/// Issues without any records contribute no rows.
pub fn history_rows(issues: &[IssueHistory]) -> Vec<HistoryRow> {
    let mut rows = Vec::new();
    for issue in issues {
        if issue.records.is_empty() {
            tracing::debug!(issue = %issue.key, "no changelog, issue omitted from export");
            continue;
        }
        let created = format_timestamp(issue.created.as_ref());
        rows.extend(issue.records.iter().map(|record| HistoryRow {
            issue_key: issue.key.to_string(),
            summary: issue.summary.clone(),
            assignee: issue.assignee.clone(),
            issue_type: issue.issue_type.clone(),
            parent_issue: issue.parent.clone(),
            created: created.clone(),
            field: record.field.clone(),
            from: record.from.clone(),
            to: record.to.clone(),
            changed_at: format_timestamp(record.changed_at.as_ref()),
            duration: record.hold.to_string(),
        }));
    }
    rows
}

/// Name of the export file for a project run started at `at`.
pub fn export_filename(project: &ProjectKey, at: NaiveDateTime) -> String {
    format!("{FILENAME_PREFIX}{project}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Writes the header and `rows` as CSV.
pub fn write_csv<W: Write>(writer: W, rows: &[HistoryRow]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for row in rows {
        csv.write_record(row.as_record())?;
    }
    csv.flush().map_err(ExportError::Flush)?;
    Ok(())
}

/// Writes an export file for `issues` into `dir` and returns its path.
///
/// A run finishing in the same second as a previous one overwrites it.
pub fn export_csv(
    issues: &[IssueHistory],
    project: &ProjectKey,
    dir: &Path,
    at: NaiveDateTime,
) -> Result<PathBuf, ExportError> {
    export_rows(&history_rows(issues), project, dir, at)
}

/// Writes already flattened rows into `dir` and returns the file's path.
pub fn export_rows(
    rows: &[HistoryRow],
    project: &ProjectKey,
    dir: &Path,
    at: NaiveDateTime,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(export_filename(project, at));
    let file = File::create(&path).map_err(|source| ExportError::Create {
        path: path.clone(),
        source,
    })?;

    write_csv(BufWriter::new(file), rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote export");
    Ok(path)
}
