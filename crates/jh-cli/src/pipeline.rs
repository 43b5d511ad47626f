//! One fetch run: aggregate a project's histories, then export them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::time::Instant;

use jh_core::{
    AggregateOptions, AggregateReport, HistoryRow, IssueTracker, ProjectKey, aggregate,
    export_rows, history_rows,
};

use crate::Config;

/// Settings shared by every run of a process.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub options: AggregateOptions,
    /// Budget of a whole run, counted from its start.
    pub run_timeout: Option<Duration>,
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            options: config.aggregate_options(),
            run_timeout: config.run_timeout(),
        }
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: AggregateReport,
    pub rows: Vec<HistoryRow>,
    pub export_path: PathBuf,
}

impl RunOutcome {
    /// Number of issues the tracker listed, including skipped ones.
    pub fn listed_count(&self) -> usize {
        self.report.issues.len() + self.report.failures.len()
    }
}

/// Fetches every issue of `project`, reconstructs the timelines and writes
/// the export file.
pub async fn run_project(
    tracker: &dyn IssueTracker,
    project: &ProjectKey,
    settings: &RunSettings,
) -> Result<RunOutcome> {
    let mut options = settings.options.clone();
    options.deadline = settings.run_timeout.map(|budget| Instant::now() + budget);

    let report = aggregate(tracker, project, &options)
        .await
        .with_context(|| format!("error fetching issues of project {project}"))?;

    let rows = history_rows(&report.issues);
    let export_path = export_rows(
        &rows,
        project,
        &settings.output_dir,
        Local::now().naive_local(),
    )
    .context("error exporting to CSV")?;

    Ok(RunOutcome {
        report,
        rows,
        export_path,
    })
}
