//! Fetch command: export a project's change history to CSV.

use std::io::Write;

use anyhow::{Context, Result};

use jh_core::{IssueTracker, ProjectKey};

use crate::pipeline::{RunSettings, run_project};

pub async fn run<W: Write>(
    writer: &mut W,
    tracker: &dyn IssueTracker,
    project: &ProjectKey,
    settings: &RunSettings,
) -> Result<()> {
    let user = tracker
        .authenticate()
        .await
        .context("error authenticating with Jira")?;
    tracing::info!(%user, "authenticated");

    let outcome = run_project(tracker, project, settings).await?;

    writeln!(
        writer,
        "Fetched {} of {} issues of {project}",
        outcome.report.issues.len(),
        outcome.listed_count()
    )?;
    writeln!(
        writer,
        "Exported {} rows to {}",
        outcome.rows.len(),
        outcome.export_path.display()
    )?;

    if !outcome.report.warnings.is_empty() {
        writeln!(
            writer,
            "{} changelog entries could not be fully parsed (run with -v for details)",
            outcome.report.warnings.len()
        )?;
    }

    if !outcome.report.failures.is_empty() {
        writeln!(writer, "Skipped issues:")?;
        for failure in &outcome.report.failures {
            writeln!(writer, "- {}: {}", failure.issue_key, failure.error)?;
        }
    }

    Ok(())
}
