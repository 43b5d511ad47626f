//! Check command for verifying Jira credentials.

use std::io::Write;

use anyhow::{Context, Result};

use jh_core::IssueTracker;

pub async fn run<W: Write>(writer: &mut W, tracker: &dyn IssueTracker) -> Result<()> {
    let user = tracker
        .authenticate()
        .await
        .context("error authenticating with Jira")?;
    writeln!(writer, "Authenticated as {user}")?;
    Ok(())
}
