//! Serve command for the HTTP endpoints.

use std::sync::Arc;

use anyhow::Result;

use jh_core::IssueTracker;

use crate::pipeline::RunSettings;
use crate::server::{self, AppState};

pub async fn run(bind: &str, tracker: Arc<dyn IssueTracker>, settings: RunSettings) -> Result<()> {
    tracing::info!(output_dir = %settings.output_dir.display(), "exports are written here");
    server::serve(bind, AppState::new(tracker, settings)).await
}
