//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use jh_core::ProjectKey;

use crate::Config;

/// Jira issue history exporter.
///
/// Reconstructs per-field timelines from Jira changelogs and exports them
/// as CSV, one row per field transition.
#[derive(Debug, Parser)]
#[command(name = "jh", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export the change history of a project's issues to CSV.
    Fetch(FetchArgs),

    /// Check that Jira accepts the configured credentials.
    Check,

    /// Serve the fetch and download endpoints over HTTP.
    Serve {
        /// Address to listen on (e.g., 127.0.0.1:5000).
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Arguments of `jh fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Jira project key (e.g., ABC).
    pub project_key: ProjectKey,

    /// Directory the CSV file is written to.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of issues to fetch.
    #[arg(long)]
    pub max_issues: Option<usize>,

    /// Number of changelogs fetched in parallel.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort on the first issue whose changelog cannot be fetched.
    #[arg(long)]
    pub fail_fast: bool,

    /// Give up on the whole run after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl FetchArgs {
    /// Overrides configured values with the ones given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output_dir.clone_from(dir);
        }
        if let Some(max) = self.max_issues {
            config.max_issues = max;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.fail_fast {
            config.fail_fast = true;
        }
        if let Some(secs) = self.timeout {
            config.run_timeout_secs = Some(secs);
        }
    }
}
