use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use jh_cli::commands::{check, fetch, serve};
use jh_cli::pipeline::RunSettings;
use jh_cli::{Cli, Commands, Config};
use jh_jira::JiraClient;

/// Builds a Jira client from the configured credentials.
fn jira_client(config: &Config) -> Result<JiraClient> {
    let (url, token) = config.credentials()?;
    tracing::debug!(url, "using Jira instance");
    JiraClient::with_timeout(url, token, config.request_timeout())
        .context("failed to create Jira client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Logs go to stderr so stdout stays clean for command output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match command {
        Commands::Fetch(args) => {
            args.apply(&mut config);
            let client = jira_client(&config)?;
            let settings = RunSettings::from(&config);
            fetch::run(&mut std::io::stdout(), &client, &args.project_key, &settings).await?;
        }
        Commands::Check => {
            let client = jira_client(&config)?;
            check::run(&mut std::io::stdout(), &client).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind.clone_from(bind);
            }
            let client = jira_client(&config)?;
            serve::run(&config.bind, Arc::new(client), RunSettings::from(&config)).await?;
        }
    }

    Ok(())
}
