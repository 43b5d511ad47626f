//! Jira issue history exporter CLI library.
//!
//! This crate provides the CLI and HTTP interfaces of the exporter.

mod cli;
pub mod commands;
mod config;
pub mod pipeline;
pub mod server;

pub use cli::{Cli, Commands, FetchArgs};
pub use config::Config;
