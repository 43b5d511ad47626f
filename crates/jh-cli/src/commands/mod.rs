//! CLI subcommand implementations.

pub mod check;
pub mod fetch;
pub mod serve;
