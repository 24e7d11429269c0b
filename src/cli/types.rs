//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::serve::ServeArgs;

#[derive(Parser, Debug)]
#[command(name = "issue-tracker")]
#[command(about = "Project-scoped issue tracker REST API", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file used instead of ./issue-tracker.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),

    /// Print the resolved configuration as YAML
    Config,
}
