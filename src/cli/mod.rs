//! Command-line interface.

pub mod commands;
pub mod types;

pub use types::{Cli, Commands};

use anyhow::Result;
use std::path::Path;

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from `path` when given, else from the default layers.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Run a parsed command line to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Config => commands::config::execute(&config),
    }
}
