//! Issue tracker entry point.

use clap::Parser;

use issue_tracker::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
