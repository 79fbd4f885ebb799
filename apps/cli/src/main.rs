//! Bambot CLI: reads failed Bamboo builds and tells their owners why they
//! failed.
//!
//! Scans the server's activity feed, classifies each unexplained failure's
//! log against known signatures, and posts the cause with a log snippet as
//! a build comment.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
