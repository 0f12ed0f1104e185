//! Water Auditor CLI: turn a photo of a water sample into a safety report.
//!
//! Runs visual analysis, risk mapping and resource research, then writes a
//! Markdown report with purification advice and curated links.

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
