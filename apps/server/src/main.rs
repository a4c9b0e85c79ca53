//! paperdigest server — daily arXiv digest API.
//!
//! Discovers recent papers per category, ranks and enriches the most
//! interesting ones with an LLM, and serves the results with daily caching.

mod commands;
mod routes;

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
