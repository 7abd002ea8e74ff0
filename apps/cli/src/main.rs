//! Carton CLI: compose stored assemblies into deployable cartons.
//!
//! Loads assembly records from the record store, resolves their components,
//! prints the composed carton, and writes status and output changes back.

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
