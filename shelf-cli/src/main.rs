//! Command-line front end of the shelf lending-library catalog.
//!
//! Loads the configuration, initializes tracing, opens the configured store and runs a single
//! catalog command, printing its result as JSON on stdout.

use clap::Parser;
use shelf_config::load_config;
use shelf_config::shared::ShelfConfig;
use shelf_telemetry::tracing::init_tracing;

use crate::commands::Command;
use crate::core::run_with_config;

mod commands;
mod core;

#[derive(Parser, Debug)]
#[command(name = "shelf", version, about = "Lending-library catalog")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config::<ShelfConfig>()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    // Catalog mutations are sequential, a single thread is all the runtime needs.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run_with_config(config, args.command))?;

    Ok(())
}
