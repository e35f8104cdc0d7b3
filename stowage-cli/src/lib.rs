//! Stowage CLI library
//!
//! The binary in `main.rs` only parses arguments, loads configuration,
//! and hands off to [`dispatch`]. Everything else lives here so the
//! command handlers can be driven from tests with a scripted runner.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

use std::sync::Arc;

use stowage_core::config::StowageConfig;
use stowage_core::process::CommandRunner;

use crate::cli::Commands;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Route a parsed subcommand to its handler.
pub async fn dispatch<R: CommandRunner>(
    command: Commands,
    runner: Arc<R>,
    config: &StowageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match command {
        Commands::Probe => commands::probe::execute(runner.as_ref(), config, writer).await,
        Commands::Inventory(args) => {
            commands::inventory::execute(args, runner, config, writer).await
        }
        Commands::Scan(args) => commands::scan::execute(args, runner, config, writer).await,
    }
}
