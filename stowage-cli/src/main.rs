//! Stowage CLI -- container image inventory and vulnerability scanning.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                  |
//! |------|------------------------------------------|
//! | 0    | Success                                  |
//! | 1    | General / command error                  |
//! | 2    | Configuration error                      |
//! | 3    | Runtime or scanner not available         |
//! | 10   | IO error                                 |
//! | 130  | Interrupted                              |

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use stowage_cli::cli::Cli;
use stowage_cli::error::CliError;
use stowage_cli::logging::init_tracing;
use stowage_cli::output::OutputWriter;
use stowage_core::config::StowageConfig;
use stowage_core::process::SystemCommandRunner;

const DEFAULT_CONFIG: &str = "stowage.toml";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            let code = u8::try_from(e.exit_code()).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => StowageConfig::load(path).await?,
        None => StowageConfig::load_or_default(DEFAULT_CONFIG).await?,
    };
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
        config.validate()?;
    }

    init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;
    stowage_core::metrics::describe_all();

    tracing::debug!(command = ?cli.command, "stowage starting");

    let runner = Arc::new(SystemCommandRunner::new());
    let writer = OutputWriter::new(cli.format);

    tokio::select! {
        result = stowage_cli::dispatch(cli.command, runner, &config, &writer) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, child processes are being terminated");
            Err(CliError::Interrupted)
        }
    }
}
