//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use stowage_core::types::RuntimeFilter;

/// Stowage -- container image inventory and vulnerability scanning
/// across Docker and Podman.
///
/// Use `stowage <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "stowage", version, about, long_about = None)]
pub struct Cli {
    /// Path to the stowage.toml configuration file.
    ///
    /// Defaults to `stowage.toml` in the current directory; a missing default
    /// file is not an error.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

/// Container runtime selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RuntimeArg {
    Docker,
    Podman,
    #[default]
    All,
}

impl From<RuntimeArg> for RuntimeFilter {
    fn from(arg: RuntimeArg) -> Self {
        match arg {
            RuntimeArg::Docker => RuntimeFilter::Docker,
            RuntimeArg::Podman => RuntimeFilter::Podman,
            RuntimeArg::All => RuntimeFilter::All,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which container runtimes and scanner are installed.
    Probe,

    /// List container images.
    Inventory(InventoryArgs),

    /// Scan container images for vulnerabilities.
    Scan(ScanArgs),
}

// ---- inventory ----

/// List images from the selected runtimes and optionally save them.
#[derive(Args, Debug, Default)]
pub struct InventoryArgs {
    /// Runtime to inventory.
    #[arg(short, long, value_enum, default_value = "all")]
    pub runtime: RuntimeArg,

    /// Save the inventory to this JSON file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of replacing it.
    #[arg(short, long, requires = "output")]
    pub append: bool,
}

// ---- scan ----

/// Scan one image, or every image in the inventory.
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Runtime whose images are scanned.
    #[arg(short, long, value_enum, default_value = "all")]
    pub runtime: RuntimeArg,

    /// Image ID or repository:tag to scan (default: all images).
    #[arg(short, long)]
    pub image: Option<String>,

    /// Save scan results to this JSON file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output files instead of replacing them.
    #[arg(short, long)]
    pub append: bool,

    /// Also save the inventory used for the scan to this JSON file.
    #[arg(long)]
    pub inventory_output: Option<PathBuf>,
}
