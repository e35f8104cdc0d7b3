//! `stowage probe` command handler

use std::io::Write;

use serde::Serialize;

use stowage_core::config::StowageConfig;
use stowage_core::probe::ToolAvailability;
use stowage_core::process::CommandRunner;

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `probe` command.
pub async fn execute<R: CommandRunner>(
    runner: &R,
    config: &StowageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(runner, config).await;
    writer.render(&report)
}

/// Check each configured tool.
pub async fn run<R: CommandRunner>(runner: &R, config: &StowageConfig) -> ProbeReport {
    let availability = ToolAvailability::probe(runner, config).await;
    ProbeReport {
        tools: vec![
            ToolStatus::new("docker", &config.runtime.docker_bin, availability.docker),
            ToolStatus::new("podman", &config.runtime.podman_bin, availability.podman),
            ToolStatus::new("scanner", &config.scanner.scanner_bin, availability.scanner),
        ],
    }
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub tools: Vec<ToolStatus>,
}

#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub role: &'static str,
    pub binary: String,
    pub available: bool,
}

impl ToolStatus {
    fn new(role: &'static str, binary: &str, available: bool) -> Self {
        Self {
            role,
            binary: binary.to_owned(),
            available,
        }
    }
}

impl Render for ProbeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<10} {:<30} Status", "Role", "Binary")?;
        writeln!(w, "{}", "-".repeat(52))?;
        for tool in &self.tools {
            let status = if tool.available {
                "available".green()
            } else {
                "not found".red()
            };
            writeln!(w, "{:<10} {:<30} {}", tool.role, tool.binary, status)?;
        }
        Ok(())
    }
}
