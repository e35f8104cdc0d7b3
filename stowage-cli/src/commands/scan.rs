//! `stowage scan` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use stowage_core::config::StowageConfig;
use stowage_core::process::CommandRunner;
use stowage_core::types::Severity;
use stowage_vuln_scanner::{
    ImageScanner, ScanOutcome, ScanRequest, ScanResult, SeverityCounts, find_image, rank_findings,
};

use crate::cli::ScanArgs;
use crate::commands::{SavedFile, enumerate, save};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, truncate};

/// Titles longer than this are cut in the findings table.
const TITLE_WIDTH: usize = 50;

/// Execute the `scan` command.
pub async fn execute<R: CommandRunner>(
    args: ScanArgs,
    runner: Arc<R>,
    config: &StowageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(&args, runner, config).await?;
    writer.render(&report)
}

/// Enumerate, scan the selected images one by one, and save what was asked for.
///
/// Individual scan failures are part of the report; only missing tools,
/// an unknown `--image`, or a failed save end the command with an error.
pub async fn run<R: CommandRunner>(
    args: &ScanArgs,
    runner: Arc<R>,
    config: &StowageConfig,
) -> Result<ScanReport, CliError> {
    let (availability, images) = enumerate(Arc::clone(&runner), config, args.runtime.into()).await?;
    if !availability.scanner {
        return Err(CliError::ToolUnavailable(format!(
            "{} vulnerability scanner is not available on this system",
            config.scanner.scanner_bin
        )));
    }

    let mut saved = Vec::new();
    if let Some(path) = &args.inventory_output {
        saved.push(save(&images, path, args.append).await?);
    }

    let requests: Vec<ScanRequest> = match &args.image {
        Some(reference) => {
            let record = find_image(&images, reference).ok_or_else(|| {
                CliError::Command(format!("image '{reference}' not found in inventory"))
            })?;
            vec![ScanRequest::from_record(record)]
        }
        None => {
            // Without an ID there is nothing to hand the scanner.
            let (scannable, skipped): (Vec<_>, Vec<_>) =
                images.iter().partition(|record| !record.id.is_empty());
            if !skipped.is_empty() {
                debug!(skipped = skipped.len(), "skipping images without an ID");
            }
            scannable.into_iter().map(ScanRequest::from_record).collect()
        }
    };
    info!(images = requests.len(), "starting vulnerability scan");

    let scanner = ImageScanner::new(runner, config, &availability);
    let results = scanner.scan_batch(&requests).await;

    if let Some(path) = &args.output {
        saved.push(save(&results, path, args.append).await?);
    }

    let mut summary = SeverityCounts::default();
    for result in &results {
        summary.merge(&SeverityCounts::from_result(result));
    }
    let failed = results.iter().filter(|r| !r.is_success()).count();

    Ok(ScanReport {
        scanned: results.len(),
        failed,
        summary,
        results,
        saved,
    })
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub failed: usize,
    pub summary: SeverityCounts,
    pub results: Vec<ScanResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub saved: Vec<SavedFile>,
}

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.results.is_empty() {
            writeln!(w, "No images to scan.")?;
        }
        for result in &self.results {
            render_result(result, w)?;
        }

        let summary = format!(
            "{} total (C:{} H:{} M:{} L:{} U:{})",
            self.summary.total(),
            self.summary.critical,
            self.summary.high,
            self.summary.medium,
            self.summary.low,
            self.summary.unknown
        );
        writeln!(
            w,
            "Scanned {} images, {} failed",
            self.scanned,
            if self.failed > 0 {
                self.failed.to_string().red().bold()
            } else {
                self.failed.to_string().normal()
            }
        )?;
        if self.summary.total() > 0 {
            writeln!(w, "Vulnerabilities: {}", summary.red().bold())?;
        } else {
            writeln!(w, "Vulnerabilities: {}", summary.green().bold())?;
        }

        for saved in &self.saved {
            saved.render_text(w)?;
        }
        Ok(())
    }
}

fn render_result(result: &ScanResult, w: &mut dyn Write) -> std::io::Result<()> {
    use colored::Colorize;

    let targets = match &result.outcome {
        ScanOutcome::Failed(e) => {
            writeln!(w, "{} {}: {e}", "Error:".red().bold(), result.image)?;
            writeln!(w)?;
            return Ok(());
        }
        ScanOutcome::Completed(targets) => targets,
    };

    writeln!(
        w,
        "{}",
        format!(
            "Vulnerability Scan Results for {} ({})",
            result.image, result.source
        )
        .bold()
    )?;
    writeln!(w, "Scan completed at: {}", result.scan_time.to_rfc3339())?;
    writeln!(w)?;

    if targets.is_empty() {
        writeln!(w, "{}", "No vulnerabilities found.".green())?;
        writeln!(w)?;
        return Ok(());
    }

    for target in targets {
        writeln!(w, "{} {}", "Target:".bold(), target.target)?;
        if target.vulnerabilities.is_empty() {
            writeln!(w, "{}", "No vulnerabilities found in this target.".green())?;
            writeln!(w)?;
            continue;
        }

        writeln!(
            w,
            "{:<20} {:<24} {:<18} {:<18} {:<10} Title",
            "ID", "Package", "Installed", "Fixed In", "Severity"
        )?;
        writeln!(w, "{}", "-".repeat(150))?;
        for finding in rank_findings(&target.vulnerabilities) {
            let label = finding.severity.as_str();
            let severity = match finding.severity {
                Severity::Critical => label.red().bold(),
                Severity::High => label.red(),
                Severity::Medium => label.yellow(),
                Severity::Low => label.green(),
                Severity::Unknown => label.blue(),
            };
            writeln!(
                w,
                "{:<20} {:<24} {:<18} {:<18} {:<10} {}",
                finding.vulnerability_id.cyan(),
                finding.pkg_name,
                finding.installed_version,
                finding.fixed_version.as_deref().unwrap_or("").green(),
                severity,
                truncate(finding.title.as_deref().unwrap_or(""), TITLE_WIDTH)
            )?;
        }
        writeln!(w)?;
    }
    Ok(())
}
