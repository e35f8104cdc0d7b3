//! `stowage inventory` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use stowage_core::config::StowageConfig;
use stowage_core::process::CommandRunner;
use stowage_core::types::ImageRecord;

use crate::cli::InventoryArgs;
use crate::commands::{SavedFile, enumerate, save};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `inventory` command.
pub async fn execute<R: CommandRunner>(
    args: InventoryArgs,
    runner: Arc<R>,
    config: &StowageConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = run(&args, runner, config).await?;
    writer.render(&report)
}

/// Enumerate images and save them if an output file was given.
pub async fn run<R: CommandRunner>(
    args: &InventoryArgs,
    runner: Arc<R>,
    config: &StowageConfig,
) -> Result<InventoryReport, CliError> {
    let (_, images) = enumerate(runner, config, args.runtime.into()).await?;
    info!(count = images.len(), runtime = ?args.runtime, "inventory collected");

    let saved = match &args.output {
        Some(path) => Some(save(&images, path, args.append).await?),
        None => None,
    };

    Ok(InventoryReport { images, saved })
}

#[derive(Debug, Serialize)]
pub struct InventoryReport {
    pub images: Vec<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<SavedFile>,
}

impl Render for InventoryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{}", "Container Image Inventory".bold())?;
        if self.images.is_empty() {
            writeln!(w, "No images found.")?;
        } else {
            writeln!(
                w,
                "{:<12} {:<40} {:<16} {:<32} {:<10} Source",
                "ID", "Repository", "Tag", "Created At", "Size"
            )?;
            writeln!(w, "{}", "-".repeat(120))?;
            for image in &self.images {
                writeln!(
                    w,
                    "{:<12} {:<40} {:<16} {:<32} {:<10} {}",
                    image.id.cyan(),
                    image.repository.green(),
                    image.tag.blue(),
                    image.created_at.magenta(),
                    image.size.yellow(),
                    image.source.as_str().red()
                )?;
            }
            writeln!(w)?;
            writeln!(w, "{} images", self.images.len())?;
        }

        if let Some(saved) = &self.saved {
            saved.render_text(w)?;
        }
        Ok(())
    }
}
