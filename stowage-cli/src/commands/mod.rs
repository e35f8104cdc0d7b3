//! Command handlers -- one module per subcommand
//!
//! Handlers are generic over [`CommandRunner`] so the binary uses the real
//! process runner while tests drive them with a scripted one.

pub mod inventory;
pub mod probe;
pub mod scan;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use stowage_core::config::StowageConfig;
use stowage_core::persist::{PersistOutcome, persist};
use stowage_core::probe::ToolAvailability;
use stowage_core::process::CommandRunner;
use stowage_core::types::{ImageRecord, RuntimeFilter};
use stowage_runtime::ImageInventory;

use crate::error::CliError;

/// Probe the tools, enforce the runtime availability policy, then enumerate.
///
/// A named runtime that is missing, or `all` with neither runtime installed,
/// is a [`CliError::ToolUnavailable`].
pub(crate) async fn enumerate<R: CommandRunner>(
    runner: Arc<R>,
    config: &StowageConfig,
    filter: RuntimeFilter,
) -> Result<(ToolAvailability, Vec<ImageRecord>), CliError> {
    let inventory = ImageInventory::new(runner, config).await;
    let availability = inventory.availability();
    ensure_runtime(filter, &availability)?;
    let images = inventory.list_images(filter).await;
    Ok((availability, images))
}

fn ensure_runtime(filter: RuntimeFilter, availability: &ToolAvailability) -> Result<(), CliError> {
    match filter {
        RuntimeFilter::All if !availability.any_runtime() => Err(CliError::ToolUnavailable(
            "neither docker nor podman is available on this system".to_owned(),
        )),
        RuntimeFilter::All => Ok(()),
        single => {
            let missing = single
                .runtimes()
                .into_iter()
                .find(|p| !availability.runtime(*p));
            match missing {
                Some(p) => Err(CliError::ToolUnavailable(format!(
                    "{p} is not available on this system"
                ))),
                None => Ok(()),
            }
        }
    }
}

/// Where and how a batch of records was saved.
#[derive(Debug, Clone, Serialize)]
pub struct SavedFile {
    pub path: String,
    pub records: usize,
    pub action: &'static str,
    /// Reason the previous content was discarded, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded: Option<String>,
}

impl SavedFile {
    pub(crate) fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(reason) = &self.discarded {
            writeln!(
                w,
                "{} existing content of {} was not a JSON array ({reason}); created a new file",
                "Warning:".yellow().bold(),
                self.path
            )?;
        }
        let line = format!(
            "Successfully {} to {} ({} records in file)",
            self.action, self.path, self.records
        );
        writeln!(w, "{}", line.green())
    }
}

/// Save records, merging into an existing file in append mode.
///
/// Records are converted to JSON values up front so the file work can run
/// on the blocking pool.
pub(crate) async fn save<T: Serialize>(
    records: &[T],
    path: &Path,
    append: bool,
) -> Result<SavedFile, CliError> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()?;
    let target = path.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || persist(&values, &target, append))
        .await
        .map_err(|e| CliError::Command(format!("save task failed: {e}")))??;
    let (action, discarded) = match &outcome {
        PersistOutcome::Written { .. } => ("saved", None),
        PersistOutcome::Appended { .. } => ("appended", None),
        PersistOutcome::Replaced { discarded, .. } => ("saved", Some(discarded.clone())),
    };
    Ok(SavedFile {
        path: path.display().to_string(),
        records: outcome.total_records(),
        action,
        discarded,
    })
}
