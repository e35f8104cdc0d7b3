//! CLI-specific error types and exit code mapping

use stowage_core::error::{PersistError, StowageError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A required runtime or the scanner is not installed.
    #[error("{0}")]
    ToolUnavailable(String),

    /// Writing or merging an output file failed.
    #[error("failed to save results: {0}")]
    Persist(#[from] PersistError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from stowage-core.
    #[error("{0}")]
    Core(#[from] StowageError),

    /// Ctrl-C received before the command finished.
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 3    | Runtime or scanner not available         |
    /// | 10   | IO error                                 |
    /// | 130  | Interrupted                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::ToolUnavailable(_) => 3,
            Self::Persist(_) | Self::Io(_) => 10,
            Self::Interrupted => 130,
            Self::Core(StowageError::Config(_)) => 2,
            Self::Core(StowageError::Io(_) | StowageError::Persist(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}
