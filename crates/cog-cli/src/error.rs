//! Error types for cog-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a CLI run with exit code 1
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from cog-core
    #[error(transparent)]
    Core(#[from] cog_core::Error),

    /// Error from cog-fs
    #[error(transparent)]
    Fs(#[from] cog_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output could not be rendered
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
