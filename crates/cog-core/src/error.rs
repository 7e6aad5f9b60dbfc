//! Error types for cog-core

use std::path::PathBuf;

/// Result type for cog-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cog-core operations
///
/// Only unrecoverable conditions surface as `Error`; per-asset failures are
/// collected into the `errors` list of the relevant report instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No `.cog` directory found walking up from the start path
    #[error("No cog project found at or above {path} (run `cog init`)")]
    ProjectNotFound { path: PathBuf },

    /// Project configuration exists but cannot be used
    #[error("Invalid configuration at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// Unrecognised asset type string
    #[error("Unknown asset type: {value}")]
    UnknownAssetType { value: String },

    /// Provider named on the command line is not configured
    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    /// Projection of a single asset failed
    #[error("Projection failed for {provider}: {reason}")]
    ProjectionFailed { provider: String, reason: String },

    /// Registry request failed
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Filesystem error from cog-fs
    #[error(transparent)]
    Fs(#[from] cog_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Registry {
            message: e.to_string(),
        }
    }
}
