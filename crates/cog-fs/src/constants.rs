//! Well-known paths inside a cog project.

use std::path::Path;

/// Standard project filesystem markers and paths.
///
/// Every path is relative to the project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPath {
    /// The `.cog` directory (project marker and state root)
    StateDir,
    /// The persisted manifest
    Manifest,
    /// The default canonical store
    Store,
    /// Cache artifacts, safe to delete
    Cache,
    /// Scratch space, safe to delete
    Temp,
}

impl ProjectPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDir => ".cog",
            Self::Manifest => ".cog/manifest.json",
            Self::Store => ".cog/store",
            Self::Cache => ".cog/cache",
            Self::Temp => ".cog/tmp",
        }
    }

    /// Config file names probed in order of preference.
    pub fn config_candidates() -> &'static [&'static str] {
        &[".cog/config.yaml", ".cog/config.yml", ".cog/config.json"]
    }
}

impl AsRef<Path> for ProjectPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl std::fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
