//! Project discovery and layout
//!
//! A project is any directory containing `.cog/`. The [`Project`] value
//! carries the root and the loaded config and is passed explicitly to every
//! engine component.

use crate::asset::AssetType;
use crate::config::{DEFAULT_PROVIDER, ProjectConfig};
use crate::manifest::{Manifest, ManifestStore};
use crate::{Error, Result};
use cog_fs::{Error as FsError, ProjectPath, normalize_lexically};
use std::fs;
use std::path::{Path, PathBuf};

/// An opened cog project.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: ProjectConfig,
}

impl Project {
    /// Walk up from `start` to the first directory containing `.cog/`.
    pub fn find_root(start: &Path) -> Result<PathBuf> {
        let start = dunce::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
        start
            .ancestors()
            .find(|dir| dir.join(ProjectPath::StateDir).is_dir())
            .map(Path::to_path_buf)
            .ok_or(Error::ProjectNotFound { path: start.clone() })
    }

    /// Discover the project containing `start` and load its config.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = Self::find_root(start)?;
        Self::open(root)
    }

    /// Open the project rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(ProjectPath::StateDir).is_dir() {
            return Err(Error::ProjectNotFound { path: root });
        }
        let config = ProjectConfig::load(&root)?;
        Ok(Self { root, config })
    }

    /// Build a project value from parts already loaded.
    pub fn from_parts(root: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Create the `.cog` layout under `root`.
    ///
    /// Existing config and manifest files are left alone, so running init on
    /// an initialized project only fills in missing directories.
    pub fn init(root: &Path, providers: &[String]) -> Result<Self> {
        let root = dunce::canonicalize(root).map_err(|e| FsError::io(root, e))?;

        let config_path = match ProjectConfig::locate(&root) {
            Some(existing) => existing,
            None => {
                let path = root.join(ProjectPath::config_candidates()[0]);
                let names: Vec<&str> = if providers.is_empty() {
                    vec![DEFAULT_PROVIDER]
                } else {
                    providers.iter().map(String::as_str).collect()
                };
                ProjectConfig::with_providers(names).save(&path)?;
                tracing::info!(path = %path.display(), "Wrote project config");
                path
            }
        };

        let config = ProjectConfig::load_file(&config_path)?;
        let project = Self { root, config };
        project.ensure_layout()?;

        let store = project.manifest_store();
        if !store.path().exists() {
            store.save(&mut Manifest::new())?;
        }
        Ok(project)
    }

    /// Create any missing state directories. Returns the ones created.
    pub fn ensure_layout(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = vec![self.state_dir(), self.store_root()];
        dirs.extend(
            AssetType::ALL
                .iter()
                .map(|kind| self.store_root().join(kind.dir_name())),
        );
        dirs.push(self.cache_dir());
        dirs.push(self.temp_dir());

        let mut created = Vec::new();
        for dir in dirs {
            if !dir.is_dir() {
                fs::create_dir_all(&dir).map_err(|e| FsError::io(&dir, e))?;
                tracing::debug!(dir = %dir.display(), "Created directory");
                created.push(dir);
            }
        }
        Ok(created)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(ProjectPath::StateDir)
    }

    /// Canonical store root, honoring the config override.
    pub fn store_root(&self) -> PathBuf {
        match &self.config.store {
            Some(store) if store.is_absolute() => normalize_lexically(store),
            Some(store) => normalize_lexically(&self.root.join(store)),
            None => self.root.join(ProjectPath::Store),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(ProjectPath::Manifest)
    }

    pub fn manifest_store(&self) -> ManifestStore {
        ManifestStore::new(self.manifest_path())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(ProjectPath::Cache)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(ProjectPath::Temp)
    }
}
