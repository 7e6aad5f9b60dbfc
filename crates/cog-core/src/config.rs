//! Project configuration
//!
//! Read from `.cog/config.yaml` (or `.yml` / `.json`) through
//! [`ConfigStore`], so the file format follows the extension. A missing file
//! means defaults; a file that cannot be parsed is fatal.

use crate::asset::AssetType;
use crate::{Error, Result};
use cog_fs::{ConfigStore, LinkMethod, ProjectPath, normalize_lexically};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current config format version.
pub const CONFIG_VERSION: u32 = 1;

/// Provider used when `cog init` is given none.
pub const DEFAULT_PROVIDER: &str = "claude";

const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Built-in provider roots, relative to the project root.
const BUILTIN_PROVIDERS: &[(&str, &str)] = &[
    ("claude", ".claude"),
    ("cursor", ".cursor"),
    ("copilot", ".github"),
    ("gemini", ".gemini"),
    ("codex", ".codex"),
    ("windsurf", ".windsurf"),
];

/// Default root directory of a well-known provider.
pub fn builtin_root(provider: &str) -> Option<&'static str> {
    BUILTIN_PROVIDERS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, root)| *root)
}

/// Names of all providers with a built-in root.
pub fn builtin_providers() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROVIDERS.iter().map(|(name, _)| *name)
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// Per-provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Provider root, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Per-type directory overrides, relative to the project root
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<AssetType, PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
            paths: BTreeMap::new(),
        }
    }
}

/// Remote registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    pub url: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

/// The `.cog/config.*` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Store override, relative to the project root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
    #[serde(default)]
    pub method: LinkMethod,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryConfig>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: None,
            method: LinkMethod::default(),
            providers: BTreeMap::new(),
            registry: None,
        }
    }
}

impl ProjectConfig {
    /// Config with the given providers enabled at their default roots.
    pub fn with_providers<'a>(providers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut config = Self::default();
        for name in providers {
            config
                .providers
                .insert(name.to_string(), ProviderConfig::default());
        }
        config
    }

    /// First existing config file below `root`.
    pub fn locate(root: &Path) -> Option<PathBuf> {
        ProjectPath::config_candidates()
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.is_file())
    }

    /// Load the project config below `root`, or defaults when there is none.
    pub fn load(root: &Path) -> Result<Self> {
        match Self::locate(root) {
            Some(path) => Self::load_file(&path),
            None => {
                tracing::debug!(root = %root.display(), "No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a specific config file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let config: ProjectConfig =
            ConfigStore::new()
                .load(path)
                .map_err(|e| Error::InvalidConfig {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
        config.validate().map_err(|message| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Write the config to `path` in the format its extension names.
    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        Ok(())
    }

    /// Structural checks that do not depend on the filesystem.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.version > CONFIG_VERSION {
            return Err(format!(
                "config version {} is newer than supported version {}",
                self.version, CONFIG_VERSION
            ));
        }
        for name in self.providers.keys() {
            cog_fs::validate_identifier(name, "provider name")?;
        }
        Ok(())
    }

    /// Enabled provider names, in order.
    pub fn enabled_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Resolve a configured provider into absolute target directories.
    pub fn resolve_provider(&self, name: &str, project_root: &Path) -> Result<ProviderTarget> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| Error::UnknownProvider {
                name: name.to_string(),
            })?;

        let root = provider
            .root
            .clone()
            .or_else(|| builtin_root(name).map(PathBuf::from))
            .map(|r| absolutize(project_root, &r));

        let paths: BTreeMap<AssetType, PathBuf> = provider
            .paths
            .iter()
            .map(|(kind, dir)| (*kind, absolutize(project_root, dir)))
            .collect();

        if root.is_none() && paths.is_empty() {
            return Err(Error::InvalidConfig {
                path: project_root.join(ProjectPath::StateDir),
                message: format!(
                    "provider '{}' has no built-in root; set `root` or `paths`",
                    name
                ),
            });
        }

        Ok(ProviderTarget {
            name: name.to_string(),
            root,
            paths,
        })
    }
}

fn absolutize(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&project_root.join(path))
    }
}

/// A provider's resolved on-disk layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTarget {
    pub name: String,
    pub root: Option<PathBuf>,
    pub paths: BTreeMap<AssetType, PathBuf>,
}

impl ProviderTarget {
    /// Target directory for a given type, if the provider receives that type.
    pub fn type_dir(&self, kind: AssetType) -> Option<PathBuf> {
        self.paths
            .get(&kind)
            .cloned()
            .or_else(|| self.root.as_ref().map(|r| r.join(kind.dir_name())))
    }

    /// Flat target path of one asset: `{type dir}/{name}`.
    pub fn asset_path(&self, kind: AssetType, name: &str) -> Option<PathBuf> {
        self.type_dir(kind).map(|dir| dir.join(name))
    }
}
