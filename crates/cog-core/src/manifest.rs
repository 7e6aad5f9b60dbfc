//! Persisted manifest of installed assets
//!
//! The manifest is the source of truth for what is installed; the filesystem
//! is the source of truth for what exists. Loading never fails: a missing or
//! unparsable file yields a fresh manifest so a corrupt file can always be
//! regenerated from the store.

use crate::Result;
use crate::asset::{AssetType, ScannedAsset};
use chrono::{DateTime, Utc};
use cog_fs::LinkMethod;
use cog_fs::io::write_atomic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Current manifest format version.
pub const MANIFEST_VERSION: &str = "1.0";

/// Version recorded for assets that do not declare one.
pub const DEFAULT_ASSET_VERSION: &str = "0.0.0";

fn default_manifest_version() -> String {
    MANIFEST_VERSION.to_string()
}

/// Where an installed asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    Registry,
    Local,
    Github,
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetSource::Registry => write!(f, "registry"),
            AssetSource::Local => write!(f, "local"),
            AssetSource::Github => write!(f, "github"),
        }
    }
}

/// A persisted manifest entry.
///
/// `installed_at`, `source` and `source_url` are fixed at creation; updates
/// only change `version` and `hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestAsset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub category: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub source: AssetSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl ManifestAsset {
    /// Build a fresh entry for an asset discovered in the local store.
    pub fn from_scanned(asset: &ScannedAsset, installed_at: DateTime<Utc>) -> Self {
        Self {
            name: asset.name.clone(),
            kind: asset.kind,
            category: asset.category.clone(),
            version: asset.version().unwrap_or(DEFAULT_ASSET_VERSION).to_string(),
            installed_at,
            source: AssetSource::Local,
            source_url: None,
            hash: Some(asset.hash.clone()),
        }
    }

    /// Canonical directory of this asset below `store_root`.
    pub fn canonical_dir(&self, store_root: &Path) -> PathBuf {
        self.kind
            .canonical_dir(store_root, &self.category, &self.name)
    }
}

/// Per-provider record of the last projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSyncState {
    pub last_sync: DateTime<Utc>,
    pub method: LinkMethod,
    /// Names of the assets currently projected into the provider
    #[serde(default)]
    pub assets: Vec<String>,
    /// Names materialized as copies, whatever the method of the last run.
    /// Absent in states written before copies were tracked per name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copies: Option<Vec<String>>,
}

impl ProviderSyncState {
    /// State of a run that projected `assets` with `method`.
    pub fn new(method: LinkMethod, assets: Vec<String>) -> Self {
        let assets = sorted_unique(assets);
        let copies = match method {
            LinkMethod::Copy => assets.clone(),
            LinkMethod::Symlink => Vec::new(),
        };
        Self {
            last_sync: Utc::now(),
            method,
            assets,
            copies: Some(copies),
        }
    }

    /// Replace the recorded copies.
    pub fn with_copies(mut self, copies: Vec<String>) -> Self {
        self.copies = Some(sorted_unique(copies));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.iter().any(|a| a == name)
    }

    /// Names whose provider directory is a copy made by cog.
    ///
    /// Without per-name tracking a copy-mode state owns all of its assets.
    pub fn owned_copies(&self) -> &[String] {
        match (&self.copies, self.method) {
            (Some(copies), _) => copies,
            (None, LinkMethod::Copy) => &self.assets,
            (None, LinkMethod::Symlink) => &[],
        }
    }
}

fn sorted_unique(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names.dedup();
    names
}

/// The manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default = "default_manifest_version")]
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub assets: BTreeMap<String, ManifestAsset>,
    #[serde(default)]
    pub syncs: BTreeMap<String, ProviderSyncState>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self {
            version: default_manifest_version(),
            last_updated: Utc::now(),
            assets: BTreeMap::new(),
            syncs: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ManifestAsset> {
        self.assets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    /// Insert an entry, replacing any entry with the same name.
    pub fn add(&mut self, asset: ManifestAsset) {
        self.assets.insert(asset.name.clone(), asset);
    }

    /// Update the version and hash of an existing entry.
    ///
    /// Returns `false` when no entry with that name exists.
    pub fn update(&mut self, name: &str, version: &str, hash: Option<&str>) -> bool {
        match self.assets.get_mut(name) {
            Some(existing) => {
                existing.version = version.to_string();
                if let Some(hash) = hash {
                    existing.hash = Some(hash.to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<ManifestAsset> {
        self.assets.remove(name)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn assets_by_type(&self, kind: AssetType) -> Vec<&ManifestAsset> {
        self.assets.values().filter(|a| a.kind == kind).collect()
    }

    pub fn assets_by_source(&self, source: AssetSource) -> Vec<&ManifestAsset> {
        self.assets.values().filter(|a| a.source == source).collect()
    }

    pub fn sync_state(&self, provider: &str) -> Option<&ProviderSyncState> {
        self.syncs.get(provider)
    }

    pub fn set_sync_state(&mut self, provider: impl Into<String>, state: ProviderSyncState) {
        self.syncs.insert(provider.into(), state);
    }

    /// Drop names from a provider's recorded asset list.
    pub fn prune_sync_state(&mut self, provider: &str, names: &[String]) {
        if let Some(state) = self.syncs.get_mut(provider) {
            state.assets.retain(|a| !names.contains(a));
            if let Some(copies) = &mut state.copies {
                copies.retain(|a| !names.contains(a));
            }
        }
    }
}

/// Outcome of inspecting the manifest file without repairing it.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestStatus {
    Missing,
    Valid(Manifest),
    Corrupt(String),
}

/// Loads and saves the manifest at a fixed path.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest, falling back to an empty one.
    ///
    /// Corruption is logged and never propagated.
    pub fn load(&self) -> Manifest {
        match self.inspect() {
            ManifestStatus::Valid(manifest) => manifest,
            ManifestStatus::Missing => {
                tracing::debug!(path = %self.path.display(), "No manifest yet, starting empty");
                Manifest::new()
            }
            ManifestStatus::Corrupt(reason) => {
                tracing::warn!(
                    "Manifest at {} is corrupt ({}), starting from an empty manifest",
                    self.path.display(),
                    reason
                );
                Manifest::new()
            }
        }
    }

    /// Classify the manifest file as missing, valid or corrupt.
    pub fn inspect(&self) -> ManifestStatus {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ManifestStatus::Missing,
            Err(e) => return ManifestStatus::Corrupt(e.to_string()),
        };
        match serde_json::from_str::<Manifest>(&content) {
            Ok(manifest) => ManifestStatus::Valid(manifest),
            Err(e) => ManifestStatus::Corrupt(e.to_string()),
        }
    }

    /// Stamp `last_updated` and write the manifest atomically.
    pub fn save(&self, manifest: &mut Manifest) -> Result<()> {
        manifest.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(manifest)?;
        write_atomic(&self.path, content.as_bytes())?;
        tracing::debug!(
            path = %self.path.display(),
            assets = manifest.assets.len(),
            "Manifest saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn entry(name: &str, kind: AssetType, source: AssetSource) -> ManifestAsset {
        ManifestAsset {
            name: name.to_string(),
            kind,
            category: "general".to_string(),
            version: "1.0.0".to_string(),
            installed_at: Utc::now(),
            source,
            source_url: None,
            hash: Some("0123456789abcdef".to_string()),
        }
    }

    #[test]
    fn load_missing_returns_empty() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("manifest.json"));
        assert!(store.load().is_empty());
        assert_eq!(store.inspect(), ManifestStatus::Missing);
    }

    #[test]
    fn load_corrupt_returns_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();

        let store = ManifestStore::new(&path);
        assert!(store.load().is_empty());
        assert!(matches!(store.inspect(), ManifestStatus::Corrupt(_)));
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join(".cog/manifest.json"));

        let mut manifest = Manifest::new();
        manifest.add(entry("code-reviewer", AssetType::Agent, AssetSource::Local));
        manifest.set_sync_state(
            "claude",
            ProviderSyncState::new(LinkMethod::Symlink, vec!["code-reviewer".into()]),
        );
        store.save(&mut manifest).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn serializes_camel_case_fields() {
        let mut manifest = Manifest::new();
        let mut asset = entry("x", AssetType::Skill, AssetSource::Github);
        asset.source_url = Some("https://github.com/o/r".into());
        manifest.add(asset);

        let json = serde_json::to_value(&manifest).unwrap();
        assert!(json.get("lastUpdated").is_some());
        let x = &json["assets"]["x"];
        assert_eq!(x["type"], "skill");
        assert_eq!(x["source"], "github");
        assert_eq!(x["sourceUrl"], "https://github.com/o/r");
        assert!(x.get("installedAt").is_some());
    }

    #[test]
    fn update_only_touches_version_and_hash() {
        let mut manifest = Manifest::new();
        let original = entry("a", AssetType::Prompt, AssetSource::Registry);
        manifest.add(original.clone());

        assert!(manifest.update("a", "2.0.0", Some("fedcba9876543210")));
        let updated = manifest.get("a").unwrap();
        assert_eq!(updated.version, "2.0.0");
        assert_eq!(updated.hash.as_deref(), Some("fedcba9876543210"));
        assert_eq!(updated.installed_at, original.installed_at);
        assert_eq!(updated.source, AssetSource::Registry);

        assert!(!manifest.update("missing", "1.0.0", None));
    }

    #[test]
    fn projections_by_type_and_source() {
        let mut manifest = Manifest::new();
        manifest.add(entry("a", AssetType::Skill, AssetSource::Local));
        manifest.add(entry("b", AssetType::Skill, AssetSource::Registry));
        manifest.add(entry("c", AssetType::Tool, AssetSource::Local));

        assert_eq!(manifest.assets_by_type(AssetType::Skill).len(), 2);
        assert_eq!(manifest.assets_by_source(AssetSource::Local).len(), 2);
        assert!(manifest.assets_by_type(AssetType::Workflow).is_empty());
    }

    #[test]
    fn legacy_entry_without_hash_parses() {
        let json = r#"{
            "version": "1.0",
            "lastUpdated": "2024-01-01T00:00:00Z",
            "assets": {
                "old": {
                    "name": "old", "type": "skill", "category": "general",
                    "version": "0.1.0", "installedAt": "2023-06-01T00:00:00Z",
                    "source": "local"
                }
            }
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert!(manifest.get("old").unwrap().hash.is_none());
        assert!(manifest.syncs.is_empty());
    }

    #[test]
    fn prune_sync_state_drops_names() {
        let mut manifest = Manifest::new();
        manifest.set_sync_state(
            "cursor",
            ProviderSyncState::new(LinkMethod::Copy, vec!["b".into(), "a".into()]),
        );
        manifest.prune_sync_state("cursor", &["a".to_string()]);
        let state = manifest.sync_state("cursor").unwrap();
        assert_eq!(state.assets, vec!["b"]);
        assert_eq!(state.owned_copies(), ["b"]);
    }

    #[test]
    fn copies_are_tracked_apart_from_the_method() {
        let state = ProviderSyncState::new(LinkMethod::Symlink, vec!["a".into(), "b".into()])
            .with_copies(vec!["b".into()]);
        assert_eq!(state.owned_copies(), ["b"]);

        let json = serde_json::to_string(&state).unwrap();
        let parsed: ProviderSyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.owned_copies(), ["b"]);
    }

    #[test]
    fn legacy_copy_state_owns_all_assets() {
        let json =
            r#"{"lastSync": "2024-01-01T00:00:00Z", "method": "copy", "assets": ["a", "b"]}"#;
        let state: ProviderSyncState = serde_json::from_str(json).unwrap();
        assert!(state.copies.is_none());
        assert_eq!(state.owned_copies(), ["a", "b"]);

        let json = r#"{"lastSync": "2024-01-01T00:00:00Z", "method": "symlink", "assets": ["a"]}"#;
        let state: ProviderSyncState = serde_json::from_str(json).unwrap();
        assert!(state.owned_copies().is_empty());
    }
}
