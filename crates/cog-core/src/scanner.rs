//! Content scanner
//!
//! Walks `store/{type}s/{category}/{name}/` and derives a content-addressed
//! view of what exists on disk. Asset directories without a recognisable
//! primary file are skipped silently; they may be mid-write.

use crate::asset::{AssetType, ScannedAsset};
use crate::metadata::{self, Metadata};
use cog_fs::checksum::compute_file_checksum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Restricts a scan (and a sync) to one type and/or category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFilter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<AssetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, asset_type: AssetType) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.asset_type.is_none() && self.category.is_none()
    }

    /// Whether an asset of this type and category is in scope.
    pub fn matches(&self, asset_type: AssetType, category: &str) -> bool {
        self.asset_type.is_none_or(|t| t == asset_type)
            && self.category.as_deref().is_none_or(|c| c == category)
    }
}

/// Result of a scan: the assets found plus per-item problems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub assets: Vec<ScannedAsset>,
    pub errors: Vec<String>,
    /// Names found more than once; the first occurrence is in `assets`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<String>,
}

/// Scans a canonical store root.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the store, returning assets and collected per-item errors.
    ///
    /// Assets are ordered by type, then category, then name.
    pub fn scan(&self, filter: &ScanFilter) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = HashSet::new();

        for asset_type in AssetType::ALL {
            if filter.asset_type.is_some_and(|t| t != asset_type) {
                continue;
            }
            let type_dir = self.root.join(asset_type.dir_name());
            if !type_dir.is_dir() {
                continue;
            }

            for (category, category_dir) in visible_subdirs(&type_dir) {
                if filter.category.as_deref().is_some_and(|c| c != category) {
                    continue;
                }
                for (name, asset_dir) in visible_subdirs(&category_dir) {
                    let Some(primary) = locate_primary_file(asset_type, &asset_dir) else {
                        tracing::debug!(dir = %asset_dir.display(), "No primary file, skipping");
                        continue;
                    };

                    if !seen.insert(name.clone()) {
                        report.errors.push(format!(
                            "Duplicate asset name '{}' at {} (name already used by another asset)",
                            name,
                            asset_dir.display()
                        ));
                        report.duplicates.push(name);
                        continue;
                    }

                    match build_asset(asset_type, &category, &name, &asset_dir, &primary) {
                        Ok(asset) => report.assets.push(asset),
                        Err(e) => {
                            seen.remove(&name);
                            report.errors.push(format!(
                                "Failed to read {}: {}",
                                primary.display(),
                                e
                            ));
                        }
                    }
                }
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            assets = report.assets.len(),
            errors = report.errors.len(),
            "Scan complete"
        );
        report
    }
}

/// Scan `root` and return only the assets found.
pub fn scan(root: &Path, filter: &ScanFilter) -> Vec<ScannedAsset> {
    let report = Scanner::new(root).scan(filter);
    for error in &report.errors {
        tracing::warn!("{}", error);
    }
    report.assets
}

fn build_asset(
    asset_type: AssetType,
    category: &str,
    name: &str,
    dir: &Path,
    primary: &Path,
) -> std::io::Result<ScannedAsset> {
    let hash = compute_file_checksum(primary)?;
    let metadata = read_metadata(asset_type, primary);
    let file_name = primary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ScannedAsset {
        name: name.to_string(),
        kind: asset_type,
        category: category.to_string(),
        dir: dir.to_path_buf(),
        primary_path: primary.to_path_buf(),
        file_name,
        hash,
        metadata,
    })
}

fn read_metadata(asset_type: AssetType, primary: &Path) -> Metadata {
    let content = match fs::read_to_string(primary) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("Metadata unreadable for {}: {}", primary.display(), e);
            return Metadata::new();
        }
    };
    if asset_type == AssetType::Workflow && has_extension(primary, &["yaml", "yml"]) {
        metadata::parse_yaml_document(&content)
    } else {
        metadata::parse_front_matter(&content)
    }
}

/// Non-hidden subdirectories of `dir`, sorted by name.
fn visible_subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            (!name.starts_with('.')).then(|| (name, e.path()))
        })
        .collect();
    dirs.sort();
    dirs
}

/// Regular files directly inside `dir`, sorted by name.
fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

/// Locate the primary file of an asset directory.
///
/// Order: conventional file name, first file with the type's extension,
/// then any markdown file whose front matter declares `type: <asset_type>`.
pub fn locate_primary_file(asset_type: AssetType, dir: &Path) -> Option<PathBuf> {
    let conventional = dir.join(asset_type.primary_file());
    if conventional.is_file() {
        return Some(conventional);
    }

    let files = files_in(dir);

    if let Some(found) = files
        .iter()
        .find(|p| has_extension(p, asset_type.extensions()))
    {
        return Some(found.clone());
    }

    files
        .iter()
        .filter(|p| has_extension(p, &["md"]))
        .find(|p| {
            fs::read_to_string(p)
                .map(|content| {
                    metadata::parse_front_matter(&content)
                        .text("type")
                        .and_then(|t| t.parse::<AssetType>().ok())
                        == Some(asset_type)
                })
                .unwrap_or(false)
        })
        .cloned()
}
