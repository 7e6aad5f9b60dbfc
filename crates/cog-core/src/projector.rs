//! Link projector
//!
//! Materializes manifest assets into a provider's flat, type-partitioned
//! layout (`{provider root}/{type}s/{name}`) as relative symlinks or copies,
//! and classifies what is already there.
//!
//! Only engine-owned entries are ever modified. An entry is engine-owned when
//! it is a symlink resolving inside the store root, or a directory recorded in
//! the provider's copy-mode sync state. Everything else in a provider tree is
//! foreign and left untouched.

use crate::asset::AssetType;
use crate::config::ProviderTarget;
use crate::manifest::{Manifest, ManifestAsset, ProviderSyncState};
use crate::scanner::ScanFilter;
use crate::{Error, Result};
use cog_fs::checksum::compute_dir_checksum;
use cog_fs::link::{self, EntryKind};
use cog_fs::{LinkMethod, canonicalize_lenient, is_within, relative_path};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Options for a single projection pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectOptions {
    /// Requested method; symlinks fall back to copies when unsupported
    pub method: LinkMethod,
    /// Recreate entries even when they are already correct
    pub force: bool,
    /// Compute the plan without touching the filesystem
    pub dry_run: bool,
}

/// What a projection pass did (or would do) for one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSyncResult {
    pub provider: String,
    pub method: LinkMethod,
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub removed: Vec<String>,
    pub errors: Vec<String>,
}

impl ProviderSyncResult {
    fn new(provider: &str, method: LinkMethod) -> Self {
        Self {
            provider: provider.to_string(),
            method,
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names now projected: everything created or already correct.
    pub fn projected(&self) -> Vec<String> {
        self.created.iter().chain(&self.skipped).cloned().collect()
    }
}

/// Classification of an engine-owned provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Valid,
    Broken,
    Orphaned,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Valid => write!(f, "valid"),
            LinkStatus::Broken => write!(f, "broken"),
            LinkStatus::Orphaned => write!(f, "orphaned"),
        }
    }
}

/// One engine-owned entry found in a provider tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    pub provider: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub name: String,
    /// Path of the entry in the provider tree
    pub path: PathBuf,
    /// Resolved symlink target; `None` for copies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    pub method: LinkMethod,
    pub status: LinkStatus,
}

/// Result of classifying a provider tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderVerification {
    pub provider: String,
    pub links: Vec<LinkInfo>,
    /// Tracked assets with nothing at their target path
    pub missing: Vec<String>,
}

impl ProviderVerification {
    pub fn count(&self, status: LinkStatus) -> usize {
        self.links.iter().filter(|l| l.status == status).count()
    }

    /// True when every owned entry is valid and nothing is missing.
    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty() && self.links.iter().all(|l| l.status == LinkStatus::Valid)
    }
}

/// Result of removing broken and orphaned entries from a provider tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCleanResult {
    pub provider: String,
    pub removed: Vec<String>,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
}

/// Who occupies a target path.
enum Occupant {
    Empty,
    /// Engine-owned symlink, with its resolved target
    Link(PathBuf),
    /// Engine-owned copy
    Copy,
    Foreign(&'static str),
}

/// Projects assets from one canonical store into provider trees.
///
/// The symlink capability probe runs at most once per projector, so a sync
/// run should share one projector across providers.
#[derive(Debug)]
pub struct LinkProjector {
    store_root: PathBuf,
    scratch_dir: PathBuf,
    symlinks: OnceLock<bool>,
}

impl LinkProjector {
    /// `scratch_dir` is where the symlink capability probe runs.
    pub fn new(store_root: &Path, scratch_dir: &Path) -> Self {
        Self {
            store_root: canonicalize_lenient(store_root),
            scratch_dir: scratch_dir.to_path_buf(),
            symlinks: OnceLock::new(),
        }
    }

    /// Skip the probe and use a known answer.
    pub fn with_symlink_support(self, supported: bool) -> Self {
        let _ = self.symlinks.set(supported);
        self
    }

    pub fn store_root(&self) -> &Path {
        &self.store_root
    }

    pub fn symlinks_supported(&self) -> bool {
        *self
            .symlinks
            .get_or_init(|| link::symlinks_supported(&self.scratch_dir))
    }

    /// Method actually used for a requested one.
    pub fn effective_method(&self, requested: LinkMethod) -> LinkMethod {
        match requested {
            LinkMethod::Copy => LinkMethod::Copy,
            LinkMethod::Symlink if self.symlinks_supported() => LinkMethod::Symlink,
            LinkMethod::Symlink => {
                tracing::warn!("Symbolic links are not supported here, falling back to copies");
                LinkMethod::Copy
            }
        }
    }

    /// Project `assets` into `target`.
    ///
    /// `assets` is the in-scope manifest subset and `scope` the filter that
    /// produced it; owned entries within scope that no longer correspond to
    /// an asset are removed. `previous` is the provider's recorded sync
    /// state, which identifies owned copies.
    pub fn project(
        &self,
        target: &ProviderTarget,
        assets: &[&ManifestAsset],
        previous: Option<&ProviderSyncState>,
        scope: &ScanFilter,
        options: ProjectOptions,
    ) -> ProviderSyncResult {
        let method = self.effective_method(options.method);
        let mut result = ProviderSyncResult::new(&target.name, method);
        let copies = owned_copies(previous);
        let mut expected: BTreeMap<PathBuf, BTreeSet<String>> = BTreeMap::new();
        // Types may share a directory through path overrides
        let mut destinations: HashSet<PathBuf> = HashSet::new();

        for asset in assets {
            let Some(type_dir) = target.type_dir(asset.kind) else {
                tracing::debug!(
                    provider = %target.name,
                    asset = %asset.name,
                    "Provider does not receive {}s",
                    asset.kind
                );
                continue;
            };
            let type_dir = canonicalize_lenient(&type_dir);
            let path = type_dir.join(&asset.name);
            if !destinations.insert(path.clone()) {
                result.errors.push(format!(
                    "{}: {} is already the destination of another asset",
                    asset.name,
                    path.display()
                ));
                continue;
            }
            expected
                .entry(type_dir)
                .or_default()
                .insert(asset.name.clone());

            match self.project_one(&target.name, asset, &path, method, &copies, options) {
                Ok(true) => result.created.push(asset.name.clone()),
                Ok(false) => result.skipped.push(asset.name.clone()),
                Err(e) => {
                    tracing::warn!(provider = %target.name, asset = %asset.name, "{}", e);
                    result.errors.push(format!("{}: {}", asset.name, e));
                }
            }
        }

        self.remove_stale(target, &expected, &copies, scope, options, &mut result);

        tracing::info!(
            provider = %target.name,
            method = %method,
            created = result.created.len(),
            skipped = result.skipped.len(),
            removed = result.removed.len(),
            errors = result.errors.len(),
            dry_run = options.dry_run,
            "Projection complete"
        );
        result
    }

    /// Returns `Ok(true)` when the entry was (or would be) created.
    fn project_one(
        &self,
        provider: &str,
        asset: &ManifestAsset,
        path: &Path,
        method: LinkMethod,
        copies: &HashSet<String>,
        options: ProjectOptions,
    ) -> Result<bool> {
        let canonical = asset.canonical_dir(&self.store_root);
        if !canonical.is_dir() {
            return Err(failure(
                provider,
                format!("canonical directory {} does not exist", canonical.display()),
            ));
        }

        let replace = match self.occupant(path, &asset.name, copies)? {
            Occupant::Empty => false,
            Occupant::Foreign(what) => {
                return Err(failure(
                    provider,
                    format!("{} is occupied by a {} not managed by cog", path.display(), what),
                ));
            }
            Occupant::Link(current) => {
                if !options.force && method == LinkMethod::Symlink && current == canonical {
                    return Ok(false);
                }
                true
            }
            Occupant::Copy => {
                if !options.force
                    && method == LinkMethod::Copy
                    && same_contents(path, &canonical)
                {
                    return Ok(false);
                }
                true
            }
        };

        if options.dry_run {
            tracing::debug!(
                asset = %asset.name,
                path = %path.display(),
                replace,
                "[dry-run] Would project"
            );
            return Ok(true);
        }

        if replace {
            link::remove_entry(path)?;
        }
        self.materialize(&canonical, path, method)?;
        tracing::debug!(asset = %asset.name, path = %path.display(), %method, "Projected");
        Ok(true)
    }

    fn materialize(&self, canonical: &Path, path: &Path, method: LinkMethod) -> Result<()> {
        match method {
            LinkMethod::Symlink => {
                let parent = path.parent().unwrap_or_else(|| Path::new(""));
                link::create_dir_symlink(&relative_path(parent, canonical), path)?;
            }
            LinkMethod::Copy => {
                link::copy_dir(canonical, path)?;
            }
        }
        Ok(())
    }

    fn remove_stale(
        &self,
        target: &ProviderTarget,
        expected: &BTreeMap<PathBuf, BTreeSet<String>>,
        copies: &HashSet<String>,
        scope: &ScanFilter,
        options: ProjectOptions,
        result: &mut ProviderSyncResult,
    ) {
        for (kind, type_dir) in type_dirs(target) {
            if scope.asset_type.is_some_and(|t| t != kind) {
                continue;
            }
            let keep = expected.get(&type_dir);
            for (name, path) in list_entries(&type_dir) {
                if keep.is_some_and(|names| names.contains(&name)) {
                    continue;
                }
                let in_scope = match self.occupant(&path, &name, copies) {
                    Ok(Occupant::Link(resolved)) => self
                        .store_location(&resolved)
                        .is_none_or(|(t, category)| scope.matches(t, &category)),
                    // Copies do not record their category
                    Ok(Occupant::Copy) => scope.category.is_none(),
                    _ => false,
                };
                if !in_scope || result.removed.contains(&name) {
                    continue;
                }

                if !options.dry_run
                    && let Err(e) = link::remove_entry(&path)
                {
                    result.errors.push(format!("{}: {}", name, e));
                    continue;
                }
                tracing::debug!(
                    provider = %target.name,
                    entry = %path.display(),
                    "Removed stale entry"
                );
                result.removed.push(name);
            }
        }
    }

    /// Classify every engine-owned entry in a provider tree.
    pub fn verify_provider(
        &self,
        target: &ProviderTarget,
        manifest: &Manifest,
    ) -> ProviderVerification {
        let previous = manifest.sync_state(&target.name);
        let copies = owned_copies(previous);
        let mut verification = ProviderVerification {
            provider: target.name.clone(),
            ..ProviderVerification::default()
        };

        for (kind, type_dir) in type_dirs(target) {
            for (name, path) in list_entries(&type_dir) {
                let (resolved, method) = match self.occupant(&path, &name, &copies) {
                    Ok(Occupant::Link(resolved)) => (Some(resolved), LinkMethod::Symlink),
                    Ok(Occupant::Copy) => (None, LinkMethod::Copy),
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!("Cannot inspect {}: {}", path.display(), e);
                        continue;
                    }
                };

                // The asset this entry stands for, if it is still tracked
                // under a type that lands in this directory
                let tracked = manifest.get(&name).filter(|a| {
                    target
                        .type_dir(a.kind)
                        .is_some_and(|d| canonicalize_lenient(&d) == type_dir)
                });
                let asset_type = tracked.map(|a| a.kind).unwrap_or(kind);

                let status = match tracked {
                    None => LinkStatus::Orphaned,
                    Some(asset) => {
                        let canonical = asset.canonical_dir(&self.store_root);
                        if !canonical.is_dir() {
                            LinkStatus::Orphaned
                        } else {
                            let correct = match &resolved {
                                Some(resolved) => *resolved == canonical,
                                None => same_contents(&path, &canonical),
                            };
                            if correct {
                                LinkStatus::Valid
                            } else {
                                LinkStatus::Broken
                            }
                        }
                    }
                };

                verification.links.push(LinkInfo {
                    provider: target.name.clone(),
                    asset_type,
                    name,
                    path,
                    target: resolved,
                    method,
                    status,
                });
            }
        }

        for asset in manifest.assets.values() {
            if let Some(path) = target.asset_path(asset.kind, &asset.name)
                && matches!(link::inspect_entry(&path), Ok(EntryKind::Missing))
                && asset.canonical_dir(&self.store_root).is_dir()
            {
                verification.missing.push(asset.name.clone());
            }
        }

        verification
    }

    /// Remove broken and orphaned engine-owned entries.
    pub fn clean_provider(
        &self,
        target: &ProviderTarget,
        manifest: &Manifest,
        dry_run: bool,
    ) -> ProviderCleanResult {
        let verification = self.verify_provider(target, manifest);
        let mut result = ProviderCleanResult {
            provider: target.name.clone(),
            ..ProviderCleanResult::default()
        };

        for info in verification
            .links
            .into_iter()
            .filter(|l| l.status != LinkStatus::Valid)
        {
            // Owned entries only: symlink targets must stay inside the store
            if let Some(resolved) = &info.target
                && !self.owns_target(resolved)
            {
                continue;
            }

            let size = link::entry_size(&info.path);
            if !dry_run
                && let Err(e) = link::remove_entry(&info.path)
            {
                result.errors.push(format!("{}: {}", info.name, e));
                continue;
            }
            tracing::debug!(
                provider = %target.name,
                entry = %info.path.display(),
                status = %info.status,
                dry_run,
                "Removed entry"
            );
            result.bytes_freed += size;
            result.removed.push(info.name);
        }
        result
    }

    fn occupant(&self, path: &Path, name: &str, copies: &HashSet<String>) -> Result<Occupant> {
        Ok(match link::inspect_entry(path)? {
            EntryKind::Missing => Occupant::Empty,
            EntryKind::Symlink { target } if self.owns_target(&target) => Occupant::Link(target),
            EntryKind::Symlink { .. } => Occupant::Foreign("symlink"),
            EntryKind::Directory if copies.contains(name) => Occupant::Copy,
            EntryKind::Directory => Occupant::Foreign("directory"),
            EntryKind::File => Occupant::Foreign("file"),
        })
    }

    fn owns_target(&self, resolved: &Path) -> bool {
        is_within(&self.store_root, resolved)
    }

    /// Type and category encoded in a store path (`{type}s/{category}/{name}`).
    fn store_location(&self, resolved: &Path) -> Option<(AssetType, String)> {
        let relative = resolved.strip_prefix(&self.store_root).ok()?;
        let mut parts = relative.components().map(|c| c.as_os_str().to_string_lossy());
        let kind = parts.next()?.parse::<AssetType>().ok()?;
        let category = parts.next()?.into_owned();
        Some((kind, category))
    }
}

fn failure(provider: &str, reason: String) -> Error {
    Error::ProjectionFailed {
        provider: provider.to_string(),
        reason,
    }
}

fn owned_copies(previous: Option<&ProviderSyncState>) -> HashSet<String> {
    previous
        .map(|s| s.owned_copies().iter().cloned().collect())
        .unwrap_or_default()
}

/// Distinct canonical type directories of a provider, with the type mapped
/// there first.
fn type_dirs(target: &ProviderTarget) -> Vec<(AssetType, PathBuf)> {
    let mut seen = HashSet::new();
    AssetType::ALL
        .into_iter()
        .filter_map(|kind| target.type_dir(kind).map(|d| (kind, canonicalize_lenient(&d))))
        .filter(|(_, dir)| seen.insert(dir.clone()))
        .collect()
}

/// Entries directly inside `dir`, sorted by name. Missing dir means none.
fn list_entries(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut entries: Vec<(String, PathBuf)> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| (e.file_name().to_string_lossy().into_owned(), e.path()))
                .collect()
        })
        .unwrap_or_default();
    entries.sort();
    entries
}

fn same_contents(copy: &Path, canonical: &Path) -> bool {
    match (compute_dir_checksum(copy), compute_dir_checksum(canonical)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
