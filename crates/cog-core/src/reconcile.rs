//! Reconciliation of scanned assets against manifest entries
//!
//! Pure functions: [`reconcile`] computes the diff, [`apply_reconciliation`]
//! folds it into a manifest. Applying a result twice is the same as applying
//! it once.

use crate::asset::ScannedAsset;
use crate::manifest::{DEFAULT_ASSET_VERSION, Manifest, ManifestAsset};
use crate::scanner::ScanFilter;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// How manifest entries recorded without a hash are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyHashPolicy {
    /// A missing hash on either side means "cannot tell", so unchanged.
    #[default]
    Lenient,
    /// A hash-less manifest entry is updated once the scan has a hash, which
    /// records the hash so later runs compare normally.
    Backfill,
}

/// Diff between the store and the manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// New entries, ready to be inserted verbatim
    pub added: Vec<ManifestAsset>,
    /// Names present in the manifest but no longer in the store
    pub removed: Vec<String>,
    /// Entries carrying the new version and hash; provenance fields are
    /// taken from the existing entry
    pub updated: Vec<ManifestAsset>,
    pub unchanged_count: usize,
}

impl ReconcileResult {
    /// True when nothing needs to change.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

/// Diff `scanned` against `manifest_assets` using the lenient hash policy.
pub fn reconcile<'a>(
    scanned: &[ScannedAsset],
    manifest_assets: impl IntoIterator<Item = &'a ManifestAsset>,
) -> ReconcileResult {
    reconcile_with(scanned, manifest_assets, LegacyHashPolicy::Lenient)
}

/// Diff `scanned` against `manifest_assets`.
pub fn reconcile_with<'a>(
    scanned: &[ScannedAsset],
    manifest_assets: impl IntoIterator<Item = &'a ManifestAsset>,
    policy: LegacyHashPolicy,
) -> ReconcileResult {
    let now = Utc::now();
    let by_name: HashMap<&str, &ManifestAsset> = manifest_assets
        .into_iter()
        .map(|a| (a.name.as_str(), a))
        .collect();
    let scanned_names: HashSet<&str> = scanned.iter().map(|a| a.name.as_str()).collect();

    let mut result = ReconcileResult::default();

    let mut removed: Vec<String> = by_name
        .keys()
        .filter(|name| !scanned_names.contains(*name))
        .map(|name| name.to_string())
        .collect();
    removed.sort();
    result.removed = removed;

    for asset in scanned {
        match by_name.get(asset.name.as_str()) {
            None => result.added.push(ManifestAsset::from_scanned(asset, now)),
            Some(existing) if needs_update(existing, asset, policy) => {
                result.updated.push(merged_entry(existing, asset));
            }
            Some(_) => result.unchanged_count += 1,
        }
    }

    result
}

fn needs_update(existing: &ManifestAsset, asset: &ScannedAsset, policy: LegacyHashPolicy) -> bool {
    // An asset moved to another category or type keeps its identity but the
    // entry must follow it
    if existing.kind != asset.kind || existing.category != asset.category {
        return true;
    }
    match (&existing.hash, policy) {
        (Some(hash), _) => hash != &asset.hash,
        (None, LegacyHashPolicy::Lenient) => false,
        (None, LegacyHashPolicy::Backfill) => !asset.hash.is_empty(),
    }
}

fn merged_entry(existing: &ManifestAsset, asset: &ScannedAsset) -> ManifestAsset {
    ManifestAsset {
        kind: asset.kind,
        category: asset.category.clone(),
        version: asset.version().unwrap_or(DEFAULT_ASSET_VERSION).to_string(),
        hash: Some(asset.hash.clone()),
        ..existing.clone()
    }
}

/// Fold a reconciliation result into `manifest`.
///
/// Updated entries keep their original `installed_at`, `source` and
/// `source_url`.
pub fn apply_reconciliation(result: &ReconcileResult, manifest: &mut Manifest) {
    for name in &result.removed {
        manifest.remove(name);
    }

    for asset in &result.added {
        manifest.add(asset.clone());
    }

    for asset in &result.updated {
        match manifest.assets.get_mut(&asset.name) {
            Some(existing) => {
                existing.kind = asset.kind;
                existing.category = asset.category.clone();
                existing.version = asset.version.clone();
                existing.hash = asset.hash.clone();
            }
            None => manifest.add(asset.clone()),
        }
    }
}

/// A reconciliation narrowed to one sync filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedReconcile {
    pub result: ReconcileResult,
    /// Names with changes outside the filter. Their manifest entries are
    /// stale until a sync covering them runs.
    pub deferred: BTreeSet<String>,
}

/// Narrow a whole-store reconciliation to `filter`.
///
/// `result` must diff the full scan against the full manifest, so an asset
/// that moved to another category or type shows up as an update of its name.
/// Additions and updates are kept when the asset's new location matches the
/// filter, removals when the recorded entry does. Relocations of names in
/// `duplicates` are dropped and the recorded entry stays.
pub fn scope_reconciliation(
    result: ReconcileResult,
    manifest: &Manifest,
    filter: &ScanFilter,
    duplicates: &[String],
) -> ScopedReconcile {
    let mut scoped = ScopedReconcile::default();
    scoped.result.unchanged_count = result.unchanged_count;

    for asset in result.added {
        if filter.matches(asset.kind, &asset.category) {
            scoped.result.added.push(asset);
        } else {
            scoped.deferred.insert(asset.name);
        }
    }

    for asset in result.updated {
        let recorded = manifest.get(&asset.name);
        let relocated =
            recorded.is_some_and(|e| e.kind != asset.kind || e.category != asset.category);
        if relocated && duplicates.contains(&asset.name) {
            tracing::warn!(
                asset = %asset.name,
                "Name is ambiguous in the store; keeping recorded entry"
            );
            scoped.result.unchanged_count += 1;
            continue;
        }
        if filter.matches(asset.kind, &asset.category) {
            scoped.result.updated.push(asset);
        } else {
            scoped.deferred.insert(asset.name);
        }
    }

    for name in result.removed {
        let in_scope = manifest
            .get(&name)
            .is_some_and(|e| filter.matches(e.kind, &e.category));
        if in_scope {
            scoped.result.removed.push(name);
        } else {
            scoped.deferred.insert(name);
        }
    }

    scoped
}
