//! SyncEngine implementation
//!
//! The SyncEngine drives one pass of the pipeline:
//! scan the store, reconcile against the manifest, persist the manifest,
//! then project the result into every enabled provider.

use super::report::{ProviderStatus, SyncReport, SyncStatus};
use crate::config::ProviderTarget;
use crate::manifest::{Manifest, ManifestAsset, ProviderSyncState};
use crate::project::Project;
use crate::projector::{LinkProjector, LinkStatus, ProjectOptions, ProviderSyncResult};
use crate::reconcile::{apply_reconciliation, reconcile, scope_reconciliation};
use crate::scanner::{ScanFilter, Scanner};
use crate::{Error, Result};
use cog_fs::LinkMethod;
use std::collections::BTreeSet;

/// Options for a sync run
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Restrict manifest changes and projection to a type and/or category
    pub filter: ScanFilter,
    /// Restrict projection to one provider
    pub provider: Option<String>,
    /// Override the configured projection method
    pub method: Option<LinkMethod>,
    /// Recreate entries even when they are correct
    pub force: bool,
    /// Compute the plan without persisting or touching provider trees
    pub dry_run: bool,
}

/// Engine for synchronizing the store, the manifest and provider trees
pub struct SyncEngine<'a> {
    project: &'a Project,
    projector: LinkProjector,
}

impl<'a> SyncEngine<'a> {
    pub fn new(project: &'a Project) -> Self {
        let projector = LinkProjector::new(&project.store_root(), &project.temp_dir());
        Self { project, projector }
    }

    /// Use a preconfigured projector (e.g. with a fixed symlink capability).
    pub fn with_projector(project: &'a Project, projector: LinkProjector) -> Self {
        Self { project, projector }
    }

    pub fn projector(&self) -> &LinkProjector {
        &self.projector
    }

    /// Run a sync.
    ///
    /// # Errors
    ///
    /// Only unrecoverable conditions are errors: an unknown `--provider`, or
    /// a manifest that cannot be written. Per-asset problems are collected in
    /// the report.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let config = self.project.config();
        if let Some(name) = &options.provider
            && !config.providers.contains_key(name)
        {
            return Err(Error::UnknownProvider { name: name.clone() });
        }

        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..SyncReport::default()
        };
        let filter = &options.filter;

        // Names are unique across the whole store, so a filtered run still
        // reconciles everything and then keeps the changes in scope
        tracing::info!(store = %self.project.store_root().display(), "Scanning store");
        let scan = Scanner::new(self.project.store_root()).scan(&ScanFilter::all());
        report.scanned = scan
            .assets
            .iter()
            .filter(|a| filter.matches(a.kind, &a.category))
            .count();
        report.errors.extend(scan.errors);

        let store = self.project.manifest_store();
        let manifest = store.load();
        let full = reconcile(&scan.assets, manifest.assets.values());
        let scoped = scope_reconciliation(full, &manifest, filter, &scan.duplicates);
        let mut result = scoped.result;
        result.unchanged_count = report
            .scanned
            .saturating_sub(result.added.len() + result.updated.len());
        let deferred = scoped.deferred;
        if !deferred.is_empty() {
            tracing::debug!(?deferred, "Changes outside the filter are left for a later sync");
        }
        tracing::info!(
            added = result.added.len(),
            removed = result.removed.len(),
            updated = result.updated.len(),
            unchanged = result.unchanged_count,
            "Reconciled"
        );

        let mut next = manifest;
        apply_reconciliation(&result, &mut next);
        report.reconcile = result;

        if !options.dry_run {
            store.save(&mut next)?;
        }

        let providers = self.selected_providers(options, &mut report.warnings);
        for name in providers {
            let target = match config.resolve_provider(&name, self.project.root()) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("Skipping provider {}: {}", name, e);
                    report.warnings.push(format!("Skipping provider {}: {}", name, e));
                    continue;
                }
            };

            let result = self.project_provider(&target, &next, &deferred, options);
            if !options.dry_run {
                let state = next_sync_state(&next, &result, filter);
                next.set_sync_state(name, state);
            }
            report.providers.push(result);
        }

        if !options.dry_run && !report.providers.is_empty() {
            store.save(&mut next)?;
        }

        Ok(report.finish())
    }

    fn selected_providers(
        &self,
        options: &SyncOptions,
        warnings: &mut Vec<String>,
    ) -> Vec<String> {
        let config = self.project.config();
        let names: Vec<String> = match &options.provider {
            Some(name) if config.providers.get(name).is_some_and(|p| p.enabled) => {
                vec![name.clone()]
            }
            Some(name) => {
                warnings.push(format!("Provider {} is disabled", name));
                Vec::new()
            }
            None => config
                .enabled_providers()
                .into_iter()
                .map(String::from)
                .collect(),
        };

        if names.is_empty() && options.provider.is_none() {
            tracing::warn!("No providers enabled; nothing will be projected");
            warnings.push("No providers enabled; nothing projected".to_string());
        }
        names
    }

    fn project_provider(
        &self,
        target: &ProviderTarget,
        manifest: &Manifest,
        deferred: &BTreeSet<String>,
        options: &SyncOptions,
    ) -> ProviderSyncResult {
        let assets: Vec<&ManifestAsset> = manifest
            .assets
            .values()
            .filter(|a| options.filter.matches(a.kind, &a.category))
            .filter(|a| !deferred.contains(&a.name))
            .collect();

        self.projector.project(
            target,
            &assets,
            manifest.sync_state(&target.name),
            &options.filter,
            ProjectOptions {
                method: options.method.unwrap_or(self.project.config().method),
                force: options.force,
                dry_run: options.dry_run,
            },
        )
    }

    /// Pending manifest changes and link health, without modifying anything.
    pub fn status(&self) -> Result<SyncStatus> {
        let config = self.project.config();
        let scan = Scanner::new(self.project.store_root()).scan(&ScanFilter::all());
        for error in &scan.errors {
            tracing::warn!("{}", error);
        }
        let manifest = self.project.manifest_store().load();
        let pending = reconcile(&scan.assets, manifest.assets.values());

        let mut providers = Vec::new();
        for name in config.enabled_providers() {
            let state = manifest.sync_state(name);
            let mut status = ProviderStatus {
                name: name.to_string(),
                method: state.map(|s| s.method),
                last_sync: state.map(|s| s.last_sync),
                ..ProviderStatus::default()
            };

            match config.resolve_provider(name, self.project.root()) {
                Ok(target) => {
                    let verification = self.projector.verify_provider(&target, &manifest);
                    status.valid = verification.count(LinkStatus::Valid);
                    status.broken = verification.count(LinkStatus::Broken);
                    status.orphaned = verification.count(LinkStatus::Orphaned);
                    status.missing = verification.missing.len();
                }
                Err(e) => status.error = Some(e.to_string()),
            }
            providers.push(status);
        }

        let in_sync = pending.is_empty() && providers.iter().all(ProviderStatus::is_healthy);
        Ok(SyncStatus {
            in_sync,
            pending,
            providers,
        })
    }
}

/// Sync state to record after a projection.
///
/// An unfiltered run replaces the list; a filtered run only knows about its
/// subset, so earlier names outside it are kept. Copies are tracked per name:
/// a copy stays owned until it is replaced or removed, whatever method later
/// runs use.
fn next_sync_state(
    manifest: &Manifest,
    result: &ProviderSyncResult,
    filter: &ScanFilter,
) -> ProviderSyncState {
    let previous = manifest.sync_state(&result.provider);
    let projected = result.projected();

    let mut copies: BTreeSet<String> = previous
        .map(|s| s.owned_copies().iter().cloned().collect())
        .unwrap_or_default();
    for name in result.removed.iter().chain(&projected) {
        copies.remove(name);
    }
    if result.method == LinkMethod::Copy {
        copies.extend(projected.iter().cloned());
    }

    let names = if filter.is_unfiltered() {
        projected
    } else {
        let mut names: BTreeSet<String> = previous
            .map(|s| s.assets.iter().cloned().collect())
            .unwrap_or_default();
        for removed in &result.removed {
            names.remove(removed);
        }
        names.extend(projected);
        names.into_iter().collect()
    };
    ProviderSyncState::new(result.method, names).with_copies(copies.into_iter().collect())
}
