//! Cleanup of cache, temp files and orphaned provider entries

use crate::Result;
use crate::project::Project;
use crate::projector::{LinkProjector, ProviderCleanResult};
use cog_fs::io::TEMP_SUFFIX;
use cog_fs::link;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to clean. Selecting nothing selects everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    pub cache: bool,
    pub orphans: bool,
    pub temp: bool,
    pub dry_run: bool,
}

impl CleanOptions {
    pub fn all() -> Self {
        Self {
            cache: true,
            orphans: true,
            temp: true,
            dry_run: false,
        }
    }

    fn normalized(self) -> Self {
        if self.cache || self.orphans || self.temp {
            self
        } else {
            Self {
                dry_run: self.dry_run,
                ..Self::all()
            }
        }
    }
}

/// What was (or would be) removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanReport {
    pub success: bool,
    pub dry_run: bool,
    pub cache: Vec<PathBuf>,
    pub temp: Vec<PathBuf>,
    pub orphans: Vec<ProviderCleanResult>,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
}

impl CleanReport {
    pub fn removed_count(&self) -> usize {
        self.cache.len()
            + self.temp.len()
            + self.orphans.iter().map(|o| o.removed.len()).sum::<usize>()
    }
}

/// Removes disposable state from a project.
pub struct Cleaner<'a> {
    project: &'a Project,
    projector: LinkProjector,
}

impl<'a> Cleaner<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            projector: LinkProjector::new(&project.store_root(), &project.temp_dir()),
        }
    }

    pub fn with_projector(project: &'a Project, projector: LinkProjector) -> Self {
        Self { project, projector }
    }

    pub fn clean(&self, options: CleanOptions) -> Result<CleanReport> {
        let options = options.normalized();
        let mut report = CleanReport {
            dry_run: options.dry_run,
            ..CleanReport::default()
        };

        if options.cache {
            let entries = list_dir(&self.project.cache_dir());
            report.cache = self.remove_all(
                entries,
                options.dry_run,
                &mut report.bytes_freed,
                &mut report.errors,
            );
        }

        if options.temp {
            let mut entries = list_dir(&self.project.temp_dir());
            entries.extend(
                list_dir(&self.project.state_dir())
                    .into_iter()
                    .filter(|p| p.is_file() && is_temp_file(p)),
            );
            report.temp = self.remove_all(
                entries,
                options.dry_run,
                &mut report.bytes_freed,
                &mut report.errors,
            );
        }

        if options.orphans {
            self.clean_orphans(options.dry_run, &mut report)?;
        }

        report.success = report.errors.is_empty();
        tracing::info!(
            removed = report.removed_count(),
            bytes = report.bytes_freed,
            dry_run = report.dry_run,
            "Clean complete"
        );
        Ok(report)
    }

    fn clean_orphans(&self, dry_run: bool, report: &mut CleanReport) -> Result<()> {
        let config = self.project.config();
        let store = self.project.manifest_store();
        let mut manifest = store.load();
        let mut pruned = false;

        for name in config.enabled_providers() {
            let target = match config.resolve_provider(name, self.project.root()) {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("Skipping provider {}: {}", name, e);
                    continue;
                }
            };
            let result = self.projector.clean_provider(&target, &manifest, dry_run);
            if !dry_run && !result.removed.is_empty() {
                manifest.prune_sync_state(name, &result.removed);
                pruned = true;
            }
            report.bytes_freed += result.bytes_freed;
            report.errors.extend(result.errors.iter().cloned());
            report.orphans.push(result);
        }

        if pruned {
            store.save(&mut manifest)?;
        }
        Ok(())
    }

    fn remove_all(
        &self,
        entries: Vec<PathBuf>,
        dry_run: bool,
        bytes_freed: &mut u64,
        errors: &mut Vec<String>,
    ) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in entries {
            let size = link::entry_size(&path);
            if !dry_run
                && let Err(e) = link::remove_entry(&path)
            {
                errors.push(e.to_string());
                continue;
            }
            tracing::debug!(path = %path.display(), size, dry_run, "Removed");
            *bytes_freed += size;
            removed.push(path);
        }
        removed
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(TEMP_SUFFIX))
        .unwrap_or(false)
}

/// Entries directly inside `dir`, sorted. A missing dir has none.
fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}
