//! Health checks and repairs
//!
//! The doctor runs an ordered list of independent checks. Each check reports
//! a status and whether `fix` knows how to repair it. Diagnosis never
//! modifies anything; only [`Doctor::fix`] does.

use crate::config::ProjectConfig;
use crate::manifest::{Manifest, ManifestStatus};
use crate::project::Project;
use crate::projector::{LinkProjector, LinkStatus};
use crate::reconcile::{LegacyHashPolicy, apply_reconciliation, reconcile_with};
use crate::registry::{self, RegistryClient};
use crate::scanner::{ScanFilter, Scanner};
use crate::{Error, Result};
use cog_fs::{ProjectPath, link};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Stable identifiers of the doctor checks, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckId {
    Environment,
    StoreDirectory,
    Config,
    Manifest,
    ManifestConsistency,
    Providers,
    ProviderLinks,
    Registry,
}

impl CheckId {
    pub const ALL: [CheckId; 8] = [
        CheckId::Environment,
        CheckId::StoreDirectory,
        CheckId::Config,
        CheckId::Manifest,
        CheckId::ManifestConsistency,
        CheckId::Providers,
        CheckId::ProviderLinks,
        CheckId::Registry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckId::Environment => "environment",
            CheckId::StoreDirectory => "store-directory",
            CheckId::Config => "config",
            CheckId::Manifest => "manifest",
            CheckId::ManifestConsistency => "manifest-consistency",
            CheckId::Providers => "providers",
            CheckId::ProviderLinks => "provider-links",
            CheckId::Registry => "registry",
        }
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CheckId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CheckId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = CheckId::ALL.iter().map(CheckId::as_str).collect();
                format!("unknown check '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl CheckStatus {
    /// Warn or fail.
    pub fn is_problem(&self) -> bool {
        matches!(self, CheckStatus::Warn | CheckStatus::Fail)
    }
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "pass"),
            CheckStatus::Warn => write!(f, "warn"),
            CheckStatus::Fail => write!(f, "fail"),
            CheckStatus::Skip => write!(f, "skip"),
        }
    }
}

/// Result of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: CheckId,
    pub status: CheckStatus,
    pub message: String,
    pub fixable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl CheckResult {
    fn new(id: CheckId, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            id,
            status,
            message: message.into(),
            fixable: false,
            details: Vec::new(),
        }
    }

    fn pass(id: CheckId, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Pass, message)
    }

    fn warn(id: CheckId, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Warn, message)
    }

    fn fail(id: CheckId, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Fail, message)
    }

    fn skip(id: CheckId, message: impl Into<String>) -> Self {
        Self::new(id, CheckStatus::Skip, message)
    }

    fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    /// Whether `fix` should act on this result.
    pub fn needs_fix(&self) -> bool {
        self.fixable && self.status.is_problem()
    }
}

/// All check results of one diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub checks: Vec<CheckResult>,
}

impl DiagnosisReport {
    pub fn get(&self, id: CheckId) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// True when nothing warns or fails.
    pub fn is_healthy(&self) -> bool {
        !self.checks.iter().any(|c| c.status.is_problem())
    }
}

/// A repair that did not succeed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixFailure {
    pub id: CheckId,
    pub error: String,
}

/// Result of `fix`: what was repaired and the diagnosis afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixReport {
    pub fixed: Vec<CheckId>,
    pub failed: Vec<FixFailure>,
    /// Actions taken, in order
    pub actions: Vec<String>,
    pub after: DiagnosisReport,
}

/// Runs diagnostics and repairs against one project.
///
/// The config is loaded leniently so a broken config is reported as a failed
/// check instead of aborting the run.
pub struct Doctor {
    project: Project,
    config_error: Option<String>,
    registry: Option<Box<dyn RegistryClient>>,
}

impl Doctor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let (config, config_error) = match ProjectConfig::load(&root) {
            Ok(config) => (config, None),
            Err(e) => (ProjectConfig::default(), Some(e.to_string())),
        };

        let registry = config.registry.as_ref().and_then(|r| match registry::from_config(r) {
            Ok(client) => Some(Box::new(client) as Box<dyn RegistryClient>),
            Err(e) => {
                tracing::warn!("Registry client unavailable: {}", e);
                None
            }
        });

        Self {
            project: Project::from_parts(root, config),
            config_error,
            registry,
        }
    }

    /// Use a specific registry client for the `registry` check.
    pub fn with_registry(mut self, client: Box<dyn RegistryClient>) -> Self {
        self.registry = Some(client);
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    fn projector(&self) -> LinkProjector {
        LinkProjector::new(&self.project.store_root(), &self.project.temp_dir())
    }

    /// Run the selected checks (all when `only` is empty).
    pub async fn diagnose(&self, only: &[CheckId]) -> DiagnosisReport {
        let mut report = DiagnosisReport::default();
        let projector = self.projector();

        for id in CheckId::ALL {
            if !only.is_empty() && !only.contains(&id) {
                continue;
            }
            let result = match id {
                CheckId::Environment => self.check_environment(),
                CheckId::StoreDirectory => self.check_store_directory(),
                CheckId::Config => self.check_config(),
                CheckId::Manifest => self.check_manifest(),
                CheckId::ManifestConsistency => self.check_manifest_consistency(),
                CheckId::Providers => self.check_providers(),
                CheckId::ProviderLinks => self.check_provider_links(&projector),
                CheckId::Registry => self.check_registry().await,
            };
            tracing::debug!(check = %id, status = %result.status, "{}", result.message);
            report.checks.push(result);
        }
        report
    }

    /// Diagnose, repair every fixable problem, then diagnose again.
    pub async fn fix(&self, only: &[CheckId]) -> FixReport {
        let before = self.diagnose(only).await;
        let mut report = FixReport::default();
        let needs = |id: CheckId| before.get(id).is_some_and(CheckResult::needs_fix);

        if needs(CheckId::StoreDirectory) {
            match self.project.ensure_layout() {
                Ok(created) => {
                    report.actions.extend(
                        created
                            .iter()
                            .map(|d| format!("Created {}", d.display())),
                    );
                    report.fixed.push(CheckId::StoreDirectory);
                }
                Err(e) => report.failed.push(FixFailure {
                    id: CheckId::StoreDirectory,
                    error: e.to_string(),
                }),
            }
        }

        let manifest_checks: Vec<CheckId> = [CheckId::Manifest, CheckId::ManifestConsistency]
            .into_iter()
            .filter(|id| needs(*id))
            .collect();
        if !manifest_checks.is_empty() {
            match self.regenerate_manifest() {
                Ok(action) => {
                    report.actions.push(action);
                    report.fixed.extend(manifest_checks);
                }
                Err(e) => report
                    .failed
                    .extend(manifest_checks.into_iter().map(|id| FixFailure {
                        id,
                        error: e.to_string(),
                    })),
            }
        }

        if needs(CheckId::ProviderLinks) {
            match self.clean_provider_links() {
                Ok(actions) => {
                    report.actions.extend(actions);
                    report.fixed.push(CheckId::ProviderLinks);
                }
                Err(e) => report.failed.push(FixFailure {
                    id: CheckId::ProviderLinks,
                    error: e.to_string(),
                }),
            }
        }

        for action in &report.actions {
            tracing::info!("{}", action);
        }
        report.after = self.diagnose(only).await;
        report
    }

    fn check_environment(&self) -> CheckResult {
        let id = CheckId::Environment;
        let platform = format!("{} ({})", std::env::consts::OS, std::env::consts::ARCH);
        if !self.project.state_dir().is_dir() {
            return CheckResult::fail(
                id,
                format!("{} not found; run `cog init`", ProjectPath::StateDir),
            );
        }

        // Symlink support is tested outside the project; diagnosis writes nothing there
        let supported = match tempfile::tempdir() {
            Ok(scratch) => link::symlinks_supported(scratch.path()),
            Err(e) => {
                tracing::warn!("Cannot create a scratch directory for the symlink check: {}", e);
                false
            }
        };
        if supported {
            CheckResult::pass(id, format!("{}, symbolic links supported", platform))
        } else {
            CheckResult::warn(
                id,
                format!("{}, symbolic links unavailable; assets will be copied", platform),
            )
        }
    }

    fn check_store_directory(&self) -> CheckResult {
        let id = CheckId::StoreDirectory;
        let mut missing: Vec<String> = vec![self.project.store_root()]
            .into_iter()
            .chain(
                crate::asset::AssetType::ALL
                    .iter()
                    .map(|t| self.project.store_root().join(t.dir_name())),
            )
            .filter(|d| !d.is_dir())
            .map(|d| d.display().to_string())
            .collect();
        missing.sort();

        if missing.is_empty() {
            CheckResult::pass(id, format!("Store at {}", self.project.store_root().display()))
        } else if !self.project.store_root().is_dir() {
            CheckResult::fail(id, "Store directory is missing")
                .fixable()
                .with_details(missing)
        } else {
            CheckResult::warn(id, format!("{} type directories missing", missing.len()))
                .fixable()
                .with_details(missing)
        }
    }

    fn check_config(&self) -> CheckResult {
        let id = CheckId::Config;
        if let Some(error) = &self.config_error {
            return CheckResult::fail(id, error.clone());
        }
        match ProjectConfig::locate(self.project.root()) {
            Some(path) => CheckResult::pass(
                id,
                format!(
                    "{} ({} providers configured)",
                    relative_display(self.project.root(), &path),
                    self.project.config().providers.len()
                ),
            ),
            None => CheckResult::warn(id, "No config file; using defaults"),
        }
    }

    fn check_manifest(&self) -> CheckResult {
        let id = CheckId::Manifest;
        match self.project.manifest_store().inspect() {
            ManifestStatus::Valid(manifest) => {
                CheckResult::pass(id, format!("{} assets recorded", manifest.len()))
            }
            ManifestStatus::Missing => CheckResult::warn(id, "Manifest not found").fixable(),
            ManifestStatus::Corrupt(reason) => {
                CheckResult::fail(id, format!("Manifest is corrupt: {}", reason)).fixable()
            }
        }
    }

    fn check_manifest_consistency(&self) -> CheckResult {
        let id = CheckId::ManifestConsistency;
        let ManifestStatus::Valid(manifest) = self.project.manifest_store().inspect() else {
            return CheckResult::skip(id, "Manifest unavailable");
        };
        if !self.project.store_root().is_dir() {
            return CheckResult::skip(id, "Store directory unavailable");
        }

        let scan = Scanner::new(self.project.store_root()).scan(&ScanFilter::all());
        let result = reconcile_with(
            &scan.assets,
            manifest.assets.values(),
            LegacyHashPolicy::Backfill,
        );
        if result.is_empty() {
            return CheckResult::pass(
                id,
                format!("{} assets match the store", result.unchanged_count),
            );
        }

        let mut details = Vec::new();
        details.extend(result.added.iter().map(|a| format!("untracked: {}", a.name)));
        details.extend(result.removed.iter().map(|n| format!("missing from store: {}", n)));
        details.extend(result.updated.iter().map(|a| format!("changed: {}", a.name)));
        CheckResult::warn(
            id,
            format!(
                "{} added, {} removed, {} updated since last sync",
                result.added.len(),
                result.removed.len(),
                result.updated.len()
            ),
        )
        .fixable()
        .with_details(details)
    }

    fn check_providers(&self) -> CheckResult {
        let id = CheckId::Providers;
        if self.config_error.is_some() {
            return CheckResult::skip(id, "Config unavailable");
        }
        let config = self.project.config();
        let enabled = config.enabled_providers();
        if enabled.is_empty() {
            return CheckResult::warn(id, "No providers enabled");
        }

        let problems: Vec<String> = enabled
            .iter()
            .filter_map(|name| config.resolve_provider(name, self.project.root()).err())
            .map(|e| e.to_string())
            .collect();
        if problems.is_empty() {
            CheckResult::pass(id, format!("Enabled: {}", enabled.join(", ")))
        } else {
            CheckResult::fail(id, format!("{} providers misconfigured", problems.len()))
                .with_details(problems)
        }
    }

    fn check_provider_links(&self, projector: &LinkProjector) -> CheckResult {
        let id = CheckId::ProviderLinks;
        if self.config_error.is_some() {
            return CheckResult::skip(id, "Config unavailable");
        }
        let manifest = self.project.manifest_store().load();
        let config = self.project.config();

        let mut details = Vec::new();
        let mut repairable = 0;
        let mut missing = 0;
        let mut valid = 0;
        for name in config.enabled_providers() {
            let Ok(target) = config.resolve_provider(name, self.project.root()) else {
                continue;
            };
            let verification = projector.verify_provider(&target, &manifest);
            valid += verification.count(LinkStatus::Valid);
            for link in verification.links.iter().filter(|l| l.status != LinkStatus::Valid) {
                repairable += 1;
                details.push(format!("{}: {} {}", name, link.status, link.path.display()));
            }
            for asset in &verification.missing {
                missing += 1;
                details.push(format!("{}: missing {}", name, asset));
            }
        }

        match (repairable, missing) {
            (0, 0) => CheckResult::pass(id, format!("{} links valid", valid)),
            (0, _) => CheckResult::warn(
                id,
                format!("{} assets not projected; run `cog sync`", missing),
            )
            .with_details(details),
            _ => CheckResult::warn(
                id,
                format!("{} broken or orphaned links, {} missing", repairable, missing),
            )
            .fixable()
            .with_details(details),
        }
    }

    async fn check_registry(&self) -> CheckResult {
        let id = CheckId::Registry;
        let Some(client) = &self.registry else {
            return CheckResult::skip(id, "No registry configured");
        };
        match client.ping().await {
            Ok(()) => CheckResult::pass(id, "Registry reachable"),
            Err(e) => CheckResult::warn(id, format!("Registry unreachable: {}", e)),
        }
    }

    /// Rebuild the manifest from the store, keeping provenance of known
    /// entries and recording hashes for legacy ones.
    fn regenerate_manifest(&self) -> Result<String> {
        let store = self.project.manifest_store();
        let mut manifest = match store.inspect() {
            ManifestStatus::Valid(manifest) => manifest,
            ManifestStatus::Missing | ManifestStatus::Corrupt(_) => Manifest::new(),
        };

        let scan = Scanner::new(self.project.store_root()).scan(&ScanFilter::all());
        let result = reconcile_with(
            &scan.assets,
            manifest.assets.values(),
            LegacyHashPolicy::Backfill,
        );
        // Sync states are left alone: they still mark owned copies that the
        // cleaner has yet to remove
        apply_reconciliation(&result, &mut manifest);
        store.save(&mut manifest)?;

        Ok(format!(
            "Regenerated manifest: {} added, {} removed, {} updated",
            result.added.len(),
            result.removed.len(),
            result.updated.len()
        ))
    }

    fn clean_provider_links(&self) -> Result<Vec<String>> {
        let config = self.project.config();
        let store = self.project.manifest_store();
        let mut manifest = store.load();
        let projector = self.projector();

        let mut actions = Vec::new();
        let mut errors = Vec::new();
        for name in config.enabled_providers() {
            let Ok(target) = config.resolve_provider(name, self.project.root()) else {
                continue;
            };
            let result = projector.clean_provider(&target, &manifest, false);
            actions.extend(
                result
                    .removed
                    .iter()
                    .map(|n| format!("Removed {} link {}", name, n)),
            );
            manifest.prune_sync_state(name, &result.removed);
            errors.extend(result.errors);
        }
        store.save(&mut manifest)?;

        if errors.is_empty() {
            Ok(actions)
        } else {
            Err(Error::ProjectionFailed {
                provider: "provider-links".to_string(),
                reason: errors.join("; "),
            })
        }
    }
}

fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("environment", CheckId::Environment)]
    #[case("store-directory", CheckId::StoreDirectory)]
    #[case("manifest-consistency", CheckId::ManifestConsistency)]
    #[case("provider-links", CheckId::ProviderLinks)]
    fn parses_check_ids(#[case] input: &str, #[case] expected: CheckId) {
        assert_eq!(input.parse::<CheckId>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn unknown_check_lists_known_ids() {
        let err = "links".parse::<CheckId>().unwrap_err();
        assert!(err.contains("provider-links"));
    }

    #[test]
    fn check_ids_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CheckId::StoreDirectory).unwrap(),
            "\"store-directory\""
        );
    }

    #[test]
    fn needs_fix_requires_problem_and_fixable() {
        let ok = CheckResult::pass(CheckId::Manifest, "ok").fixable();
        let warn = CheckResult::warn(CheckId::Manifest, "missing").fixable();
        let unfixable = CheckResult::fail(CheckId::Config, "bad");
        assert!(!ok.needs_fix());
        assert!(warn.needs_fix());
        assert!(!unfixable.needs_fix());
    }
}
