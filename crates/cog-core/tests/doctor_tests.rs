//! Tests for the doctor and the cleaner

use async_trait::async_trait;
use cog_core::registry::{RegistryClient, RegistryEntry};
use cog_core::{
    CheckId, CheckStatus, CleanOptions, Cleaner, Doctor, LinkStatus, Project, SyncEngine,
    SyncOptions,
};
use cog_test_utils::TestProject;
use pretty_assertions::assert_eq;
use std::fs;

struct OfflineRegistry;

#[async_trait]
impl RegistryClient for OfflineRegistry {
    async fn download(&self, _entry: &RegistryEntry) -> cog_core::Result<Vec<u8>> {
        Err(cog_core::Error::Registry {
            message: "offline".into(),
        })
    }

    async fn list(&self) -> cog_core::Result<Vec<RegistryEntry>> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> cog_core::Result<()> {
        Err(cog_core::Error::Registry {
            message: "connection refused".into(),
        })
    }
}

fn synced_project() -> (TestProject, Project) {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_agent("review", "code-reviewer", "1.0.0");
    fixture.add_skill("general", "helper", "1.0.0");
    let project = Project::open(fixture.root()).unwrap();
    SyncEngine::new(&project).sync(&SyncOptions::default()).unwrap();
    (fixture, project)
}

#[tokio::test]
async fn test_healthy_project_passes() {
    let (fixture, _project) = synced_project();

    let report = Doctor::new(fixture.root()).diagnose(&[]).await;

    assert_eq!(report.checks.len(), 8);
    assert_eq!(report.get(CheckId::Config).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.get(CheckId::Manifest).unwrap().status, CheckStatus::Pass);
    assert_eq!(
        report.get(CheckId::ManifestConsistency).unwrap().status,
        CheckStatus::Pass
    );
    assert_eq!(report.get(CheckId::Providers).unwrap().status, CheckStatus::Pass);
    assert_eq!(report.get(CheckId::Registry).unwrap().status, CheckStatus::Skip);
}

#[tokio::test]
async fn test_diagnose_leaves_state_dir_untouched() {
    let (fixture, project) = synced_project();
    fs::remove_dir_all(project.temp_dir()).unwrap();

    let report = Doctor::new(fixture.root())
        .diagnose(&[CheckId::Environment])
        .await;

    assert_ne!(report.checks[0].status, CheckStatus::Fail);
    fixture.assert_file_not_exists(".cog/tmp");
}

#[tokio::test]
async fn test_check_filter_restricts_run() {
    let (fixture, _project) = synced_project();

    let report = Doctor::new(fixture.root())
        .diagnose(&[CheckId::Manifest, CheckId::Providers])
        .await;

    let ids: Vec<CheckId> = report.checks.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![CheckId::Manifest, CheckId::Providers]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_deleted_asset_flows_through_doctor_and_clean() {
    // Scenario: delete a synced asset from the store
    let (fixture, project) = synced_project();
    fs::remove_dir_all(fixture.asset_dir("agents", "review", "code-reviewer")).unwrap();

    let doctor = Doctor::new(fixture.root());
    let report = doctor.diagnose(&[]).await;
    let consistency = report.get(CheckId::ManifestConsistency).unwrap();
    assert_eq!(consistency.status, CheckStatus::Warn);
    assert!(consistency.fixable);
    assert_eq!(
        report.get(CheckId::ProviderLinks).unwrap().status,
        CheckStatus::Warn
    );

    let fix = doctor.fix(&[CheckId::ManifestConsistency]).await;
    assert_eq!(fix.fixed, vec![CheckId::ManifestConsistency]);
    assert!(fix.failed.is_empty());
    assert_eq!(
        fix.after.get(CheckId::ManifestConsistency).unwrap().status,
        CheckStatus::Pass
    );
    assert!(project.manifest_store().load().get("code-reviewer").is_none());

    // The link is still there until the cleaner runs
    assert!(fixture.is_symlink(".claude/agents/code-reviewer"));
    let cleaned = Cleaner::new(&project)
        .clean(CleanOptions {
            orphans: true,
            ..CleanOptions::default()
        })
        .unwrap();
    assert!(cleaned.success);
    assert_eq!(cleaned.orphans[0].removed, vec!["code-reviewer"]);
    fixture.assert_file_not_exists(".claude/agents/code-reviewer");
    fixture.assert_file_exists(".claude/skills/helper");

    let state = project.manifest_store().load();
    assert_eq!(state.sync_state("claude").unwrap().assets, vec!["helper"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_fix_cleans_provider_links() {
    let (fixture, project) = synced_project();
    fs::remove_dir_all(fixture.asset_dir("skills", "general", "helper")).unwrap();

    let fix = Doctor::new(fixture.root()).fix(&[]).await;

    assert!(fix.fixed.contains(&CheckId::ManifestConsistency));
    assert!(fix.fixed.contains(&CheckId::ProviderLinks));
    assert!(fix.after.is_healthy(), "{:?}", fix.after);
    fixture.assert_file_not_exists(".claude/skills/helper");
    assert!(project.manifest_store().load().get("helper").is_none());
}

#[tokio::test]
async fn test_corrupt_manifest_is_regenerated() {
    let (fixture, project) = synced_project();
    fs::write(project.manifest_path(), "{ truncated").unwrap();

    let doctor = Doctor::new(fixture.root());
    let report = doctor.diagnose(&[CheckId::Manifest, CheckId::ManifestConsistency]).await;
    assert_eq!(report.get(CheckId::Manifest).unwrap().status, CheckStatus::Fail);
    assert_eq!(
        report.get(CheckId::ManifestConsistency).unwrap().status,
        CheckStatus::Skip
    );

    let fix = doctor.fix(&[CheckId::Manifest]).await;
    assert_eq!(fix.fixed, vec![CheckId::Manifest]);
    let manifest = project.manifest_store().load();
    assert_eq!(manifest.len(), 2);
}

#[tokio::test]
async fn test_missing_store_directory_is_created() {
    let (fixture, project) = synced_project();
    fs::remove_dir_all(project.store_root().join("tools")).unwrap();

    let doctor = Doctor::new(fixture.root());
    let before = doctor.diagnose(&[CheckId::StoreDirectory]).await;
    assert_eq!(before.checks[0].status, CheckStatus::Warn);

    let fix = doctor.fix(&[CheckId::StoreDirectory]).await;
    assert_eq!(fix.fixed, vec![CheckId::StoreDirectory]);
    assert!(project.store_root().join("tools").is_dir());
    assert_eq!(fix.after.checks[0].status, CheckStatus::Pass);
}

#[tokio::test]
async fn test_corrupt_config_fails_without_aborting() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.write_config("providers: [not, a, map");

    let report = Doctor::new(fixture.root()).diagnose(&[]).await;

    assert_eq!(report.get(CheckId::Config).unwrap().status, CheckStatus::Fail);
    assert_eq!(report.get(CheckId::Providers).unwrap().status, CheckStatus::Skip);
    assert_eq!(report.get(CheckId::Manifest).unwrap().status, CheckStatus::Warn);
}

#[tokio::test]
async fn test_provider_without_root_fails_providers_check() {
    let fixture = TestProject::new().init(&[]);
    fixture.write_config("providers:\n  acme:\n    enabled: true\n");

    let report = Doctor::new(fixture.root())
        .diagnose(&[CheckId::Providers])
        .await;

    let providers = &report.checks[0];
    assert_eq!(providers.status, CheckStatus::Fail);
    assert!(!providers.fixable);
}

#[tokio::test]
async fn test_unreachable_registry_is_a_warning() {
    let (fixture, _project) = synced_project();

    let report = Doctor::new(fixture.root())
        .with_registry(Box::new(OfflineRegistry))
        .diagnose(&[CheckId::Registry])
        .await;

    let registry = &report.checks[0];
    assert_eq!(registry.status, CheckStatus::Warn);
    assert!(registry.message.contains("connection refused"));
}

#[cfg(unix)]
#[test]
fn test_clean_dry_run_reports_without_removing() {
    let (fixture, project) = synced_project();
    fs::remove_dir_all(fixture.asset_dir("skills", "general", "helper")).unwrap();

    let verification = {
        let config = project.config();
        let target = config.resolve_provider("claude", project.root()).unwrap();
        cog_core::LinkProjector::new(&project.store_root(), &project.temp_dir())
            .verify_provider(&target, &project.manifest_store().load())
    };
    assert_eq!(verification.count(LinkStatus::Orphaned), 1);

    let report = Cleaner::new(&project)
        .clean(CleanOptions {
            orphans: true,
            dry_run: true,
            ..CleanOptions::default()
        })
        .unwrap();
    assert_eq!(report.orphans[0].removed, vec!["helper"]);
    assert!(fixture.is_symlink(".claude/skills/helper"));
}

#[cfg(unix)]
#[test]
fn test_clean_leaves_foreign_entries() {
    let (fixture, project) = synced_project();
    let outside = fixture.write_file("notes/elsewhere/README.md", "mine");
    std::os::unix::fs::symlink(outside.parent().unwrap(), fixture.path(".claude/skills/foreign"))
        .unwrap();
    fixture.write_file(".claude/agents/hand-written/AGENT.md", "user content");
    fs::remove_dir_all(fixture.asset_dir("skills", "general", "helper")).unwrap();

    let report = Cleaner::new(&project)
        .clean(CleanOptions {
            orphans: true,
            ..CleanOptions::default()
        })
        .unwrap();

    assert_eq!(report.orphans[0].removed, vec!["helper"]);
    assert!(fixture.is_symlink(".claude/skills/foreign"));
    fixture.assert_file_contains(".claude/agents/hand-written/AGENT.md", "user content");
    fixture.assert_file_exists(".claude/agents/code-reviewer");
}
