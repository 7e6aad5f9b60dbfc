//! Tests for the SyncEngine

use cog_core::manifest::AssetSource;
use cog_core::{AssetType, LinkMethod, Project, ScanFilter, SyncEngine, SyncOptions};
use cog_test_utils::TestProject;
use cog_test_utils::project::front_matter;
use pretty_assertions::assert_eq;
use std::fs;

fn open(project: &TestProject) -> Project {
    Project::open(project.root()).unwrap()
}

#[test]
fn test_dry_run_on_empty_store_changes_nothing() {
    // Scenario: empty store, dry run
    let fixture = TestProject::new().init(&["claude"]);
    let project = open(&fixture);

    let report = SyncEngine::new(&project)
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();

    assert!(report.success);
    assert!(report.dry_run);
    assert_eq!(report.scanned, 0);
    assert!(report.reconcile.is_empty());
    assert_eq!(report.providers.len(), 1);
    assert!(report.providers[0].created.is_empty());
    fixture.assert_file_not_exists(".cog/manifest.json");
    fixture.assert_file_not_exists(".claude");
}

#[test]
fn test_dry_run_on_empty_store_without_providers() {
    let fixture = TestProject::new().init(&[]);
    let project = open(&fixture);

    let report = SyncEngine::new(&project)
        .sync(&SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        })
        .unwrap();

    assert!(report.success);
    assert!(report.providers.is_empty());
    assert_eq!(report.scanned, 0);
    assert!(report.reconcile.added.is_empty());
    assert!(report.reconcile.removed.is_empty());
    assert!(report.reconcile.updated.is_empty());
    fixture.assert_file_not_exists(".cog/manifest.json");
}

#[cfg(unix)]
#[test]
fn test_first_sync_links_agent_into_provider() {
    // Scenario: first sync of a single agent to claude
    let fixture = TestProject::new().init(&["claude"]);
    let canonical = fixture.add_agent("review", "code-reviewer", "1.0.0");
    let project = open(&fixture);

    let report = SyncEngine::new(&project).sync(&SyncOptions::default()).unwrap();

    assert!(report.success);
    assert_eq!(report.reconcile.added.len(), 1);
    let claude = &report.providers[0];
    assert_eq!(claude.provider, "claude");
    assert_eq!(claude.method, LinkMethod::Symlink);
    assert_eq!(claude.created, vec!["code-reviewer"]);

    fixture.assert_links_to(".claude/agents/code-reviewer", &canonical);
    let raw = fs::read_link(fixture.path(".claude/agents/code-reviewer")).unwrap();
    assert!(raw.is_relative());

    let manifest = project.manifest_store().load();
    let entry = manifest.get("code-reviewer").unwrap();
    assert_eq!(entry.kind, AssetType::Agent);
    assert_eq!(entry.category, "review");
    assert_eq!(entry.version, "1.0.0");
    assert_eq!(entry.source, AssetSource::Local);
    let state = manifest.sync_state("claude").unwrap();
    assert_eq!(state.method, LinkMethod::Symlink);
    assert_eq!(state.assets, vec!["code-reviewer"]);
}

#[cfg(unix)]
#[test]
fn test_second_sync_is_a_no_op() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_agent("review", "code-reviewer", "1.0.0");
    fixture.add_skill("frontend", "ui-helper", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);

    engine.sync(&SyncOptions::default()).unwrap();
    let second = engine.sync(&SyncOptions::default()).unwrap();

    assert!(second.reconcile.is_empty());
    assert_eq!(second.reconcile.unchanged_count, 2);
    assert!(second.providers[0].created.is_empty());
    assert_eq!(second.providers[0].skipped.len(), 2);
}

#[cfg(unix)]
#[test]
fn test_content_change_updates_manifest_and_keeps_link() {
    // Scenario: mutate the primary file after the first sync
    let fixture = TestProject::new().init(&["claude"]);
    let canonical = fixture.add_agent("review", "code-reviewer", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);

    engine.sync(&SyncOptions::default()).unwrap();
    let before = project.manifest_store().load();
    let original = before.get("code-reviewer").unwrap().clone();

    fs::write(canonical.join("AGENT.md"), front_matter("code-reviewer", "1.1.0")).unwrap();
    let report = engine.sync(&SyncOptions::default()).unwrap();

    assert_eq!(report.reconcile.updated.len(), 1);
    assert_eq!(report.providers[0].skipped, vec!["code-reviewer"]);
    assert!(report.providers[0].created.is_empty());

    let after = project.manifest_store().load();
    let updated = after.get("code-reviewer").unwrap();
    assert_eq!(updated.version, "1.1.0");
    assert_ne!(updated.hash, original.hash);
    assert_eq!(updated.installed_at, original.installed_at);
    fixture.assert_links_to(".claude/agents/code-reviewer", &canonical);
}

#[test]
fn test_copy_mode_copies_directories() {
    let fixture = TestProject::new().init(&["cursor"]);
    fixture.add_skill("general", "notes", "1.0.0");
    fixture.write_file(".cog/store/skills/general/notes/assets/template.md", "tpl");
    let project = open(&fixture);

    let report = SyncEngine::new(&project)
        .sync(&SyncOptions {
            method: Some(LinkMethod::Copy),
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(report.providers[0].method, LinkMethod::Copy);
    assert!(!fixture.is_symlink(".cursor/skills/notes"));
    fixture.assert_file_contains(".cursor/skills/notes/assets/template.md", "tpl");
    let state = project.manifest_store().load();
    assert_eq!(state.sync_state("cursor").unwrap().method, LinkMethod::Copy);
}

#[cfg(unix)]
#[test]
fn test_filtered_sync_only_touches_subset() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_skill("frontend", "ui", "1.0.0");
    fixture.add_agent("review", "reviewer", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);

    let report = engine
        .sync(&SyncOptions {
            filter: ScanFilter::all().with_type(AssetType::Skill),
            ..SyncOptions::default()
        })
        .unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.providers[0].created, vec!["ui"]);
    fixture.assert_file_not_exists(".claude/agents/reviewer");
    let manifest = project.manifest_store().load();
    assert!(manifest.get("reviewer").is_none());

    // The agent sync must not forget the skill recorded earlier
    engine
        .sync(&SyncOptions {
            filter: ScanFilter::all().with_type(AssetType::Agent),
            ..SyncOptions::default()
        })
        .unwrap();
    let manifest = project.manifest_store().load();
    assert!(manifest.get("ui").is_some());
    assert_eq!(manifest.sync_state("claude").unwrap().assets, vec!["reviewer", "ui"]);
}

#[cfg(unix)]
#[test]
fn test_removed_asset_link_is_pruned_on_sync() {
    let fixture = TestProject::new().init(&["claude"]);
    let gone = fixture.add_skill("general", "gone", "1.0.0");
    fixture.add_skill("general", "kept", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);
    engine.sync(&SyncOptions::default()).unwrap();

    fs::remove_dir_all(gone).unwrap();
    let report = engine.sync(&SyncOptions::default()).unwrap();

    assert_eq!(report.reconcile.removed, vec!["gone"]);
    assert_eq!(report.providers[0].removed, vec!["gone"]);
    fixture.assert_file_not_exists(".claude/skills/gone");
    fixture.assert_file_exists(".claude/skills/kept");
}

#[cfg(unix)]
#[test]
fn test_foreign_entries_are_left_alone() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_skill("general", "mine", "1.0.0");
    fixture.write_file(".claude/skills/hand-written/SKILL.md", "user content");
    fixture.write_file(".claude/skills/mine/SKILL.md", "user copy");
    let project = open(&fixture);

    let report = SyncEngine::new(&project).sync(&SyncOptions::default()).unwrap();

    assert!(!report.success);
    assert_eq!(report.providers[0].errors.len(), 1);
    assert!(report.providers[0].removed.is_empty());
    fixture.assert_file_contains(".claude/skills/hand-written/SKILL.md", "user content");
    fixture.assert_file_contains(".claude/skills/mine/SKILL.md", "user copy");
}

#[test]
fn test_no_providers_is_only_a_warning() {
    let fixture = TestProject::new().init(&[]);
    fixture.add_skill("general", "lonely", "1.0.0");
    let project = open(&fixture);

    let report = SyncEngine::new(&project).sync(&SyncOptions::default()).unwrap();

    assert!(report.success);
    assert!(report.providers.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert!(project.manifest_store().load().get("lonely").is_some());
}

#[test]
fn test_unknown_provider_is_an_error() {
    let fixture = TestProject::new().init(&["claude"]);
    let project = open(&fixture);

    let result = SyncEngine::new(&project).sync(&SyncOptions {
        provider: Some("emacs".to_string()),
        ..SyncOptions::default()
    });
    assert!(matches!(result, Err(cog_core::Error::UnknownProvider { .. })));
}

#[cfg(unix)]
#[test]
fn test_status_reports_pending_and_links() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_skill("general", "first", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);

    let status = engine.status().unwrap();
    assert!(!status.in_sync);
    assert_eq!(status.pending.added.len(), 1);

    engine.sync(&SyncOptions::default()).unwrap();
    let status = engine.status().unwrap();
    assert!(status.in_sync);
    assert_eq!(status.providers[0].valid, 1);
    assert_eq!(status.providers[0].method, Some(LinkMethod::Symlink));

    fs::remove_file(fixture.path(".claude/skills/first")).unwrap();
    let status = engine.status().unwrap();
    assert!(!status.in_sync);
    assert_eq!(status.providers[0].missing, 1);
}

fn filtered(filter: ScanFilter) -> SyncOptions {
    SyncOptions {
        filter,
        ..SyncOptions::default()
    }
}

#[cfg(unix)]
#[test]
fn test_category_move_is_scoped_by_filter() {
    let fixture = TestProject::new().init(&["claude"]);
    let old_dir = fixture.add_skill("general", "mover", "1.0.0");
    fixture.add_skill("general", "stays", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);
    engine.sync(&SyncOptions::default()).unwrap();

    let store = project.manifest_store();
    let mut manifest = store.load();
    let entry = manifest.assets.get_mut("mover").unwrap();
    entry.source = AssetSource::Registry;
    entry.source_url = Some("https://registry.example.com/mover".to_string());
    store.save(&mut manifest).unwrap();
    let original = store.load().get("mover").unwrap().clone();

    let new_dir = fixture.asset_dir("skills", "frontend", "mover");
    fs::create_dir_all(new_dir.parent().unwrap()).unwrap();
    fs::rename(&old_dir, &new_dir).unwrap();

    // Filtering on the old category leaves the moved entry alone
    let report = engine
        .sync(&filtered(ScanFilter::all().with_category("general")))
        .unwrap();
    assert!(report.reconcile.is_empty(), "{:?}", report.reconcile);
    assert_eq!(report.scanned, 1);
    let manifest = store.load();
    assert_eq!(manifest.get("mover"), Some(&original));
    assert!(manifest.get("stays").is_some());

    // Filtering on the new category relocates it and keeps provenance
    let report = engine
        .sync(&filtered(ScanFilter::all().with_category("frontend")))
        .unwrap();
    assert!(report.reconcile.added.is_empty());
    assert!(report.reconcile.removed.is_empty());
    assert_eq!(report.reconcile.updated.len(), 1);
    assert_eq!(report.providers[0].created, vec!["mover"]);

    let moved = store.load().get("mover").unwrap().clone();
    assert_eq!(moved.category, "frontend");
    assert_eq!(moved.installed_at, original.installed_at);
    assert_eq!(moved.source, AssetSource::Registry);
    assert_eq!(moved.source_url, original.source_url);
    fixture.assert_links_to(".claude/skills/mover", &new_dir);
}

#[test]
fn test_type_filter_never_overwrites_another_type() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_skill("general", "shared", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);
    engine.sync(&SyncOptions::default()).unwrap();

    fixture.add_agent("review", "shared", "1.0.0");
    let report = engine
        .sync(&filtered(ScanFilter::all().with_type(AssetType::Agent)))
        .unwrap();

    assert!(report.reconcile.is_empty());
    assert!(report.errors.iter().any(|e| e.contains("Duplicate asset name 'shared'")));
    let manifest = project.manifest_store().load();
    assert_eq!(manifest.get("shared").unwrap().kind, AssetType::Skill);
    fixture.assert_file_not_exists(".claude/agents/shared");
    fixture.assert_file_exists(".claude/skills/shared");
}

#[test]
fn test_ambiguous_name_keeps_recorded_type() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_agent("review", "shared", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);
    engine.sync(&SyncOptions::default()).unwrap();

    // The skill scans first, but the agent is the recorded owner of the name
    fixture.add_skill("general", "shared", "1.0.0");
    let report = engine
        .sync(&filtered(ScanFilter::all().with_type(AssetType::Skill)))
        .unwrap();

    assert!(report.reconcile.is_empty());
    assert!(!report.errors.is_empty());
    let manifest = project.manifest_store().load();
    assert_eq!(manifest.get("shared").unwrap().kind, AssetType::Agent);
    fixture.assert_file_not_exists(".claude/skills/shared");
    fixture.assert_file_exists(".claude/agents/shared");
}

#[cfg(unix)]
#[test]
fn test_copies_stay_owned_across_method_switch() {
    let fixture = TestProject::new().init(&["claude"]);
    fixture.add_skill("general", "a", "1.0.0");
    fixture.add_agent("review", "b", "1.0.0");
    let project = open(&fixture);
    let engine = SyncEngine::new(&project);
    let copy = SyncOptions {
        method: Some(LinkMethod::Copy),
        ..SyncOptions::default()
    };

    engine.sync(&copy).unwrap();
    let report = engine
        .sync(&filtered(ScanFilter::all().with_type(AssetType::Skill)))
        .unwrap();
    assert!(report.success, "{:?}", report.providers);
    assert!(fixture.is_symlink(".claude/skills/a"));

    let state = project.manifest_store().load();
    let state = state.sync_state("claude").unwrap();
    assert_eq!(state.method, LinkMethod::Symlink);
    assert_eq!(state.assets, vec!["a", "b"]);
    assert_eq!(state.owned_copies(), ["b"]);

    let report = engine.sync(&copy).unwrap();
    assert!(report.success, "{:?}", report.providers);
    assert_eq!(report.providers[0].created, vec!["a"]);
    assert_eq!(report.providers[0].skipped, vec!["b"]);
    assert!(!fixture.is_symlink(".claude/agents/b"));
    assert!(!fixture.is_symlink(".claude/skills/a"));

    let manifest = project.manifest_store().load();
    assert_eq!(manifest.sync_state("claude").unwrap().owned_copies(), ["a", "b"]);
}
