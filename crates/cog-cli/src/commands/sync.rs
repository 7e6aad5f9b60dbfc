//! Sync and sync status command implementations

use std::path::Path;

use colored::Colorize;
use cog_core::{
    LinkMethod, Project, ProviderStatus, ProviderSyncResult, ScanFilter, SyncEngine, SyncOptions,
    SyncReport, SyncStatus,
};

use crate::cli::SyncArgs;
use crate::error::Result;

impl SyncArgs {
    fn to_options(&self) -> SyncOptions {
        let mut filter = ScanFilter::all();
        if let Some(kind) = self.asset_type {
            filter = filter.with_type(kind);
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category.clone());
        }
        SyncOptions {
            filter,
            provider: self.provider.clone(),
            method: self.copy.then_some(LinkMethod::Copy),
            force: self.force,
            dry_run: self.dry_run,
        }
    }
}

/// Run the sync command
///
/// Per-asset failures are reported but do not fail the command.
pub fn run_sync(path: &Path, args: &SyncArgs) -> Result<()> {
    let project = Project::discover(path)?;
    let engine = SyncEngine::new(&project);

    if args.json {
        let report = engine.sync(&args.to_options())?;
        return super::print_json(&report);
    }

    if args.dry_run {
        println!("{} Planning sync (dry run)...", "=>".blue().bold());
    } else {
        println!("{} Synchronizing assets...", "=>".blue().bold());
    }
    let report = engine.sync(&args.to_options())?;
    print_sync_report(&report);
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    let reconcile = &report.reconcile;
    println!(
        "   Scanned {} assets: {} added, {} removed, {} updated, {} unchanged",
        report.scanned,
        reconcile.added.len(),
        reconcile.removed.len(),
        reconcile.updated.len(),
        reconcile.unchanged_count
    );
    for asset in &reconcile.added {
        println!("   {} {} ({})", "+".green(), asset.name.cyan(), asset.kind);
    }
    for name in &reconcile.removed {
        println!("   {} {}", "-".red(), name.cyan());
    }
    for asset in &reconcile.updated {
        println!("   {} {} ({})", "~".yellow(), asset.name.cyan(), asset.version);
    }

    for provider in &report.providers {
        print_provider_result(provider);
    }
    for warning in &report.warnings {
        println!("{} {}", "WARN".yellow().bold(), warning);
    }
    for error in &report.errors {
        println!("   {} {}", "!".red(), error);
    }

    let verb = if report.dry_run { "Plan" } else { "Sync" };
    if report.success {
        println!("{} {} complete.", "OK".green().bold(), verb);
    } else {
        println!(
            "{} {} finished with {} errors.",
            "ERROR".red().bold(),
            verb,
            report.error_count()
        );
    }
}

fn print_provider_result(result: &ProviderSyncResult) {
    println!(
        "{} {} ({}): {} created, {} skipped, {} removed",
        "=>".blue().bold(),
        result.provider.bold(),
        result.method.to_string().dimmed(),
        result.created.len(),
        result.skipped.len(),
        result.removed.len()
    );
    for name in &result.created {
        println!("   {} {}", "+".green(), name);
    }
    for name in &result.removed {
        println!("   {} {}", "-".red(), name);
    }
    for error in &result.errors {
        println!("   {} {}", "!".red(), error);
    }
}

/// Run `sync status`
pub fn run_sync_status(path: &Path, json: bool) -> Result<()> {
    let project = Project::discover(path)?;
    let status = SyncEngine::new(&project).status()?;

    if json {
        return super::print_json(&status);
    }
    print_status(&status);
    Ok(())
}

fn print_status(status: &SyncStatus) {
    println!("{}", "Sync Status".bold());
    println!();

    let pending = &status.pending;
    if pending.is_empty() {
        println!(
            "{}: {} assets tracked, nothing pending",
            "Manifest".dimmed(),
            pending.unchanged_count
        );
    } else {
        println!(
            "{}: {} to add, {} to remove, {} to update",
            "Manifest".dimmed(),
            pending.added.len(),
            pending.removed.len(),
            pending.updated.len()
        );
    }
    println!();

    println!("{}:", "Providers".bold());
    if status.providers.is_empty() {
        println!("  {}", "None enabled".dimmed());
    }
    for provider in &status.providers {
        print_provider_status(provider);
    }
    println!();

    if status.in_sync {
        println!("{} In sync.", "OK".green().bold());
    } else {
        println!("{} Out of sync. Run {}.", "DRIFTED".yellow().bold(), "cog sync".cyan());
    }
}

fn print_provider_status(provider: &ProviderStatus) {
    if let Some(error) = &provider.error {
        println!("  {} {}: {}", "!".red(), provider.name.cyan(), error);
        return;
    }
    let marker = if provider.is_healthy() {
        "+".green()
    } else {
        "!".yellow()
    };
    let method = provider
        .method
        .map(|m| m.to_string())
        .unwrap_or_else(|| "never synced".to_string());
    println!(
        "  {} {} ({}): {} valid, {} broken, {} orphaned, {} missing",
        marker,
        provider.name.cyan(),
        method.dimmed(),
        provider.valid,
        provider.broken,
        provider.orphaned,
        provider.missing
    );
}
