//! Clean command implementation

use std::path::Path;

use colored::Colorize;
use cog_core::{CleanOptions, CleanReport, Cleaner, Project};

use crate::error::Result;

/// Run the clean command
pub fn run_clean(path: &Path, options: CleanOptions, json: bool) -> Result<()> {
    let project = Project::discover(path)?;
    let report = Cleaner::new(&project).clean(options)?;

    if json {
        return super::print_json(&report);
    }
    print_clean_report(project.root(), &report);
    Ok(())
}

fn print_clean_report(root: &Path, report: &CleanReport) {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    if report.dry_run {
        println!("{} Cleaning project (dry run)...", "=>".blue().bold());
    } else {
        println!("{} Cleaning project...", "=>".blue().bold());
    }

    for path in report.cache.iter().chain(&report.temp) {
        println!("   {} {}", "-".red(), super::display_path(root, path));
    }
    for provider in &report.orphans {
        for name in &provider.removed {
            println!("   {} {} ({})", "-".red(), name.cyan(), provider.provider.dimmed());
        }
    }
    for error in &report.errors {
        println!("   {} {}", "!".red(), error);
    }

    let count = report.removed_count();
    if count == 0 {
        println!("{} Nothing to clean.", "OK".green().bold());
    } else if report.success {
        println!(
            "{} {} {} entries, {} freed.",
            "OK".green().bold(),
            verb,
            count,
            super::format_bytes(report.bytes_freed)
        );
    } else {
        println!(
            "{} {} {} entries with {} errors.",
            "ERROR".red().bold(),
            verb,
            count,
            report.errors.len()
        );
    }
}
