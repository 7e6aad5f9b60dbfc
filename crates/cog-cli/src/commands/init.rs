//! Init command implementation

use std::path::Path;

use colored::Colorize;
use cog_core::Project;

use crate::error::Result;

/// Run the init command
///
/// Creates `.cog/` with a config enabling `providers`, the store type
/// directories and an empty manifest. Existing files are kept.
pub fn run_init(path: &Path, providers: &[String]) -> Result<()> {
    println!("{} Initializing cog project...", "=>".blue().bold());

    let project = Project::init(path, providers)?;
    let enabled = project.config().enabled_providers();

    println!(
        "   Store:     {}",
        super::display_path(project.root(), &project.store_root()).cyan()
    );
    if enabled.is_empty() {
        println!("   Providers: {}", "none".dimmed());
    } else {
        println!("   Providers: {}", enabled.join(", ").yellow());
    }

    println!("{} Project initialized!", "OK".green().bold());
    println!();
    println!(
        "Add assets under {} and run {}.",
        super::display_path(project.root(), &project.store_root()).cyan(),
        "cog sync".cyan()
    );
    Ok(())
}
