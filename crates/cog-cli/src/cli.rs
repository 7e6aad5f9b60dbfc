//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use cog_core::{AssetType, CheckId};

/// cog - Keep AI tool directories in step with one canonical asset store
#[derive(Parser, Debug)]
#[command(name = "cog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the .cog layout in the current directory
    ///
    /// Examples:
    ///   cog init                       # Enable the default provider
    ///   cog init -p claude -p cursor   # Enable specific providers
    Init {
        /// Providers to enable
        #[arg(short, long = "provider")]
        providers: Vec<String>,
    },

    /// Reconcile the store with the manifest and project assets to providers
    ///
    /// Examples:
    ///   cog sync                       # Everything, every enabled provider
    ///   cog sync --type skill          # Only skills
    ///   cog sync --provider cursor --copy
    ///   cog sync status                # Show pending changes and link health
    Sync {
        #[command(subcommand)]
        action: Option<SyncAction>,

        #[command(flatten)]
        args: SyncArgs,
    },

    /// Diagnose the project and optionally repair it
    ///
    /// Examples:
    ///   cog doctor                     # Run every check
    ///   cog doctor --check manifest-consistency
    ///   cog doctor --fix
    Doctor {
        /// Repair every fixable problem
        #[arg(long)]
        fix: bool,

        /// Run only these checks
        #[arg(short, long = "check", value_name = "ID")]
        checks: Vec<CheckId>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Remove cache, temp files and orphaned provider entries
    ///
    /// With no selection flag everything is cleaned.
    Clean {
        /// Remove registry cache artifacts
        #[arg(long)]
        cache: bool,

        /// Remove broken and orphaned provider entries
        #[arg(long)]
        orphans: bool,

        /// Remove temporary files
        #[arg(long)]
        temp: bool,

        /// Same as --cache --orphans --temp
        #[arg(long)]
        all: bool,

        /// Preview what would be removed
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Subcommands of `cog sync`
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Show pending manifest changes and provider link health
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Flags of a sync run
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncArgs {
    /// Preview changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Only sync assets of this type
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub asset_type: Option<AssetType>,

    /// Only sync assets in this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Only project to this provider
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Copy directories instead of linking them
    #[arg(long)]
    pub copy: bool,

    /// Recreate entries even when they are already correct
    #[arg(long)]
    pub force: bool,

    /// Output as JSON for CI/CD integration
    #[arg(long)]
    pub json: bool,
}
