//! cog CLI
//!
//! Command-line front end for the reconciliation and projection engine.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands, SyncAction, SyncArgs};
use cog_core::CleanOptions;
use error::{CliError, Result};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!("Verbose mode enabled");

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} cognitive asset manager", "cog".green().bold());
            println!();
            println!("Run {} for available commands.", "cog --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    let cwd = std::env::current_dir()?;
    match cmd {
        Commands::Init { providers } => commands::run_init(&cwd, &providers),
        Commands::Sync {
            action: Some(SyncAction::Status { json }),
            args,
        } => {
            if args != SyncArgs::default() {
                return Err(CliError::user(
                    "`cog sync status` does not accept sync flags; pass them to `cog sync`",
                ));
            }
            commands::run_sync_status(&cwd, json)
        }
        Commands::Sync { action: None, args } => commands::run_sync(&cwd, &args),
        Commands::Doctor { fix, checks, json } => commands::run_doctor(&cwd, fix, &checks, json),
        Commands::Clean {
            cache,
            orphans,
            temp,
            all,
            dry_run,
            json,
        } => {
            let options = CleanOptions {
                cache: cache || all,
                orphans: orphans || all,
                temp: temp || all,
                dry_run,
            };
            commands::run_clean(&cwd, options, json)
        }
    }
}
