//! Doctor command implementation

use std::path::Path;

use colored::{ColoredString, Colorize};
use cog_core::{CheckId, CheckResult, CheckStatus, DiagnosisReport, Doctor, FixReport, Project};

use crate::error::Result;

/// Run the doctor command
///
/// Only a missing project is fatal; a broken config shows up as a failed
/// check.
pub fn run_doctor(path: &Path, fix: bool, checks: &[CheckId], json: bool) -> Result<()> {
    let root = Project::find_root(path)?;
    let doctor = Doctor::new(root);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if fix {
        let report = runtime.block_on(doctor.fix(checks));
        if json {
            return super::print_json(&report);
        }
        print_fix_report(&report);
    } else {
        let report = runtime.block_on(doctor.diagnose(checks));
        if json {
            return super::print_json(&report);
        }
        println!("{} Running diagnostics...", "=>".blue().bold());
        print_diagnosis(&report);
        print_summary(&report);
        if report.checks.iter().any(CheckResult::needs_fix) {
            println!();
            println!("Run {} to repair.", "cog doctor --fix".cyan());
        }
    }
    Ok(())
}

fn status_tag(status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Pass => "PASS".green().bold(),
        CheckStatus::Warn => "WARN".yellow().bold(),
        CheckStatus::Fail => "FAIL".red().bold(),
        CheckStatus::Skip => "SKIP".dimmed(),
    }
}

fn print_diagnosis(report: &DiagnosisReport) {
    for check in &report.checks {
        println!(
            "   {} {:<22} {}",
            status_tag(check.status),
            check.id.as_str(),
            check.message
        );
        for detail in &check.details {
            println!("        {} {}", "-".dimmed(), detail);
        }
    }
}

fn print_summary(report: &DiagnosisReport) {
    println!();
    let summary = format!(
        "{} passed, {} warnings, {} failed, {} skipped",
        report.count(CheckStatus::Pass),
        report.count(CheckStatus::Warn),
        report.count(CheckStatus::Fail),
        report.count(CheckStatus::Skip)
    );
    if report.is_healthy() {
        println!("{} {}", "OK".green().bold(), summary);
    } else {
        println!("{} {}", "PROBLEMS".yellow().bold(), summary);
    }
}

fn print_fix_report(report: &FixReport) {
    println!("{} Repairing project...", "=>".blue().bold());
    if report.actions.is_empty() && report.failed.is_empty() {
        println!("   {}", "Nothing to fix.".dimmed());
    }
    for action in &report.actions {
        println!("   {} {}", "+".green(), action);
    }
    for failure in &report.failed {
        println!("   {} {}: {}", "!".red(), failure.id, failure.error);
    }

    println!();
    println!("{} Diagnostics after repair:", "=>".blue().bold());
    print_diagnosis(&report.after);
    print_summary(&report.after);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cog_test_utils::TestProject;

    #[test]
    fn doctor_outside_project_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(run_doctor(temp.path(), false, &[], false).is_err());
    }

    #[test]
    fn doctor_tolerates_corrupt_config() {
        let project = TestProject::new().init(&["claude"]);
        project.write_config("providers: [broken");
        run_doctor(project.root(), false, &[], false).unwrap();
    }

    #[test]
    fn fix_creates_manifest() {
        let project = TestProject::new().init(&["claude"]);
        project.add_skill("general", "helper", "1.0.0");

        run_doctor(project.root(), true, &[CheckId::Manifest], false).unwrap();
        project.assert_file_contains(".cog/manifest.json", "\"helper\"");
    }
}
