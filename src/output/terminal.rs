use crate::crx::{CrxHeader, CrxPackage};
use crate::models::{InstallOrigin, InstallReport, InstalledExtension};
use crate::update::{TickOutcome, UpdateAvailable};
use colored::*;

pub fn print_installed(extensions: &[InstalledExtension]) {
    println!("{}", "── Installed Extensions ─────────────────────────────────────".bright_black());

    if extensions.is_empty() {
        println!("  {}", "(none)".bright_black());
        println!();
        return;
    }

    for extension in extensions {
        let origin = match &extension.origin {
            InstallOrigin::Store { id } => format!("store {}", id).green(),
            InstallOrigin::Unpacked => "unpacked".yellow(),
        };
        println!(
            "  {} {:<30} {:<12} {}",
            "●".blue(),
            extension.name().bold(),
            extension.version(),
            origin
        );
        println!("      {}", extension.path.display().to_string().bright_black());
    }

    println!();
}

pub fn print_install_report(report: &InstallReport) {
    match report {
        InstallReport::Installed { id, version, path } => {
            println!("  {} {} {}", "✔".green(), id, version.bold());
            println!("      {}", path.display().to_string().bright_black());
        }
        InstallReport::Failed { id, kind, message } => {
            println!("  {} {} {}", "✖".red(), id, format!("{:?}", kind).red().bold());
            println!("      {}", message.bright_black());
        }
    }
}

pub fn print_package(package: &CrxPackage) {
    println!("{}", "┌─────────────────────────────────────────────────────────────┐".bright_black());
    println!("│  ID: {:<55}│", package.id);
    println!(
        "│  Format: CRX{} │ Key: {:>5} bytes │ Payload: {:>9} bytes  │",
        package.format_version(),
        package.public_key.len(),
        package.payload.len()
    );
    if let CrxHeader::V3 { proofs, .. } = &package.header {
        println!("│  Key proofs: {:<47}│", proofs.len());
    }
    println!("{}", "└─────────────────────────────────────────────────────────────┘".bright_black());
}

pub fn print_updates(updates: &[UpdateAvailable]) {
    println!("{}", "── Updates ──────────────────────────────────────────────────".bright_black());

    if updates.is_empty() {
        println!("  {}", "Everything is up to date".bright_black());
    }
    for update in updates {
        let arrow = "→".bright_black();
        println!("  {} {} {}", arrow, update.id, update.version.cyan());
        println!("      {}", update.url.bright_black());
    }

    println!();
}

pub fn print_tick(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::SkippedIdle(state) => {
            println!("  {} skipped, system is {:?}", "ℹ".bright_black(), state)
        }
        TickOutcome::SkippedInterval => {
            println!("  {} skipped, checked recently", "ℹ".bright_black())
        }
        TickOutcome::Checked { updated, failed } => {
            let failed = if *failed > 0 {
                failed.to_string().red()
            } else {
                failed.to_string().normal()
            };
            println!("  {} {} updated, {} failed", "✔".green(), updated, failed);
        }
    }
}
