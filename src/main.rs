use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use extstore::config::StoreConfig;
use extstore::input::resolve_extension_id;
use extstore::install::{InstallCoordinator, installed_extensions_async};
use extstore::output::terminal;
use extstore::update::{AlwaysActive, UpdateChecker, UpdateScheduler, UpdaterState};

#[derive(Parser, Debug)]
#[command(name = "extstore")]
#[command(version, about = "Install and update Chrome web store extensions")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extensions directory (overrides the configuration file)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install an extension by ID or web store URL
    Install { input: String },
    /// Remove every installed version of an extension
    Uninstall { input: String },
    /// List installed extensions
    List,
    /// Parse a local CRX file and print its identity
    Inspect { file: PathBuf },
    /// Check for updates once and apply them
    Update {
        /// Only report available updates
        #[arg(long)]
        dry_run: bool,
    },
    /// Keep running and apply updates periodically
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = cli.dir {
        config.extensions_dir = dir;
    }

    match cli.command {
        Command::Install { input } => {
            let id = resolve_extension_id(&input)?;
            let coordinator = InstallCoordinator::from_config(&config)?;
            let report = coordinator.install_report(&id).await;
            terminal::print_install_report(&report);
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Command::Uninstall { input } => {
            let id = resolve_extension_id(&input)?;
            let coordinator = InstallCoordinator::from_config(&config)?;
            if !coordinator.uninstall(&id).await? {
                println!("Extension {} is not installed", id);
            }
        }
        Command::List => {
            let installed = installed_extensions_async(&config.extensions_dir).await?;
            terminal::print_installed(&installed);
        }
        Command::Inspect { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let package = extstore::crx::parse(&data).context("Failed to parse CRX")?;
            terminal::print_package(&package);
        }
        Command::Update { dry_run: true } => {
            let checker = UpdateChecker::new(&config)?;
            let installed: Vec<_> = installed_extensions_async(&config.extensions_dir)
                .await?
                .into_iter()
                .filter(|e| e.is_store())
                .collect();
            let updates = checker
                .check_updates(&UpdaterState::new(), &installed)
                .await?;
            terminal::print_updates(&updates);
        }
        Command::Update { dry_run: false } => {
            let mut scheduler = scheduler(&config)?;
            let outcome = scheduler.tick(tokio::time::Instant::now()).await?;
            terminal::print_tick(&outcome);
        }
        Command::Watch => {
            let scheduler = scheduler(&config)?;
            scheduler
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
    }

    Ok(())
}

fn scheduler(config: &StoreConfig) -> Result<UpdateScheduler> {
    let coordinator = Arc::new(InstallCoordinator::from_config(config)?);
    let checker = UpdateChecker::new(config)?;
    Ok(UpdateScheduler::new(
        config.clone(),
        coordinator,
        checker,
        Arc::new(AlwaysActive),
    ))
}
