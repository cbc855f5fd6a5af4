mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use progress::CliReporter;
use repo_backup_core::archiver::BucketFailure;
use repo_backup_core::catalog::SqliteCatalog;
use repo_backup_core::config::{self, AppConfig};
use repo_backup_core::{BackupEngine, BackupRequest, BackupResult, Selection};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbosity);

    // Validation happens before anything touches the catalog or the disk.
    let selection = match args.selection_args().into_selection() {
        Ok(selection) => selection,
        Err(err) => {
            error!("{}", err);
            process::exit(1);
        }
    };

    let config = match config::load_configuration() {
        Ok(config) => apply_overrides(config, &args),
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    match run_backup(&config, &args, selection) {
        Ok(result) => print_summary(&result, args.dry_run),
        Err(err) => {
            error!("Error: {:#}", err);
            process::exit(1);
        }
    }
}

fn apply_overrides(mut config: AppConfig, args: &Cli) -> AppConfig {
    if let Some(repository) = &args.repository {
        config.repository_path = Some(repository.clone());
    }
    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(archiver) = args.archiver {
        config.archiver = archiver.into();
    }
    if args.no_lock {
        config.lock_destination = false;
    }
    config
}

fn run_backup(config: &AppConfig, args: &Cli, selection: Selection) -> anyhow::Result<BackupResult> {
    let engine = BackupEngine::from_config(config)?;
    let catalog_path = config
        .catalog_path
        .as_ref()
        .context("catalog_path is not set (Config.toml, REPO_BACKUP_CATALOG_PATH or --catalog)")?;

    let request = BackupRequest {
        selection,
        destination: args.location.clone(),
        exclude_patterns: config::merge_ignore_patterns(&config.ignore_patterns, &args.ignore_files),
        dry_run: args.dry_run,
    };
    info!(
        "Backing up {} into {}",
        engine.layout().root().display(),
        request.destination.display()
    );

    let catalog = SqliteCatalog::open(catalog_path)
        .with_context(|| format!("opening node catalog {}", catalog_path.display()))?;
    let reporter = CliReporter::new();
    let outcome = engine.run(&catalog, &request, &reporter);
    if let Err(err) = catalog.close() {
        warn!("Error closing node catalog: {}", err);
    }
    Ok(outcome?)
}

fn print_summary(result: &BackupResult, dry_run: bool) {
    println!();
    info!(
        "Resolve: {}, Archive: {}",
        format!("{:.2}s", result.resolve_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.archive_duration.as_secs_f64()).green(),
    );
    if dry_run {
        info!(
            "{} nodes, {} buckets would be archived",
            format!("{}", result.nodes_visited).cyan(),
            format!("{}", result.summary.jobs.len()).cyan(),
        );
    } else {
        info!(
            "{} nodes, {} archives written",
            format!("{}", result.nodes_visited).cyan(),
            format!("{}", result.summary.archived.len()).green(),
        );
    }
    for BucketFailure { bucket, reason } in &result.summary.failed {
        warn!("{} {}: {}", "FAILED".red(), bucket.display(), reason);
    }
    if result.marker_recorded {
        info!("Marker updated with {}", result.captured_at);
    }
}
