mod commands;
mod logging;
mod progress;

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{BackupArgs, Cli, Commands, LookupArgs};
use dotenv::dotenv;
use photostash_core::config::load_configuration;
use photostash_core::media::NoCaptureTime;
use photostash_core::{AppConfig, ContentIndex, LookupKey, RunSummary, StashEngine};
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let loaded = load_configuration();
    let verbose = args.verbose || loaded.as_ref().map(|c| c.verbose).unwrap_or(false);

    let _guard = logging::init_logger(verbose);

    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Backup(backup)) => run_backup(apply_overrides(config, backup)),
        Some(Commands::Lookup(lookup)) => run_lookup(config, lookup),
        Some(Commands::Stats) => run_stats(&config),
        Some(Commands::PrintConfig) => print_config(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn apply_overrides(mut config: AppConfig, args: BackupArgs) -> AppConfig {
    if !args.directories.is_empty() {
        config.directories = args.directories;
    }
    if args.hash_tree_dir.is_some() {
        config.hash_tree_dir = args.hash_tree_dir;
    }
    if args.date_tree_dir.is_some() {
        config.date_tree_dir = args.date_tree_dir;
    }
    config.rescan |= args.rescan;
    config.only_images |= args.only_images;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(index_file) = args.index_file {
        config.index_file = index_file;
    }
    if args.remote_uri.is_some() {
        config.remote.uri = args.remote_uri;
    }
    if args.access_key_id.is_some() {
        config.remote.access_key_id = args.access_key_id;
    }
    if args.secret_access_key.is_some() {
        config.remote.secret_access_key = args.secret_access_key;
    }
    if let Some(region) = args.region {
        config.remote.region = region;
    }
    if args.endpoint.is_some() {
        config.remote.endpoint = args.endpoint;
    }
    config
}

fn run_backup(config: AppConfig) -> Result<()> {
    config.validate()?;
    let engine = StashEngine::new(config)?;
    let reporter = CliReporter::new();
    let summary = engine.run(&reporter)?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    info!(
        "Scan: {}, Trees: {}, Sync: {}",
        format!("{:.2}s", summary.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.tree_duration.as_secs_f64()).green(),
        format!("{:.2}s", summary.sync_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files scanned, {} distinct contents, {} unreadable",
        format!("{}", summary.files_scanned).cyan(),
        format!("{}", summary.distinct_contents).cyan(),
        format!("{}", summary.scan_failures).red(),
    );
    if let Some(tree) = &summary.hash_tree {
        info!(
            "Hash tree: {} linked, {} already present, {} failed",
            tree.created,
            tree.existing,
            format!("{}", tree.failures.len()).red(),
        );
    }
    if let Some(tree) = &summary.date_tree {
        info!(
            "Date tree: {} linked, {} already present, {} failed",
            tree.created,
            tree.existing,
            format!("{}", tree.failures.len()).red(),
        );
    }
    if let Some(sync) = &summary.sync {
        info!(
            "Sync: {} uploaded, {} already present, {} failed",
            format!("{}", sync.uploaded).green(),
            sync.skipped,
            format!("{}", sync.failed.len()).red(),
        );
        for failure in &sync.failed {
            error!("Not uploaded: {}", failure);
        }
    }
    print_sizes(summary.total_size, summary.deduped_size);
}

fn print_sizes(total_size: u64, deduped_size: u64) {
    info!("Total size of files: {}", format!("{}", total_size).yellow());
    info!(
        "Deduplicated size of files: {}",
        format!("{}", deduped_size).yellow()
    );
}

fn load_index(config: &AppConfig) -> Result<ContentIndex> {
    ContentIndex::load(&config.index_file, Arc::new(NoCaptureTime))
        .with_context(|| format!("loading index {}", config.index_file.display()))
}

fn run_lookup(mut config: AppConfig, args: LookupArgs) -> Result<()> {
    if let Some(index_file) = args.index_file {
        config.index_file = index_file;
    }
    let key = LookupKey::from_parts(args.hash.as_deref(), args.path.as_deref())?;
    let index = load_index(&config)?;
    match index.lookup(key) {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => anyhow::bail!("No record for {:?}", key),
    }
}

fn run_stats(config: &AppConfig) -> Result<()> {
    let index = load_index(config)?;
    info!(
        "{} distinct contents across {} paths",
        format!("{}", index.len()).cyan(),
        format!("{}", index.path_count()).cyan(),
    );
    print_sizes(index.total_size(), index.deduped_size());
    Ok(())
}

fn print_config(config: &AppConfig) -> Result<()> {
    println!("Configuration: {}", serde_json::to_string_pretty(config)?);
    Ok(())
}
