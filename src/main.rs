//! CLI entry point for the filmfetch tool.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use filmfetch_core::fetch::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use filmfetch_core::pipeline::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_DIR};
use filmfetch_core::{
    ClientSettings, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, Pipeline, PipelineOptions,
};
use tracing::{debug, info};

mod cli;
mod config;
mod progress;

use cli::Args;
use config::{FileConfig, LoadedConfig};
use progress::ProgressReporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = match args.config.as_deref() {
        Some(path) => config::load_explicit_file_config(path)?,
        None => config::load_default_file_config()?,
    };
    let file = loaded.values();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
    let default_level = log_level(&args, &file);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout is reserved for `--json` output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    log_config_source(&loaded);

    let options = resolve_options(&args, &file);
    info!(
        base_url = %options.base_url,
        output_dir = %options.output_dir.display(),
        concurrency = options.concurrency,
        max_attempts = options.max_attempts,
        "Filmfetch starting"
    );

    let show_progress = !args.quiet && !args.json && io::stderr().is_terminal();
    let pipeline = Pipeline::new(options, Arc::new(ProgressReporter::new(show_progress)));
    let report = pipeline.run().await.context("Film data pipeline failed")?;

    info!(
        films = report.films,
        succeeded = report.batch.succeeded,
        forbidden = report.batch.forbidden,
        exhausted = report.batch.exhausted,
        retried = report.batch.retried,
        "Data Extraction and Cleaning completed successfully."
    );

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to render run summary")?;
        println!("{rendered}");
    }

    Ok(())
}

fn log_level(args: &Args, file: &FileConfig) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file.verbosity.map_or("info", |v| v.filter()),
        1 => "debug",
        _ => "trace",
    }
}

fn log_config_source(loaded: &LoadedConfig) {
    match (&loaded.path, &loaded.config) {
        (Some(path), Some(_)) => debug!(path = %path.display(), "config file loaded"),
        (Some(path), None) => debug!(path = %path.display(), "no config file, using defaults"),
        (None, _) => debug!("no config directory known, using defaults"),
    }
}

/// Merges flags over config file values over built-in defaults.
fn resolve_options(args: &Args, file: &FileConfig) -> PipelineOptions {
    let concurrency = args
        .concurrency
        .or(file.concurrency)
        .map_or(DEFAULT_CONCURRENCY, usize::from);
    let max_attempts = args
        .max_attempts
        .or(file.max_attempts)
        .map_or(DEFAULT_MAX_ATTEMPTS, u32::from);
    let connect_timeout = args
        .connect_timeout
        .or(file.connect_timeout_secs)
        .unwrap_or(CONNECT_TIMEOUT_SECS);
    let read_timeout = args
        .read_timeout
        .or(file.read_timeout_secs)
        .unwrap_or(READ_TIMEOUT_SECS);

    PipelineOptions {
        base_url: args
            .base_url
            .clone()
            .or_else(|| file.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        concurrency,
        max_attempts,
        client: ClientSettings::with_timeouts(connect_timeout, read_timeout),
        clean: !(args.skip_clean || file.skip_clean.unwrap_or(false)),
    }
}
