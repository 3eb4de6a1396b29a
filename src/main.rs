//! geomorph - river channel analysis proxy and client
//!
//! Serves the two analysis proxy routes in front of the geomorphology
//! service, or runs an analysis session against them: upload a stream
//! export, edit interpretability toggles, re-analyze, and render the
//! resulting table and channel distribution.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, connection, upstream failure, etc.)

mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod proxy;
mod report;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{AnalyzeArgs, Args, Command, OutputFormat};
use client::{AnalysisClient, UploadFile};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::ReportMetadata;
use state::AnalysisStateStore;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("geomorph v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = match load_config(&args) {
        Ok(config) => run(&args, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("geomorph failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Dispatch the selected subcommand.
async fn run(args: &Args, mut config: Config) -> Result<()> {
    config.merge_with_args(args);

    match &args.command {
        Command::Serve(_) => proxy::serve(&config.server, &config.upstream).await,
        Command::Analyze(analyze) => run_session(args, analyze, &config).await,
        Command::InitConfig => handle_init_config(),
    }
}

/// Handle init-config: generate a default .geomorph.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your analysis service and proxy.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over the verbosity flags when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_from_dir(Path::new(".")) {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Run one analysis session against the proxy and render the store.
async fn run_session(args: &Args, analyze: &AnalyzeArgs, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    let client = AnalysisClient::new(config.client.clone(), Arc::new(AnalysisStateStore::new()))?;
    let store = client.store();

    let rows_view =
        store.subscribe_rows(|rows| debug!("Segment table now holds {} rows", rows.len()));
    let chart_view = store
        .subscribe_chart(|chart| debug!("Distribution chart now holds {} slices", chart.len()));

    // Step 1: upload
    let file = UploadFile::from_path(&analyze.file).await?;
    let source_file = file.file_name.clone();

    let progress = spinner(args.quiet, format!("Analyzing {}...", source_file));
    let uploaded = client.upload(file).await;
    progress.finish_and_clear();
    let rows = uploaded?;
    info!("Received {} segments", rows.len());

    // Step 2: local toggle edits
    let mut toggles_applied = 0;
    for (id, value) in &analyze.toggle {
        if store.update_toggle(id, *value) {
            toggles_applied += 1;
        } else {
            warn!("No segment with id {}, toggle skipped", id);
        }
    }

    if analyze.reset_toggles {
        info!("Resetting toggles to the service classification");
        store.reset_toggles();
    }

    // Step 3: optional re-analysis of the edited table
    if analyze.reanalyze {
        let progress = spinner(args.quiet, "Re-analyzing segment table...".to_string());
        let reanalyzed = client.reanalyze().await;
        progress.finish_and_clear();
        let returned = reanalyzed?;
        debug!("Re-analysis returned {} rows (not stored)", returned.len());
    }

    // Step 4: render
    let metadata = ReportMetadata {
        source_file,
        server_url: config.client.server_url.clone(),
        generated_at: Utc::now(),
        toggles_applied,
        toggles_reset: analyze.reset_toggles,
        reanalyzed: analyze.reanalyze,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    store.unsubscribe_rows(rows_view);
    store.unsubscribe_chart(chart_view);
    let report = report::build_report(store, metadata);

    let output = match analyze.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match &analyze.output {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Spinner shown while a request is in flight.
fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
