use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use dualsync_lib::config::{self, SyncSettings};
use dualsync_lib::logging::{LogConfig, SizeRotatingWriter};
use dualsync_lib::{SyncEngine, SyncMode};

#[derive(Parser, Debug)]
#[command(name = "dualsync")]
#[command(version)]
#[command(about = "Conflict-aware sync between a local folder and a mounted cloud folder")]
struct Cli {
    /// Sync policy: bidirectional, download-only, upload-only or incremental-both
    #[arg(short, long)]
    mode: Option<SyncMode>,

    /// Local root directory
    #[arg(short, long)]
    local_dir: PathBuf,

    /// Remote root directory (defaults to <remote base>/<category>)
    #[arg(short, long)]
    remote_dir: Option<PathBuf>,

    /// Subfolder of the remote base (defaults to the local directory name)
    #[arg(short, long)]
    category: Option<String>,

    /// Glob matched against file names
    #[arg(short, long, default_value = "*")]
    pattern: String,

    /// Only top-level files
    #[arg(long)]
    no_recursive: bool,

    /// Probe and decide without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Files processed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Treat matching size and mtime as identical without hashing
    #[arg(long)]
    quick_check: bool,

    /// Directory holding config.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8, config_dir: &std::path::Path) {
    // Read before the subscriber exists; a problem is logged once it does
    let (log_config, log_config_error) = match LogConfig::try_load(config_dir) {
        Ok(config) => (config, None),
        Err(e) => (LogConfig::default(), Some(e)),
    };

    let console_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_level));

    // stdout carries the report, logs go to stderr
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = if log_config.enabled {
        match SizeRotatingWriter::new(config_dir, log_config.max_size_mb) {
            Ok(writer) => Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
                        log_config.tracing_level(),
                    )),
            ),
            Err(e) => {
                eprintln!("cannot open log file in {}: {}", config_dir.display(), e);
                None
            }
        }
    } else {
        None
    };

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Some(e) = log_config_error {
        tracing::warn!("ignoring {:#}, using default log settings", e);
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_dir = cli.config_dir.clone().unwrap_or_else(config::config_dir);
    init_logging(cli.verbose, &config_dir);

    let mut settings = SyncSettings::load(&config_dir);
    if cli.quick_check {
        settings.quick_check = true;
    }
    if let Some(jobs) = cli.jobs {
        settings.max_concurrent_transfers = jobs;
    }

    let mode = cli.mode.unwrap_or(settings.default_mode);
    let remote_root = settings
        .resolve_remote_root(
            cli.remote_dir.as_deref(),
            cli.category.as_deref(),
            &cli.local_dir,
        )
        .context("cannot determine the remote directory")?;

    let engine = SyncEngine::with_config(settings.to_sync_config(
        &cli.pattern,
        !cli.no_recursive,
        cli.dry_run,
    ));

    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight files");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = engine.run(&cli.local_dir, &remote_root, mode).await?;

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text(cli.verbose > 0));
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
