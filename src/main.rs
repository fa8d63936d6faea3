//! transcribe4all - audio transcription job service
//!
//! Entry point for the `transcribe4all` binary.

use std::fs;

use clap::Parser;
use tracing::{debug, info};

use transcribe4all::cli::{Cli, Commands, ConfigSubcommand};
use transcribe4all::config::{self, AppConfig};
use transcribe4all::error::{Error, Result};
use transcribe4all::executor::TaskExecutor;
use transcribe4all::{logging, web};

fn main() {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    let (config_path, port) = match cli.command {
        Commands::Config { subcommand } => {
            // Config commands use minimal logging
            if let Err(e) = logging::init_simple(tracing::Level::WARN)
                .and_then(|()| handle_config_command(subcommand))
            {
                exit_with(&e);
            }
            return;
        }
        Commands::Serve { config, port } => (config, port),
    };

    let mut config = AppConfig::load(config_path.as_deref()).unwrap_or_else(|e| exit_with(&e));
    if let Some(port) = port {
        config.server.port = port;
        if let Err(e) = config.validate() {
            exit_with(&e);
        }
    }

    // The guards must be kept alive for the lifetime of the program
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)
        .unwrap_or_else(|e| exit_with(&e));

    info!(version = env!("CARGO_PKG_VERSION"), "Starting transcribe4all");

    if let Err(e) = run_server(config) {
        tracing::error!("{}", e.format_for_log());
        exit_with(&e);
    }
}

/// Print the error with its hint and exit with its category's status
fn exit_with(e: &Error) -> ! {
    eprint!("{}", e.format_for_terminal());
    std::process::exit(e.exit_code());
}

/// Run the HTTP server on a multi-threaded runtime until shutdown
fn run_server(config: AppConfig) -> Result<()> {
    info!(
        addr = %config.bind_addr(),
        work_dir = %config.transcription.work_dir,
        ffmpeg = %config.transcription.ffmpeg_path,
        "Configuration loaded"
    );

    ensure_directories(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(num_cpus::get().min(8))
        .thread_name("transcribe4all")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let executor = TaskExecutor::new();
    runtime.block_on(web::serve(&config, executor.clone()))?;

    let summary = executor.summary();
    info!(
        in_progress = summary.in_progress,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Shutdown complete"
    );
    Ok(())
}

/// Ensure the job work directory exists
fn ensure_directories(config: &AppConfig) -> Result<()> {
    let work_dir = config.work_dir();
    if !work_dir.exists() {
        debug!(path = %work_dir.display(), "Creating work directory");
        fs::create_dir_all(&work_dir).map_err(|e| Error::IoWrite {
            path: work_dir.clone(),
            source: e,
        })?;
    }
    Ok(())
}

/// Handle config subcommands
fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AppConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            AppConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
