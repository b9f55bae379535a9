//! Lensbot - Lens4U contact lens assistant
//!
//! Main entry point for the lensbot CLI.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;
mod setup;

use commands::{check, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Lensbot - Lens4U contact lens assistant
#[derive(Parser)]
#[command(name = "lensbot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (skips discovery)
    #[arg(short, long, global = true, env = "LENSBOT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat server
    Start(start::StartArgs),

    /// Validate configuration and knowledge files
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env is optional
    let dotenv = dotenvy::dotenv().ok();

    let loaded = setup::load_config(cli.config.as_deref())?;
    let _guard = init_logging(cli.verbose, &loaded.config.logging_config().dir);

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }
    for source in loaded.sources.iter().filter(|s| s.loaded) {
        tracing::debug!(layer = %source.layer, path = %source.path.display(), "Loaded config");
    }
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let config_files = loaded
        .loaded_from()
        .into_iter()
        .map(Path::to_path_buf)
        .collect();
    let ctx = commands::Context {
        config: loaded.config,
        config_files,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}

/// Console (human-readable) plus daily rolling JSON file under `log_dir`.
fn init_logging(verbose: bool, log_dir: &Path) -> WorkerGuard {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "lensbot=debug,lensbot_agent=debug,lensbot_llm=debug,lensbot_server=debug,lensbot_session=debug,lensbot_config=debug,info"
    } else {
        "lensbot=info,lensbot_agent=info,lensbot_llm=info,lensbot_server=info,lensbot_session=info,warn"
    };

    let file_appender = tracing_appender::rolling::daily(log_dir, "lensbot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "lensbot=trace,lensbot_agent=trace,lensbot_llm=trace,lensbot_server=trace,lensbot_session=trace,lensbot_config=trace,info",
                )),
        )
        .init();

    guard
}
