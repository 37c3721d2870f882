//! Satchel - document-backed request sessions
//!
//! Main entry point for the Satchel operator CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{destroy, init, list, show, stats, sweep};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Satchel - inspect and maintain a session store
#[derive(Parser)]
#[command(name = "satchel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file layered over the discovered ones
    #[arg(short, long, global = true, env = "SATCHEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate configuration and create the session collection
    Init(init::InitArgs),

    /// Delete expired sessions, once or on an interval
    Sweep(sweep::SweepArgs),

    /// Show session counts
    Stats(stats::StatsArgs),

    /// Show one session by token
    Show(show::ShowArgs),

    /// Delete one session
    Destroy(destroy::DestroyArgs),

    /// List the most recently active sessions
    List(list::ListArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "satchel=debug,satchel_session=debug,satchel_store=debug,satchel_config=debug,info"
    } else {
        "satchel=info,satchel_session=info,satchel_store=warn,warn"
    };

    let log_dir = satchel_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "satchel.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "satchel=trace,satchel_session=trace,satchel_store=trace,satchel_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Init(args) => init::run(args, &ctx).await,
        Commands::Sweep(args) => sweep::run(args, &ctx).await,
        Commands::Stats(args) => stats::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Destroy(args) => destroy::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
    }
}
