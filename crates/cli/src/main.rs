//! loreguard CLI — the main entry point.
//!
//! Commands:
//! - `check`    — Evaluate one narrative against one backstory
//! - `batch`    — Evaluate every case in a manifest, emit CSV
//! - `validate` — Build the constraint registry and report
//! - `init`     — Print or write the default engine config

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "loreguard",
    about = "loreguard — backstory consistency checking",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a narrative against a backstory; prints 1 (consistent) or 0
    Check {
        /// Backstory constraints (.toml or .json)
        #[arg(short, long)]
        constraints: PathBuf,

        /// Narrative events (JSON Lines)
        #[arg(short, long)]
        events: PathBuf,

        /// Declared narrative length; streams the events instead of reading them up front
        #[arg(short, long)]
        length: Option<usize>,

        /// Engine config file (defaults to ~/.loreguard/config.toml)
        #[arg(long, env = "LOREGUARD_CONFIG")]
        config: Option<PathBuf>,

        /// Also print the full verdict as JSON
        #[arg(long)]
        trace: bool,
    },

    /// Evaluate every case of a manifest concurrently
    Batch {
        /// Manifest listing `[[cases]]` with id, constraints, events
        manifest: PathBuf,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Engine config file (defaults to ~/.loreguard/config.toml)
        #[arg(long, env = "LOREGUARD_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Validate a backstory and the engine config
    Validate {
        /// Backstory constraints (.toml or .json)
        #[arg(short, long)]
        constraints: PathBuf,

        /// Engine config file (defaults to ~/.loreguard/config.toml)
        #[arg(long, env = "LOREGUARD_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the default engine config, or write it with --write
    Init {
        /// Write to ~/.loreguard/config.toml if it does not exist yet
        #[arg(short, long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the verdict
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            constraints,
            events,
            length,
            config,
            trace,
        } => commands::check::run(&constraints, &events, length, config.as_deref(), trace).await?,
        Commands::Batch {
            manifest,
            output,
            config,
        } => commands::batch::run(&manifest, output.as_deref(), config.as_deref()).await?,
        Commands::Validate {
            constraints,
            config,
        } => commands::validate::run(&constraints, config.as_deref()).await?,
        Commands::Init { write } => commands::init::run(write).await?,
    }

    Ok(())
}
