//! SnapKeep CLI
//!
//! Command-line tools for SnapKeep artifact directories.
//!
//! # Commands
//!
//! - `inspect` - List the commits stored in a directory
//! - `backup` - Copy a snapshotted commit to another directory
//! - `simulate` - Run a writer against concurrent snapshot consumers

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SnapKeep command-line tools.
#[derive(Parser)]
#[command(name = "snapkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the artifact directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the commits stored in a directory
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Copy the current commit's artifacts to another directory
    Backup {
        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,

        /// Copy every retained commit, not just the current one
        #[arg(short, long)]
        all: bool,
    },

    /// Run a writer against concurrent snapshot consumers in memory
    Simulate {
        /// Number of commits to write
        #[arg(short, long, default_value = "1000")]
        commits: usize,

        /// Number of snapshot consumers
        #[arg(short, long, default_value = "4")]
        readers: usize,

        /// Snapshots each consumer may hold at once
        #[arg(long, default_value = "3")]
        max_held: usize,

        /// Keep this many commits instead of only the last one
        #[arg(short, long)]
        keep_last: Option<usize>,

        /// Leave released commits for the next commit cycle
        #[arg(short, long)]
        deferred: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Artifact directory required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Backup { output, all } => {
            let path = cli.path.ok_or("Artifact directory required for backup")?;
            commands::backup::run(&path, &output, all)?;
        }
        Commands::Simulate {
            commits,
            readers,
            max_held,
            keep_last,
            deferred,
            format,
        } => {
            let options = commands::simulate::SimulateOptions {
                commits,
                readers,
                max_held,
                keep_last,
                deferred,
            };
            commands::simulate::run(&options, &format)?;
        }
        Commands::Version => {
            println!("SnapKeep CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("SnapKeep Core v{}", snapkeep_core::VERSION);
        }
    }

    Ok(())
}
