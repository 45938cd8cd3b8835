//! resync CLI
//!
//! Command-line tools for inspecting and repairing resync task queues.
//!
//! # Commands
//!
//! - `stats` - Display queue counters
//! - `list` - List tasks
//! - `enqueue` - Add a task by hand
//! - `remove` - Drop a task
//! - `retry-failed` - Reset failed tasks to pending
//! - `clear` - Remove tasks
//! - `probe` - Run a connectivity probe

mod commands;

use clap::{Parser, Subcommand};
use resync_engine::Operation;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// resync task queue tools.
#[derive(Parser)]
#[command(name = "resync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the queue directory
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
    /// Display queue counters
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List tasks in replay order
    List {
        /// Which tasks to show (pending, failed, all)
        #[arg(short, long, default_value = "all")]
        state: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Add a task to the queue
    Enqueue {
        /// Remote collection name
        #[arg(short, long)]
        entity: String,

        /// Operation (create, update, delete)
        #[arg(short, long)]
        op: Operation,

        /// JSON payload
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Attempt budget
        #[arg(short, long, default_value_t = resync_engine::DEFAULT_MAX_ATTEMPTS)]
        max_attempts: u32,
    },

    /// Remove a task by id
    Remove {
        /// Task id
        id: String,
    },

    /// Reset failed tasks to pending
    RetryFailed,

    /// Remove tasks
    Clear {
        /// Only forget completed tasks
        #[arg(short, long)]
        completed_only: bool,
    },

    /// Probe internet and backend reachability
    Probe {
        /// Backend health URL
        #[arg(short, long)]
        backend: Option<String>,

        /// Extra header for the backend request (NAME:VALUE)
        #[arg(long = "header")]
        headers: Vec<String>,

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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Stats { format } => {
            let path = cli.path.ok_or("Queue path required for stats")?;
            commands::stats::run(&path, &format)?;
        }
        Commands::List { state, format } => {
            let path = cli.path.ok_or("Queue path required for list")?;
            commands::list::run(&path, &state, &format)?;
        }
        Commands::Enqueue {
            entity,
            op,
            payload,
            max_attempts,
        } => {
            let path = cli.path.ok_or("Queue path required for enqueue")?;
            commands::edit::enqueue(&path, &entity, op, &payload, max_attempts)?;
        }
        Commands::Remove { id } => {
            let path = cli.path.ok_or("Queue path required for remove")?;
            commands::edit::remove(&path, &id)?;
        }
        Commands::RetryFailed => {
            let path = cli.path.ok_or("Queue path required for retry-failed")?;
            commands::edit::retry_failed(&path)?;
        }
        Commands::Clear { completed_only } => {
            let path = cli.path.ok_or("Queue path required for clear")?;
            commands::edit::clear(&path, completed_only)?;
        }
        Commands::Probe {
            backend,
            headers,
            format,
        } => {
            commands::probe::run(backend, &headers, &format)?;
        }
        Commands::Version => {
            println!("resync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Snapshot format v{}", resync_engine::SNAPSHOT_VERSION);
        }
    }

    Ok(())
}
