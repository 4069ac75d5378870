//! ReplicaDB CLI
//!
//! Command-line tools for ReplicaDB replicas.
//!
//! # Commands
//!
//! - `init` - Create a replica directory and its VERSION file
//! - `apply` - Apply a changeset file to a replica
//! - `uuid` - Print the replica's UUID
//! - `revision-at-least` - Compare two revisions
//! - `journal` - List retained changeset journal files

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ReplicaDB command-line replica tools.
#[derive(Parser)]
#[command(name = "replidb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the replica directory
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
    /// Create a replica directory and its VERSION file
    Init,

    /// Apply a changeset file to the replica
    ///
    /// The number of journaled changesets comes from REPLIDB_MAX_CHANGESETS.
    Apply {
        /// File holding the changeset
        #[arg(short, long)]
        changeset: PathBuf,

        /// Require the replica's recorded revision to match the changeset
        #[arg(long)]
        valid: bool,

        /// Seconds allowed for reading the changeset
        #[arg(short, long, default_value = "60")]
        timeout_secs: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the replica's UUID (empty if unreadable)
    Uuid,

    /// Print whether revision A is at least revision B
    RevisionAtLeast {
        /// Candidate revision
        a: u64,
        /// Target revision
        b: u64,
    },

    /// List retained changeset journal files
    Journal {
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
        Commands::Init => {
            let path = cli.path.ok_or("Replica path required for init")?;
            commands::init::run(&path)?;
        }
        Commands::Apply {
            changeset,
            valid,
            timeout_secs,
            format,
        } => {
            let path = cli.path.ok_or("Replica path required for apply")?;
            commands::apply::run(&path, &changeset, valid, timeout_secs, &format)?;
        }
        Commands::Uuid => {
            let path = cli.path.ok_or("Replica path required for uuid")?;
            commands::uuid::run(&path)?;
        }
        Commands::RevisionAtLeast { a, b } => {
            commands::revision::run(a, b)?;
        }
        Commands::Journal { format } => {
            let path = cli.path.ok_or("Replica path required for journal")?;
            commands::journal::run(&path, &format)?;
        }
        Commands::Version => {
            println!("ReplicaDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("ReplicaDB Core v{}", replidb_core::VERSION);
        }
    }

    Ok(())
}
