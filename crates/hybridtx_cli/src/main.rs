//! hybridtx CLI
//!
//! Launcher and tools for the hybridtx coordinator.
//!
//! # Commands
//!
//! - `coordinator` - Run the coordinator endpoint
//! - `participant` - Run one participant node
//! - `cluster` - Run many participants on consecutive ports
//! - `loadtest` - Fire concurrent transactions at a coordinator
//! - `dump-wal` - Dump coordinator WAL records for auditing

mod commands;

use clap::{Parser, Subcommand};
use commands::loadtest::Contention;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// hybridtx two-phase commit coordinator.
#[derive(Parser)]
#[command(name = "hybridtx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (otherwise RUST_LOG, defaulting to info)
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator
    Coordinator {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8082)]
        port: u16,

        /// Write-ahead log file
        #[arg(short, long, default_value = "coordinator.log")]
        wal: PathBuf,

        /// Disable dependency analysis and run data-blind 2PC
        #[arg(long)]
        standard: bool,

        /// How long a slow-path transaction waits for its keys
        #[arg(long, default_value_t = 10_000)]
        lock_timeout_ms: u64,

        /// Upper bound between two slow-path lock attempts
        #[arg(long, default_value_t = 50)]
        poll_interval_ms: u64,

        /// Abandon a participant call after this long
        #[arg(long)]
        participant_timeout_ms: Option<u64>,
    },

    /// Run one participant node
    Participant {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8081)]
        port: u16,

        /// Simulated work before each prepare is answered
        #[arg(long, default_value_t = 3_000)]
        latency_ms: u64,

        /// Reject every prepare
        #[arg(long)]
        reject: bool,
    },

    /// Run participants on consecutive ports
    Cluster {
        /// Port of the first node
        #[arg(long, default_value_t = 8081)]
        base_port: u16,

        /// Number of nodes
        #[arg(short, long, default_value_t = 100)]
        count: u16,

        /// Simulated prepare latency of every node
        #[arg(long, default_value_t = 3_000)]
        latency_ms: u64,
    },

    /// Fire concurrent transactions at a coordinator
    Loadtest {
        /// Key contention pattern
        #[arg(short = 't', long = "type", value_enum, default_value = "high")]
        contention: Contention,

        /// Number of concurrent requests
        #[arg(short, long, default_value_t = 50)]
        requests: usize,

        /// Coordinator base URL
        #[arg(long, default_value = "http://localhost:8082")]
        coordinator: String,

        /// Participant base URL (repeat for several)
        #[arg(long = "participant", default_value = "http://localhost:8081")]
        participants: Vec<String>,
    },

    /// Dump WAL records for auditing
    DumpWal {
        /// Write-ahead log file
        #[arg(short, long, default_value = "coordinator.log")]
        wal: PathBuf,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Coordinator {
            port,
            wal,
            standard,
            lock_timeout_ms,
            poll_interval_ms,
            participant_timeout_ms,
        } => {
            commands::coordinator::run(commands::coordinator::Options {
                port,
                wal,
                standard,
                lock_timeout_ms,
                poll_interval_ms,
                participant_timeout_ms,
            })
            .await?;
        }
        Commands::Participant {
            port,
            latency_ms,
            reject,
        } => {
            commands::participant::run(port, latency_ms, reject).await?;
        }
        Commands::Cluster {
            base_port,
            count,
            latency_ms,
        } => {
            commands::participant::run_cluster(base_port, count, latency_ms).await?;
        }
        Commands::Loadtest {
            contention,
            requests,
            coordinator,
            participants,
        } => {
            let result = commands::loadtest::run(commands::loadtest::LoadTestConfig {
                contention,
                requests,
                coordinator,
                participants,
            })
            .await?;
            result.print_summary(contention);
        }
        Commands::DumpWal { wal, limit, format } => {
            commands::dump_wal::run(&wal, limit, &format)?;
        }
        Commands::Version => {
            println!("hybridtx CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("hybridtx Core v{}", hybridtx_core::VERSION);
        }
    }

    Ok(())
}
