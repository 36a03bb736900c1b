//! Leaxer CLI - validate and run compute graphs from the command line.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use leaxer_core::settings::ComputeBackend;
use leaxer_engine::observability::{TracingConfig, TracingGuard, init_tracing};
use std::path::PathBuf;

/// Leaxer - layered execution of node graphs.
#[derive(Parser)]
#[command(name = "leaxer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a graph file (JSON or YAML) and print its execution layers
    Validate {
        /// Path to the graph file
        file: PathBuf,
    },

    /// Run one or more graph files through the job queue
    Run {
        /// Graph files, submitted together
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Compute backend (auto, cpu, cuda, metal, vulkan)
        #[arg(short, long)]
        backend: Option<ComputeBackend>,

        /// Keep submission order instead of grouping jobs by model
        #[arg(long)]
        no_batching: bool,

        /// Print every engine event as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// List the available node types and their ports
    Nodes {
        /// Print node descriptions as JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    init_tracing(TracingConfig::from_env().with_verbosity(verbosity))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Validate { file } => commands::validate::run(&file),
        Commands::Run {
            files,
            config,
            backend,
            no_batching,
            json,
        } => {
            let options = commands::run::RunOptions {
                config,
                backend,
                no_batching,
                json,
            };
            commands::run::run(&files, options).await
        }
        Commands::Nodes { json } => commands::nodes::run(json),
    }
}
