//! # Ereweave
//!
//! Command-line driver for hypothesis search over ERE graphs.

use clap::{Parser, Subcommand};
use ereweave::cli::{self, SearchOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Ereweave CLI
#[derive(Parser)]
#[command(name = "ereweave")]
#[command(about = "Hypothesis search over entity/relation/event graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every facet of a query document against a graph
    Search {
        /// Graph file (JSON document or snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Query document
        #[arg(short, long)]
        query: PathBuf,

        /// Search configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the hypothesis collection here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Collapse coreference clusters before searching
        #[arg(long)]
        coref: bool,

        /// With --coref, give collapsed EREs fresh canonical names
        #[arg(long, requires = "coref")]
        canonical: bool,

        /// Number of top hypotheses re-ranked for novelty
        #[arg(long)]
        top_k: Option<usize>,

        /// Maximum hypotheses per facet
        #[arg(long)]
        max_hypotheses: Option<usize>,
    },

    /// Convert a graph into the binary snapshot format
    Snapshot {
        /// Graph file (JSON document or snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Snapshot output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List connecting paths between two nodes
    Paths {
        /// Graph file (JSON document or snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Start node
        #[arg(long)]
        from: String,

        /// Goal node
        #[arg(long)]
        to: String,

        /// Maximum number of paths
        #[arg(long, default_value = "10")]
        max: usize,

        /// Search configuration (JSON); its `excluded_roles` are never walked
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show graph statistics
    Status {
        /// Graph file (JSON document or snapshot)
        #[arg(short, long)]
        graph: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> cli::CliResult<()> {
    match command {
        Commands::Search {
            graph,
            query,
            config,
            output,
            coref,
            canonical,
            top_k,
            max_hypotheses,
        } => {
            let options = SearchOptions {
                config,
                coref,
                canonical,
                top_k,
                max_hypotheses,
            };
            cli::cmd_search(&graph, &query, output.as_deref(), &options)
        }
        Commands::Snapshot { graph, output } => cli::cmd_snapshot(&graph, &output),
        Commands::Paths {
            graph,
            from,
            to,
            max,
            config,
        } => cli::cmd_paths(&graph, &from, &to, max, config.as_deref()),
        Commands::Status { graph, json } => cli::cmd_status(&graph, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
