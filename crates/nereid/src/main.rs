//! Nereid CLI - File dependency graphs from the command line.
//!
//! Nereid imports a symbol occurrence index, derives file-level dependency
//! edges from it, and answers closure and cycle queries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Nereid: File-level dependency graph engine.
#[derive(Parser)]
#[command(name = "nereid")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Working directory holding `.nereid/` (defaults to current directory)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// The `(owner, repository)` a command operates on.
#[derive(Args)]
struct KeyArgs {
    /// Owner id the documents and edges are scoped to
    #[arg(long)]
    owner: String,

    /// Repository URL the documents and edges are scoped to
    #[arg(long)]
    repo: String,
}

impl KeyArgs {
    fn key(&self) -> nereid::Result<nereid::RepoKey> {
        nereid::RepoKey::new(&self.owner, &self.repo)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default `.nereid/config.yaml` and create the database
    Init,

    /// Import an occurrence index (JSON Lines, one document per line)
    Import {
        #[command(flatten)]
        key: KeyArgs,

        /// File to read, or `-` for stdin
        file: PathBuf,

        /// Extract edges right after the import
        #[arg(long)]
        extract: bool,
    },

    /// Rebuild dependency edges from the imported occurrences
    Extract {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Show what a file transitively depends on
    Closure {
        #[command(flatten)]
        key: KeyArgs,

        /// Root file (relative path as imported)
        root: String,

        /// Maximum depth (defaults to `closure.default-max-depth`)
        #[arg(short = 'D', long, allow_negative_numbers = true)]
        depth: Option<i64>,

        /// Print the closure as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the whole dependency graph as JSON
    Graph {
        #[command(flatten)]
        key: KeyArgs,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Detect circular dependencies
    Cycles {
        #[command(flatten)]
        key: KeyArgs,
    },

    /// List references to a symbol
    Refs {
        #[command(flatten)]
        key: KeyArgs,

        /// Exact symbol string
        symbol: String,
    },

    /// Show store statistics
    Stats {
        #[command(flatten)]
        key: KeyArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dir = match cli.dir {
        Some(d) => d,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let result = match cli.command {
        Commands::Init => cli::init::run(&dir),
        Commands::Import { key, file, extract } => key
            .key()
            .and_then(|key| cli::import::run(&dir, &key, &file, extract)),
        Commands::Extract { key } => key.key().and_then(|key| cli::extract::run(&dir, &key)),
        Commands::Closure {
            key,
            root,
            depth,
            json,
        } => key
            .key()
            .and_then(|key| cli::closure::run(&dir, &key, &root, depth, json)),
        Commands::Graph { key, pretty } => {
            key.key().and_then(|key| cli::graph::run(&dir, &key, pretty))
        }
        Commands::Cycles { key } => key.key().and_then(|key| cli::cycles::run(&dir, &key)),
        Commands::Refs { key, symbol } => {
            key.key().and_then(|key| cli::refs::run(&dir, &key, &symbol))
        }
        Commands::Stats { key } => key.key().and_then(|key| cli::stats::run(&dir, &key)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
