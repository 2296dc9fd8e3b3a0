//! treewalk CLI tool.
//!
//! Usage:
//! ```bash
//! treewalk check [OPTIONS] [PATHS]...
//! treewalk list-checks
//! treewalk init
//! treewalk tree [--comments] FILE
//! ```
//!
//! `check` exits with the number of violations at or above the configured
//! severity, or `-2` when the run could not complete.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Exit code of a run that could not complete.
const FATAL_EXIT_CODE: i32 = -2;

/// Syntax tree checker with pluggable, parallel checks
#[derive(Parser)]
#[command(name = "treewalk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run checks over source files
    Check {
        /// Files or directories to check (default: current directory)
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Worker threads (overrides the config file)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Result cache file (overrides the config file)
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// List available checks and filters
    ListChecks,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Print the syntax tree of a file
    Tree {
        /// File to parse
        file: PathBuf,

        /// Include comment nodes
        #[arg(long)]
        comments: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            FATAL_EXIT_CODE
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check {
            paths,
            format,
            threads,
            exclude,
            cache,
        } => commands::check::run(&commands::check::CheckArgs {
            paths,
            format,
            threads,
            exclude,
            cache,
            config: cli.config,
        }),
        Commands::ListChecks => {
            commands::list_checks::run();
            Ok(0)
        }
        Commands::Init { force } => {
            commands::init::run(std::path::Path::new("."), force)?;
            Ok(0)
        }
        Commands::Tree { file, comments } => commands::tree::run(&file, comments),
    }
}
