//! EVIO CLI
//!
//! Command-line tools for EVIO event files.
//!
//! # Commands
//!
//! - `inspect` - Display block and header summary
//! - `verify` - Read, decode and swap-check every event
//! - `dump` - Print event trees with type names
//! - `copy` - Re-write a file with new block, split and naming settings

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EVIO event file tools.
#[derive(Parser)]
#[command(name = "evio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the EVIO file
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
    /// Display block and header summary
    Inspect {
        /// Show every block header
        #[arg(short, long)]
        blocks: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify every event of a file
    Verify {
        /// Skip the swap round-trip check
        #[arg(long)]
        no_swap: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print decoded event trees
    Dump {
        /// First event to print (1-based)
        #[arg(short, long, default_value = "1")]
        start: usize,

        /// Maximum number of events to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Copy events into new files
    Copy {
        /// Output file name template
        output: String,

        /// Target block size in words
        #[arg(short, long)]
        block_words: Option<u32>,

        /// Maximum events per block
        #[arg(short = 'n', long)]
        max_events: Option<u32>,

        /// Split output files at this many bytes
        #[arg(short, long)]
        split: Option<u64>,

        /// Run number for file names
        #[arg(short, long)]
        run: Option<u32>,

        /// Run type for file names
        #[arg(short = 't', long)]
        run_type: Option<String>,

        /// Extra configuration requests as tag=value
        #[arg(long = "set")]
        controls: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { blocks, format } => {
            let path = cli.path.ok_or("File path required for inspect")?;
            commands::inspect::run(&path, blocks, &format)?;
        }
        Commands::Verify { no_swap, format } => {
            let path = cli.path.ok_or("File path required for verify")?;
            commands::verify::run(&path, !no_swap, &format)?;
        }
        Commands::Dump {
            start,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("File path required for dump")?;
            commands::dump::run(&path, start, limit, &format)?;
        }
        Commands::Copy {
            output,
            block_words,
            max_events,
            split,
            run,
            run_type,
            controls,
            format,
        } => {
            let path = cli.path.ok_or("File path required for copy")?;
            let settings = commands::copy::CopySettings {
                block_words,
                max_block_events: max_events,
                split_bytes: split,
                run_number: run,
                run_type,
                controls,
            };
            commands::copy::run(&path, &output, &settings, &format)?;
        }
        Commands::Version => {
            println!("EVIO CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EVIO Core v{}", evio_core::VERSION);
        }
    }

    Ok(())
}
