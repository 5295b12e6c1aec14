//! elfdir CLI
//!
//! Command-line tools for index directories embedded in ELF binaries.
//!
//! # Commands
//!
//! - `embed` - Append every segment and snapshot of an index as sections
//! - `list` - Show the items a binary carries for one directory
//! - `dump` - Extract one item's bytes
//! - `sections` - Print the binary's section table

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tools for index directories embedded in ELF binaries.
#[derive(Parser)]
#[command(name = "elfdir")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed an index directory into a copy of an ELF binary
    Embed {
        /// Path to the ELF executable
        binary: PathBuf,

        /// Directory name the index is embedded under
        name: String,

        /// Path to the index files (.seg and .snp)
        index: PathBuf,

        /// Output path (default: <binary>.withindex)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// objcopy program to run
        #[arg(long, default_value = "objcopy")]
        objcopy: String,
    },

    /// List the segments and snapshots embedded for a directory
    List {
        /// Path to the ELF executable
        binary: PathBuf,

        /// Directory name
        name: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write one embedded item to a file or stdout
    Dump {
        /// Path to the ELF executable
        binary: PathBuf,

        /// Directory name
        name: String,

        /// Item kind (segment, snapshot)
        kind: String,

        /// Item id, decimal or 0x-prefixed hex
        id: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the section table of an ELF binary
    Sections {
        /// Path to the ELF executable
        binary: PathBuf,

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
        Commands::Embed {
            binary,
            name,
            index,
            output,
            objcopy,
        } => {
            commands::embed::run(&binary, &name, &index, output.as_deref(), &objcopy)?;
        }
        Commands::List {
            binary,
            name,
            format,
        } => {
            commands::list::run(&binary, &name, &format)?;
        }
        Commands::Dump {
            binary,
            name,
            kind,
            id,
            output,
        } => {
            commands::dump::run(&binary, &name, &kind, &id, output.as_deref())?;
        }
        Commands::Sections { binary, format } => {
            commands::sections::run(&binary, &format)?;
        }
        Commands::Version => {
            println!("elfdir CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("section prefix: {}", elfdir_storage::SECTION_PREFIX);
        }
    }

    Ok(())
}
