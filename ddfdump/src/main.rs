use ddfdump::{dump, schema};
use std::path::PathBuf;
use tracing::Level;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[cfg(not(debug_assertions))]
const DEFAULT_DEBUG_LEVEL: u8 = 1;
#[cfg(debug_assertions)]
const DEFAULT_DEBUG_LEVEL: u8 = 99;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, default_value_t = DEFAULT_DEBUG_LEVEL, action = clap::ArgAction::Count)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// prints the field definitions of an ISO 8211 file
    Schema {
        /// The ISO 8211 file
        file: PathBuf,
    },

    /// prints the field definitions and data records of an ISO 8211 file
    Dump {
        /// The ISO 8211 file
        file: PathBuf,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Schema { file } => schema(&file)?,
        Commands::Dump { file, limit } => {
            dump(&file, limit)?;
        }
    }
    Ok(())
}
