//! SegLog CLI
//!
//! Command-line interface for inspecting and maintaining a log directory.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use seglog::{Config, Log, Record};
use tracing_subscriber::{fmt, EnvFilter};

/// SegLog CLI
#[derive(Parser, Debug)]
#[command(name = "seglog-cli")]
#[command(about = "CLI for SegLog segmented commit logs")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = "./seglog_data")]
    dir: PathBuf,

    /// Store size limit per segment in bytes (0 = default)
    #[arg(long, default_value = "0")]
    max_store_bytes: u64,

    /// Index size limit per segment in bytes (0 = default)
    #[arg(long, default_value = "0")]
    max_index_bytes: u64,

    /// Offset of the first record in a new log
    #[arg(long, default_value = "0")]
    initial_offset: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show offsets and segment count
    Info,

    /// Append one record per value
    Append {
        /// The values to append
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Read the record at an offset
    Read {
        /// The offset to read
        offset: u64,
    },

    /// Remove segments whose records are all at or below an offset
    Truncate {
        /// Highest offset that may be dropped
        lowest: u64,
    },

    /// Write the raw contents of every segment to a file
    Export {
        /// Snapshot file to create
        file: PathBuf,
    },

    /// Replace the log with the contents of a snapshot file
    Import {
        /// Snapshot file to read
        file: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,seglog=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> seglog::Result<()> {
    let config = Config::builder()
        .max_store_bytes(args.max_store_bytes)
        .max_index_bytes(args.max_index_bytes)
        .initial_offset(args.initial_offset)
        .build();

    let log = Log::open(&args.dir, config)?;

    match args.command {
        Commands::Info => {
            println!("directory:      {}", log.dir().display());
            println!("segments:       {}", log.segment_count());
            println!("lowest offset:  {}", log.lowest_offset()?);
            println!("highest offset: {}", log.highest_offset()?);
        }
        Commands::Append { values } => {
            for value in values {
                let (offset, _) = log.append(Record::new(value))?;
                println!("{}", offset);
            }
        }
        Commands::Read { offset } => {
            let record = log.read(offset)?;
            println!("{}", String::from_utf8_lossy(&record.value));
        }
        Commands::Truncate { lowest } => {
            log.truncate(lowest)?;
            println!("lowest offset: {}", log.lowest_offset()?);
        }
        Commands::Export { file } => {
            let mut writer = BufWriter::new(File::create(&file)?);
            let written = std::io::copy(&mut log.reader(), &mut writer)?;
            writer.flush()?;
            println!("exported {} bytes to {}", written, file.display());
        }
        Commands::Import { file } => {
            let reader = BufReader::new(File::open(&file)?);
            let restored = log.restore(reader)?;
            println!("imported {} records from {}", restored, file.display());
        }
    }

    log.close()
}
