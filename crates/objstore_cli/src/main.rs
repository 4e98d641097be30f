//! objstore CLI
//!
//! Command-line access to any registered storage service.
//!
//! # Commands
//!
//! - `put` - Upload a local file through a multipart upload
//! - `stat` - Show the metadata of an object
//! - `ls` - List objects under a prefix
//! - `rm` - Delete an object

mod commands;

use clap::{Parser, Subcommand};
use commands::Target;
use objstore_segment::DEFAULT_MIN_PART_SIZE;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// objstore command-line storage tools.
#[derive(Parser)]
#[command(name = "objstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Registered service type to use
    #[arg(global = true, short, long, default_value = "fs")]
    service: String,

    /// Working directory of the storager
    #[arg(global = true, short, long, default_value = ".")]
    work_dir: String,

    /// Name of the storager (bucket)
    #[arg(global = true, short, long)]
    name: Option<String>,

    /// Minimum size of every part but the last
    #[arg(global = true, long, default_value_t = DEFAULT_MIN_PART_SIZE)]
    min_part_size: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file as a multipart upload
    Put {
        /// Local file to upload
        local: PathBuf,

        /// Destination path in the storager
        path: String,

        /// Size of each uploaded part in bytes
        #[arg(short, long, default_value_t = 8 * 1024 * 1024)]
        part_size: usize,
    },

    /// Show the metadata of an object
    Stat {
        /// Object path
        path: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List objects under a prefix
    Ls {
        /// Path prefix
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Delete an object
    Rm {
        /// Object path
        path: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let target = Target {
        service: cli.service,
        work_dir: cli.work_dir,
        name: cli.name,
        min_part_size: cli.min_part_size,
    };
    let store = target.open()?;

    match cli.command {
        Commands::Put {
            local,
            path,
            part_size,
        } => commands::put::run(store, &local, &path, part_size)?,
        Commands::Stat { path, format } => commands::stat::run(store.as_ref(), &path, &format)?,
        Commands::Ls { prefix } => commands::ls::run(store.as_ref(), &prefix)?,
        Commands::Rm { path } => commands::rm::run(store.as_ref(), &path)?,
    }

    Ok(())
}
