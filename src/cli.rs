use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fsexport_common::ChannelIdentifier;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fsexport")]
#[command(author, version, about = "Material archive export tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the channels of a source archive
    Channels {
        /// Archive directory (uses the configured source if not specified)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Export a time window of selected channels into a new archive
    Export {
        /// Archive directory to read from
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Directory that receives the Export_* folder
        #[arg(short, long)]
        destination: Option<PathBuf>,

        /// License file
        #[arg(short, long)]
        license: Option<PathBuf>,

        /// Start of the window (RFC 3339); defaults to the first selected frame
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// End of the window (RFC 3339); defaults to the last selected frame
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Channel to export, as type:number (repeatable; default all enabled)
        #[arg(long = "channel", value_name = "TYPE:NUMBER")]
        channels: Vec<ChannelIdentifier>,

        /// Number of channels exported concurrently
        #[arg(short, long)]
        parallelism: Option<usize>,
    },

    /// Check a license file
    License {
        /// License file to check (uses the configured one if not specified)
        file: Option<PathBuf>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
