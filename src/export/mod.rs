//! Export of selected channels into a fresh archive.
//!
//! - `pipeline` - One export run: file enumeration, writer lifecycle, final catalog files
//! - `transfer` - Scanning one source file into one output file
//! - `progress` - Progress accounting shared by channel workers
//! - `controller` - [`Exporter`], which runs exports in the background

mod controller;
mod pipeline;
mod progress;
mod transfer;

pub use controller::Exporter;
pub use pipeline::{destination_dir_name, ExportPipeline};
pub use progress::{ProgressSender, ProgressTracker};
pub use transfer::{FileStats, StopReason};

use std::path::PathBuf;

use fsexport_common::{ChannelIdentifier, TimeInterval};
use fsexport_index::{IndexError, IndexRecord};
use fsexport_media::scanner::ScanOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Channel;
use crate::config::ExportConfig;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Source path is invalid!")]
    EmptySourcePath,

    #[error("Destination path is invalid!")]
    EmptyDestinationPath,

    #[error("Cannot create destination directory {}: {source}", path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot start channel workers: {0}")]
    WorkerPool(String),

    #[error("Cannot write export catalog: {0}")]
    Index(#[from] IndexError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportOutcome {
    /// Index and archive info were written.
    Completed,
    /// Nothing was exported; no catalog files were written.
    Empty,
    Cancelled,
    Failed,
}

/// A channel to export and its source records, captured when a run starts.
#[derive(Debug, Clone)]
pub struct ChannelPlan {
    pub id: ChannelIdentifier,
    pub records: Vec<IndexRecord>,
}

impl From<&Channel> for ChannelPlan {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id(),
            records: channel.records().to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub interval: TimeInterval,
    pub channels: Vec<ChannelPlan>,
}

/// Tuning knobs of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings {
    pub parallelism: usize,
    pub scan: ScanOptions,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            scan: ScanOptions::default(),
        }
    }
}

impl From<&ExportConfig> for ExportSettings {
    fn from(config: &ExportConfig) -> Self {
        Self {
            parallelism: config.parallelism.max(1),
            scan: ScanOptions {
                chunk_size: config.chunk_size,
                max_frame_size: config.max_frame_size,
            },
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub destination: PathBuf,
    pub files_written: usize,
    pub records: Vec<IndexRecord>,
    pub outcome: ExportOutcome,
}
