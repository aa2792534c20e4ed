//! Archive info: a human-oriented summary of an exported archive.
//!
//! The builder is fed once per written material file and serialized a single
//! time at the end of a successful export, after the index itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fsexport_common::paths::{material_file_name, ARCHIVE_INFO_FILE_NAME};
use fsexport_common::{ArchiveId, ChannelIdentifier, DataType, MaterialFileId, TimeInterval};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{IndexRecord, Result};

/// Serialized archive summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub archive_id: ArchiveId,
    pub created_at: DateTime<Utc>,
    pub channels: Vec<ChannelInfo>,
}

impl ArchiveInfo {
    /// Read an archive info file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// One exported channel and the files produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub data_type: DataType,
    pub channel_id: u16,
    pub name: String,
    #[serde(flatten)]
    pub range: TimeInterval,
    pub files: Vec<FileInfo>,
}

/// One produced material file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: MaterialFileId,
    pub file_name: String,
    pub size_bytes: u64,
    pub frames: u64,
    #[serde(flatten)]
    pub range: TimeInterval,
}

/// Display name of an exported channel, e.g. `Camera 3`.
#[must_use]
pub fn channel_display_name(channel: ChannelIdentifier) -> String {
    format!("{} {}", channel.data_type.label(), channel.number)
}

/// Incremental accumulator for [`ArchiveInfo`].
#[derive(Debug)]
pub struct ArchiveInfoBuilder {
    archive_id: ArchiveId,
    created_at: DateTime<Utc>,
    channels: BTreeMap<ChannelIdentifier, ChannelInfo>,
}

impl ArchiveInfoBuilder {
    #[must_use]
    pub fn new(archive_id: ArchiveId) -> Self {
        Self {
            archive_id,
            created_at: Utc::now(),
            channels: BTreeMap::new(),
        }
    }

    /// Register the record's channel (named on first sight) and widen its range.
    pub fn update_archive_info(&mut self, record: &IndexRecord) {
        let channel = record.channel();
        let info = self.channels.entry(channel).or_insert_with(|| ChannelInfo {
            data_type: channel.data_type,
            channel_id: channel.number,
            name: channel_display_name(channel),
            range: TimeInterval::default(),
            files: Vec::new(),
        });
        if record.has_frames() {
            info.range.update(record.begin, record.end);
        }
    }

    /// Roll in the on-disk metadata of a finished material file.
    pub fn update_file_info(&mut self, record: &IndexRecord, path: &Path, frames: u64) -> Result<()> {
        let size_bytes = std::fs::metadata(path)?.len();
        self.update_archive_info(record);

        let mut range = TimeInterval::default();
        if record.has_frames() {
            range.update(record.begin, record.end);
        }
        if let Some(info) = self.channels.get_mut(&record.channel()) {
            info.files.push(FileInfo {
                file_id: record.file_id,
                file_name: material_file_name(record.file_id),
                size_bytes,
                frames,
                range,
            });
        }
        Ok(())
    }

    /// Snapshot of the accumulated info; files are ordered by id.
    #[must_use]
    pub fn build(&self) -> ArchiveInfo {
        let channels = self
            .channels
            .values()
            .cloned()
            .map(|mut c| {
                c.files.sort_by_key(|f| f.file_id);
                c
            })
            .collect();
        ArchiveInfo {
            archive_id: self.archive_id,
            created_at: self.created_at,
            channels,
        }
    }

    /// Write `archive_info.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(ARCHIVE_INFO_FILE_NAME);
        let json = serde_json::to_string_pretty(&self.build())?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), channels = self.channels.len(), "Saved archive info");
        Ok(path)
    }
}
