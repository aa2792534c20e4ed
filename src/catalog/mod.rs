//! Source archive catalog: index records grouped into channels.
//!
//! Only exportable records are grouped. Empty files, undefined and alarm-log
//! data, and prerecording or undefined roles are bookkeeping entries and are
//! left out of the channel listing.

mod channel;

pub use channel::{Channel, SelectionListener};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fsexport_common::paths::material_file_path;
use fsexport_common::{ArchiveId, ChannelIdentifier, TimeInterval};
use fsexport_index::{IndexError, IndexRecord, MaterialFolderIndex};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("record of {got} added to channel {expected}")]
    ChannelMismatch {
        expected: ChannelIdentifier,
        got: ChannelIdentifier,
    },
}

impl CatalogError {
    /// Whether the index file was missing rather than unreadable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Index(IndexError::NotFound(_)))
    }
}

/// Load an index file and keep its exportable records.
///
/// Returns the surviving records in index order and the interval they span.
pub fn load(index_path: &Path) -> Result<(Vec<IndexRecord>, TimeInterval), CatalogError> {
    let index = MaterialFolderIndex::load(index_path)?;
    Ok(filter_records(index.records))
}

fn filter_records(records: Vec<IndexRecord>) -> (Vec<IndexRecord>, TimeInterval) {
    let mut interval = TimeInterval::default();
    let total = records.len();
    let kept: Vec<IndexRecord> = records
        .into_iter()
        .filter(IndexRecord::is_exportable)
        .inspect(|r| {
            if r.has_frames() {
                interval.update(r.begin, r.end);
            }
        })
        .collect();
    debug!(total, kept = kept.len(), "Filtered index records");
    (kept, interval)
}

/// Channels of one source archive, ordered by data type then number.
#[derive(Debug)]
pub struct Catalog {
    root: PathBuf,
    folder_id: ArchiveId,
    channels: BTreeMap<ChannelIdentifier, Channel>,
    interval: TimeInterval,
}

impl Catalog {
    /// Locate and load the index under `root` (or its `materials` subdirectory).
    pub fn open(root: &Path) -> Result<Self, CatalogError> {
        let (root, index_path) = MaterialFolderIndex::locate(root)?;
        let index = MaterialFolderIndex::load(&index_path)?;
        let catalog = Self::from_records(root, index.folder_id, index.records)?;
        info!(
            root = %catalog.root.display(),
            channels = catalog.len(),
            interval = %catalog.interval,
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Group records into channels. A channel is enabled when its first
    /// record's file exists under `root`.
    pub fn from_records(
        root: PathBuf,
        folder_id: ArchiveId,
        records: Vec<IndexRecord>,
    ) -> Result<Self, CatalogError> {
        let (records, interval) = filter_records(records);
        let mut channels: BTreeMap<ChannelIdentifier, Channel> = BTreeMap::new();
        for record in records {
            let id = record.channel();
            let channel = channels.entry(id).or_insert_with(|| {
                let present = material_file_path(&root, record.file_id).is_file();
                Channel::new(id, present)
            });
            channel.add(record)?;
        }
        Ok(Self {
            root,
            folder_id,
            channels,
            interval,
        })
    }

    /// A catalog with no channels, used when loading fails.
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            folder_id: ArchiveId::new(),
            channels: BTreeMap::new(),
            interval: TimeInterval::default(),
        }
    }

    /// Effective source root, after probing for the `materials` subdirectory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_id(&self) -> ArchiveId {
        self.folder_id
    }

    /// Time span of every exportable record.
    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }

    pub fn channel(&self, id: ChannelIdentifier) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_mut(&mut self, id: ChannelIdentifier) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    /// Select or deselect one channel. Returns `false` for an unknown id.
    pub fn select(&mut self, id: ChannelIdentifier, selected: bool) -> bool {
        match self.channels.get_mut(&id) {
            Some(channel) => {
                channel.select(selected);
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for channel in self.channels.values_mut() {
            channel.select(selected);
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values().filter(|c| c.is_selected())
    }

    /// Union of the selected channels' ranges.
    pub fn selected_interval(&self) -> TimeInterval {
        let mut interval = TimeInterval::default();
        for channel in self.selected() {
            interval.merge(&channel.range());
        }
        interval
    }
}
