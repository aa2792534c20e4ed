//! Index records.

use fsexport_common::{
    ChannelIdentifier, ChannelRole, DataType, FileState, MaterialFileId, TimeInterval, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Catalog entry for one material file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub channel_id: u16,
    pub data_type: DataType,
    pub channel_role: ChannelRole,
    pub begin: Timestamp,
    pub end: Timestamp,
    pub file_id: MaterialFileId,
    pub file_state: FileState,
}

impl IndexRecord {
    /// Fresh record for a material file that is about to be written.
    ///
    /// Begin and end start out as [`Timestamp::UNSET`] and are filled in by
    /// [`IndexRecord::note_frame`].
    #[must_use]
    pub fn material(channel: ChannelIdentifier, file_id: MaterialFileId) -> Self {
        Self {
            channel_id: channel.number,
            data_type: channel.data_type,
            channel_role: ChannelRole::Material,
            begin: Timestamp::UNSET,
            end: Timestamp::UNSET,
            file_id,
            file_state: FileState::Partial,
        }
    }

    #[must_use]
    pub fn channel(&self) -> ChannelIdentifier {
        ChannelIdentifier::new(self.data_type, self.channel_id)
    }

    /// Whether this record describes exportable recorded material.
    ///
    /// Empty files, undefined or alarm-log data, and prerecording or
    /// undefined roles are bookkeeping entries.
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        self.file_state != FileState::Empty
            && self.data_type.is_exportable()
            && self.channel_role == ChannelRole::Material
    }

    /// Record a written frame: the first one sets `begin`, every one sets `end`.
    pub fn note_frame(&mut self, timestamp: Timestamp) {
        if self.begin.is_unset() {
            self.begin = timestamp;
        }
        self.end = timestamp;
    }

    /// Whether at least one frame has been noted.
    #[must_use]
    pub fn has_frames(&self) -> bool {
        !self.begin.is_unset()
    }

    /// Mark the record as closed normally.
    pub fn complete(&mut self) {
        self.file_state = FileState::Complete;
    }

    /// Whether the record's own range overlaps `interval`.
    #[must_use]
    pub fn overlaps(&self, interval: &TimeInterval) -> bool {
        interval.intersects(self.begin, self.end)
    }
}
