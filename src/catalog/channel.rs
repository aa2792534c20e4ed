//! A logical recording channel and its source records.

use std::fmt;

use fsexport_common::{ChannelIdentifier, TimeInterval, Timestamp};
use fsexport_index::IndexRecord;

use super::CatalogError;

/// Callback invoked with the channel id and the new selection state.
pub type SelectionListener = Box<dyn Fn(ChannelIdentifier, bool) + Send + Sync>;

pub struct Channel {
    id: ChannelIdentifier,
    records: Vec<IndexRecord>,
    range: TimeInterval,
    enabled: bool,
    selected: bool,
    listeners: Vec<SelectionListener>,
}

impl Channel {
    /// `enabled` reflects whether the channel's backing files exist on the source.
    pub fn new(id: ChannelIdentifier, enabled: bool) -> Self {
        Self {
            id,
            records: Vec::new(),
            range: TimeInterval::default(),
            enabled,
            selected: false,
            listeners: Vec::new(),
        }
    }

    /// Append a record of this channel and widen the channel's range.
    pub fn add(&mut self, record: IndexRecord) -> Result<(), CatalogError> {
        if record.channel() != self.id {
            return Err(CatalogError::ChannelMismatch {
                expected: self.id,
                got: record.channel(),
            });
        }
        if record.has_frames() && !record.end.is_unset() {
            self.range.update(record.begin, record.end);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn id(&self) -> ChannelIdentifier {
        self.id
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn range(&self) -> TimeInterval {
        self.range
    }

    pub fn begin(&self) -> Option<Timestamp> {
        self.range.begin()
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.range.end()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Set the selection flag and notify every listener.
    pub fn select(&mut self, selected: bool) {
        self.selected = selected;
        for listener in &self.listeners {
            listener(self.id, selected);
        }
    }

    pub fn on_selection_changed(
        &mut self,
        listener: impl Fn(ChannelIdentifier, bool) + Send + Sync + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    /// One-line summary used by channel listings.
    pub fn display_line(&self) -> String {
        let format = |t: Option<Timestamp>| t.map_or_else(|| "-".to_string(), Timestamp::format_local);
        format!(
            "Channel number: {}, type: {}, begin: {}, end: {}",
            self.id.number,
            self.id.data_type,
            format(self.begin()),
            format(self.end())
        )
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("records", &self.records.len())
            .field("range", &self.range)
            .field("enabled", &self.enabled)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
