//! Acceptance rules for frames written to one output file.

use fsexport_common::{ChannelIdentifier, Timestamp};

use crate::Frame;

/// Outcome of [`FrameGate::inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Not strictly newer than the last written frame.
    Stale,
    /// Belongs to another channel or data type.
    ForeignChannel,
    /// Delta frame while waiting for a key frame.
    AwaitingIntra,
}

/// Tracks the last written timestamp and key-frame resynchronization for one
/// output file. A fresh gate waits for an intra frame.
///
/// Resynchronization ends when a frame is accepted, whether or not it is
/// later written. Only written frames advance the monotonic timestamp.
#[derive(Debug, Clone)]
pub struct FrameGate {
    target: ChannelIdentifier,
    last_written: Option<Timestamp>,
    awaiting_intra: bool,
}

impl FrameGate {
    #[must_use]
    pub fn new(target: ChannelIdentifier) -> Self {
        Self {
            target,
            last_written: None,
            awaiting_intra: true,
        }
    }

    #[must_use]
    pub fn inspect(&self, frame: &Frame) -> Verdict {
        if let Some(last) = self.last_written {
            if frame.timestamp() <= last {
                return Verdict::Stale;
            }
        }
        if frame.channel() != self.target {
            return Verdict::ForeignChannel;
        }
        if self.awaiting_intra && !frame.is_intra() {
            return Verdict::AwaitingIntra;
        }
        Verdict::Accept
    }

    /// A frame passed [`FrameGate::inspect`].
    pub fn record_accepted(&mut self) {
        self.awaiting_intra = false;
    }

    /// A frame was written successfully.
    pub fn record_written(&mut self, timestamp: Timestamp) {
        self.last_written = Some(timestamp);
    }

    /// A write failed; deltas are refused until the next intra frame.
    pub fn record_failure(&mut self) {
        self.awaiting_intra = true;
    }

    #[must_use]
    pub fn is_awaiting_intra(&self) -> bool {
        self.awaiting_intra
    }

    #[must_use]
    pub fn last_written(&self) -> Option<Timestamp> {
        self.last_written
    }
}
