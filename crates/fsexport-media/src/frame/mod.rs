//! Frame model.

pub mod codec;
pub mod pool;

use fsexport_common::{ChannelIdentifier, DataType, Timestamp};

pub use codec::{decode, encode, encode_into, encoded_len, FRAME_END, FRAME_START, MIN_FRAME_LEN};
pub use pool::{BufferPool, PooledBuffer};

/// Per-frame header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub timestamp: Timestamp,
    pub channel_id: u16,
    /// Key frame: decodable without earlier frames.
    pub is_intra: bool,
}

/// One decoded frame. The payload is leased from a [`BufferPool`] and goes
/// back to it when the frame is dropped or [released](Frame::release).
#[derive(Debug)]
pub struct Frame {
    pub metadata: FrameMetadata,
    pub data_type: DataType,
    payload: PooledBuffer,
}

impl Frame {
    #[must_use]
    pub fn new(metadata: FrameMetadata, data_type: DataType, payload: PooledBuffer) -> Self {
        Self {
            metadata,
            data_type,
            payload,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> Timestamp {
        self.metadata.timestamp
    }

    #[must_use]
    pub fn is_intra(&self) -> bool {
        self.metadata.is_intra
    }

    #[must_use]
    pub fn channel(&self) -> ChannelIdentifier {
        ChannelIdentifier::new(self.data_type, self.metadata.channel_id)
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Return the payload buffer to its pool.
    pub fn release(self) {
        drop(self);
    }
}
