//! Frame wire format.
//!
//! All integers are little-endian.
//!
//! ```text
//! start marker  A5 5A 46 53   (4)
//! version       u8 = 1        (1)
//! data type     u8            (1)  1 camera, 2 audio, 3 text
//! flags         u8            (1)  bit 0 = intra, other bits zero
//! reserved      u8 = 0        (1)
//! channel       u16           (2)
//! timestamp     i64 micros    (8)
//! payload len   u32           (4)
//! payload       [u8; len]
//! end marker    5A A5 46 45   (4)
//! ```
//!
//! A span handed to [`decode`] runs from the first byte of the start marker
//! to the last byte of the end marker and must be exactly
//! `MIN_FRAME_LEN + payload len` bytes long.

use fsexport_common::{DataType, Timestamp};

use super::{BufferPool, Frame, FrameMetadata};
use crate::DecodeError;

pub const FRAME_START: [u8; 4] = [0xA5, 0x5A, 0x46, 0x53];
pub const FRAME_END: [u8; 4] = [0x5A, 0xA5, 0x46, 0x45];
pub const MARKER_LEN: usize = 4;

const VERSION: u8 = 1;
const FLAG_INTRA: u8 = 0x01;
const HEADER_LEN: usize = MARKER_LEN + 4 + 2 + 8 + 4;

/// Size of a frame with an empty payload.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + MARKER_LEN;

/// Encoded size of a frame carrying `payload_len` bytes.
#[must_use]
pub const fn encoded_len(payload_len: usize) -> usize {
    MIN_FRAME_LEN + payload_len
}

/// Append the encoding of one frame to `out`.
pub fn encode_into(metadata: &FrameMetadata, data_type: DataType, payload: &[u8], out: &mut Vec<u8>) {
    out.reserve(encoded_len(payload.len()));
    out.extend_from_slice(&FRAME_START);
    out.push(VERSION);
    out.push(data_type as u8);
    out.push(if metadata.is_intra { FLAG_INTRA } else { 0 });
    out.push(0);
    out.extend_from_slice(&metadata.channel_id.to_le_bytes());
    out.extend_from_slice(&metadata.timestamp.as_micros().to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&FRAME_END);
}

/// Encode a frame into a fresh buffer.
#[must_use]
pub fn encode(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(frame.payload().len()));
    encode_into(&frame.metadata, frame.data_type, frame.payload(), &mut out);
    out
}

/// Decode a complete span, leasing the payload from `pool`.
pub fn decode(span: &[u8], pool: &BufferPool) -> Result<Frame, DecodeError> {
    if span.len() < MIN_FRAME_LEN {
        return Err(DecodeError::TooShort(span.len()));
    }
    if span[..MARKER_LEN] != FRAME_START {
        return Err(DecodeError::BadStartMarker);
    }
    if span[span.len() - MARKER_LEN..] != FRAME_END {
        return Err(DecodeError::BadEndMarker);
    }

    let version = span[4];
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let raw_type = span[5];
    let data_type = DataType::try_from(raw_type)
        .ok()
        .filter(|dt| dt.is_exportable())
        .ok_or(DecodeError::InvalidDataType(raw_type))?;

    let flags = span[6];
    if flags & !FLAG_INTRA != 0 {
        return Err(DecodeError::InvalidFlags(flags));
    }
    if span[7] != 0 {
        return Err(DecodeError::InvalidReserved(span[7]));
    }

    let channel_id = u16::from_le_bytes([span[8], span[9]]);

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&span[10..18]);
    let timestamp = Timestamp::from_micros(i64::from_le_bytes(ts));
    if timestamp.is_unset() {
        return Err(DecodeError::UnsetTimestamp);
    }

    let declared = u32::from_le_bytes([span[18], span[19], span[20], span[21]]) as usize;
    let actual = span.len() - MIN_FRAME_LEN;
    if declared != actual {
        return Err(DecodeError::LengthMismatch { declared, actual });
    }

    let metadata = FrameMetadata {
        timestamp,
        channel_id,
        is_intra: flags & FLAG_INTRA != 0,
    };
    let payload = pool.lease(&span[HEADER_LEN..HEADER_LEN + declared]);
    Ok(Frame::new(metadata, data_type, payload))
}
