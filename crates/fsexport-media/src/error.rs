//! Error types for frame handling and material file writing.

use std::io;
use std::path::PathBuf;

use fsexport_common::{ChannelIdentifier, Timestamp};
use thiserror::Error;

/// Errors from opening, creating or closing material files.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot create material file {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a byte span is not a valid frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("span of {0} bytes is shorter than a frame")]
    TooShort(usize),

    #[error("missing start marker")]
    BadStartMarker,

    #[error("missing end marker")]
    BadEndMarker,

    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    #[error("data type {0} cannot be carried in a frame")]
    InvalidDataType(u8),

    #[error("unknown flag bits {0:#04x}")]
    InvalidFlags(u8),

    #[error("reserved byte is {0:#04x}, expected zero")]
    InvalidReserved(u8),

    #[error("frame timestamp is unset")]
    UnsetTimestamp,

    #[error("declared payload of {declared} bytes, span carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
}

/// Errors while reading a material file for frames.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("scan cancelled")]
    Cancelled,
}

/// Rejections from [`crate::MaterialFile::write`].
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("OutOfOrder (last {last}, got {got})")]
    OutOfOrder { last: Timestamp, got: Timestamp },

    #[error("ChannelMismatch (expected {expected}, got {got})")]
    ChannelMismatch {
        expected: ChannelIdentifier,
        got: ChannelIdentifier,
    },

    #[error("FileTooLarge (limit {limit} bytes)")]
    FileTooLarge { limit: u64 },

    #[error("Io ({0})")]
    Io(#[from] io::Error),
}
