//! Fsexport-Media: frames, frame scanning and material file writing
//!
//! This crate turns raw material file bytes back into frames and writes
//! accepted frames into new material files.
//!
//! # Modules
//!
//! - `frame` - Frame model, the marker-delimited codec, pooled payload buffers
//! - `scanner` - Chunked byte-stream reassembly of frame spans
//! - `gate` - Per-output-file acceptance rules (monotonic time, channel, key frames)
//! - `material` - Material file writer contract and the file-backed writer
//!
//! # Architecture
//!
//! A material file is a sequence of frames, each framed by a start and an end
//! marker. Files may contain garbage between frames, truncated frames and
//! retransmitted duplicates. Reading a file is a three step affair:
//!
//! 1. [`FrameScanner`] reads fixed-size chunks and yields every byte span
//!    between the latest start marker and the next end marker, carrying open
//!    spans across chunk boundaries
//! 2. [`frame::decode`] validates a span and leases its payload from a
//!    [`BufferPool`]; invalid spans are dropped by the caller
//! 3. [`FrameGate`] decides whether a decoded frame may be written to the
//!    current output file

pub mod error;
pub mod frame;
pub mod gate;
pub mod material;
pub mod scanner;

pub use error::{DecodeError, Error, Result, ScanError, WriteError};
pub use frame::{BufferPool, Frame, FrameMetadata};
pub use gate::{FrameGate, Verdict};
pub use material::{
    FileMaterialFactory, MaterialFile, MaterialFileFactory, MaterialPosition, MaterialSummary,
};
pub use scanner::{FrameScanner, ScanOptions, ScanStats};
