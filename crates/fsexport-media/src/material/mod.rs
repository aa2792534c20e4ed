//! Material file writer contract.

mod writer;

use std::path::Path;

use fsexport_common::ArchiveId;
use fsexport_index::IndexRecord;

use crate::{Frame, Result, WriteError};

pub use writer::{FileMaterialFactory, FileMaterialWriter};

/// Where a written frame landed in its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialPosition {
    offset: u64,
    length: u32,
}

impl MaterialPosition {
    #[must_use]
    pub fn new(offset: u64, length: u32) -> Self {
        Self { offset, length }
    }

    /// Offset of the first byte after this frame.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.length)
    }
}

/// Totals reported when a material file is closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialSummary {
    pub frames: u64,
    pub bytes: u64,
}

/// An open output material file for a single channel.
///
/// Dropping without [`close`](MaterialFile::close) still releases the handle.
pub trait MaterialFile: Send {
    fn write(&mut self, frame: &Frame) -> std::result::Result<MaterialPosition, WriteError>;

    /// Flush and release the file.
    fn close(self: Box<Self>) -> Result<MaterialSummary>;
}

/// Creates output material files.
pub trait MaterialFileFactory: Send + Sync {
    fn create(
        &self,
        archive_id: ArchiveId,
        record: &IndexRecord,
        path: &Path,
    ) -> Result<Box<dyn MaterialFile>>;
}
