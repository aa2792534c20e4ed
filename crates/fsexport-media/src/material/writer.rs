//! File-backed material writer.
//!
//! Frames are encoded back-to-back with the frame codec, so an exported
//! material file can itself be scanned and exported again.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fsexport_common::{ArchiveId, ChannelIdentifier, Timestamp};
use fsexport_index::IndexRecord;
use tracing::{debug, warn};

use super::{MaterialFile, MaterialFileFactory, MaterialPosition, MaterialSummary};
use crate::frame::encode_into;
use crate::{Error, Frame, Result, WriteError};

/// Factory for [`FileMaterialWriter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMaterialFactory {
    max_file_size: Option<u64>,
}

impl FileMaterialFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every produced file at `limit` bytes; `0` means unlimited.
    #[must_use]
    pub fn with_max_file_size(limit: u64) -> Self {
        Self {
            max_file_size: (limit > 0).then_some(limit),
        }
    }
}

impl MaterialFileFactory for FileMaterialFactory {
    fn create(
        &self,
        archive_id: ArchiveId,
        record: &IndexRecord,
        path: &Path,
    ) -> Result<Box<dyn MaterialFile>> {
        remove_existing(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|source| Error::Create {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            archive = %archive_id,
            file_id = %record.file_id,
            channel = %record.channel(),
            path = %path.display(),
            "Created material file"
        );
        Ok(Box::new(FileMaterialWriter {
            path: path.to_path_buf(),
            channel: record.channel(),
            writer: Some(BufWriter::new(file)),
            scratch: Vec::new(),
            last: None,
            offset: 0,
            frames: 0,
            max_file_size: self.max_file_size,
        }))
    }
}

/// Clear the read-only bit of a stale file and delete it.
fn remove_existing(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    fs::remove_file(path)?;
    Ok(())
}

/// Truncate `file` to its first `offset` logical bytes, where the logical
/// content is what reached the file followed by `buffered`.
fn restore(file: &mut File, buffered: &[u8], offset: u64) -> io::Result<()> {
    let on_disk = file.metadata()?.len();
    if on_disk < offset {
        let missing = usize::try_from(offset - on_disk)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "rollback offset too large"))?;
        let tail = buffered.get(..missing).ok_or_else(|| {
            io::Error::new(ErrorKind::UnexpectedEof, "buffered bytes do not reach offset")
        })?;
        file.seek(SeekFrom::Start(on_disk))?;
        file.write_all(tail)?;
    }
    file.set_len(offset)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(())
}

fn unusable() -> io::Error {
    io::Error::new(ErrorKind::Other, "material file is unusable after a failed rollback")
}

pub struct FileMaterialWriter {
    path: PathBuf,
    channel: ChannelIdentifier,
    /// `None` once a rollback failed.
    writer: Option<BufWriter<File>>,
    scratch: Vec<u8>,
    last: Option<Timestamp>,
    offset: u64,
    frames: u64,
    max_file_size: Option<u64>,
}

impl FileMaterialWriter {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop any bytes of a partly written frame so the file ends at `offset`.
    fn rollback(&mut self) {
        let Some(writer) = self.writer.take() else {
            return;
        };
        let (mut file, buffered) = writer.into_parts();
        let buffered = buffered.unwrap_or_else(|panicked| panicked.into_inner());
        match restore(&mut file, &buffered, self.offset) {
            Ok(()) => self.writer = Some(BufWriter::new(file)),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Cannot roll back torn frame"),
        }
    }
}

impl MaterialFile for FileMaterialWriter {
    fn write(&mut self, frame: &Frame) -> std::result::Result<MaterialPosition, WriteError> {
        if frame.channel() != self.channel {
            return Err(WriteError::ChannelMismatch {
                expected: self.channel,
                got: frame.channel(),
            });
        }
        if let Some(last) = self.last {
            if frame.timestamp() <= last {
                return Err(WriteError::OutOfOrder {
                    last,
                    got: frame.timestamp(),
                });
            }
        }

        self.scratch.clear();
        encode_into(&frame.metadata, frame.data_type, frame.payload(), &mut self.scratch);
        let len = self.scratch.len() as u64;
        if let Some(limit) = self.max_file_size {
            if self.offset + len > limit {
                return Err(WriteError::FileTooLarge { limit });
            }
        }

        let writer = self.writer.as_mut().ok_or_else(unusable)?;
        if let Err(e) = writer.write_all(&self.scratch) {
            self.rollback();
            return Err(e.into());
        }
        let position = MaterialPosition::new(self.offset, self.scratch.len() as u32);
        self.offset += len;
        self.frames += 1;
        self.last = Some(frame.timestamp());
        Ok(position)
    }

    fn close(self: Box<Self>) -> Result<MaterialSummary> {
        let this = *self;
        let summary = MaterialSummary {
            frames: this.frames,
            bytes: this.offset,
        };
        let writer = this.writer.ok_or_else(unusable)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!(path = %this.path.display(), frames = summary.frames, bytes = summary.bytes, "Closed material file");
        Ok(summary)
    }
}
