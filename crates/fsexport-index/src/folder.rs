//! The binary material folder index.
//!
//! On disk the index is a small fixed header followed by a bincode payload:
//!
//! ```text
//! magic "MFIX" (4) | version u16 LE (2) | payload length u64 LE (8) | payload
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use fsexport_common::paths::{INDEX_FILE_NAME, MATERIALS_SUBDIR};
use fsexport_common::ArchiveId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{IndexError, IndexRecord, Result};

const MAGIC: &[u8; 4] = b"MFIX";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: u64 = 4 + 2 + 8;

/// Maximum accepted payload (256 MB) so a damaged length field cannot exhaust memory.
const MAX_PAYLOAD_LEN: u64 = 256 * 1024 * 1024;

/// Catalog of all material files in one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialFolderIndex {
    pub folder_id: ArchiveId,
    pub records: Vec<IndexRecord>,
}

impl MaterialFolderIndex {
    /// Empty index with a fresh folder id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(ArchiveId::new())
    }

    #[must_use]
    pub fn with_id(folder_id: ArchiveId) -> Self {
        Self {
            folder_id,
            records: Vec::new(),
        }
    }

    /// Exact number of bytes [`MaterialFolderIndex::serialize`] writes.
    pub fn size(&self) -> Result<u64> {
        let payload = bincode::serialized_size(self)
            .map_err(|e| IndexError::corrupt(format!("cannot size index: {e}")))?;
        Ok(HEADER_LEN + payload)
    }

    /// Write the header and payload to `writer`.
    pub fn serialize<W: Write>(&self, mut writer: W) -> Result<()> {
        let payload = bincode::serialize(self)
            .map_err(|e| IndexError::corrupt(format!("cannot encode index: {e}")))?;
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        Ok(())
    }

    /// Read an index previously written by [`MaterialFolderIndex::serialize`].
    pub fn deserialize<R: Read>(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN as usize];
        reader
            .read_exact(&mut header)
            .map_err(|e| IndexError::corrupt(format!("truncated header: {e}")))?;

        if &header[0..4] != MAGIC {
            return Err(IndexError::corrupt("bad magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(IndexError::corrupt(format!("unsupported version {version}")));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[6..14]);
        let len = u64::from_le_bytes(len_bytes);
        if len > MAX_PAYLOAD_LEN {
            return Err(IndexError::corrupt(format!(
                "payload length {len} exceeds maximum {MAX_PAYLOAD_LEN}"
            )));
        }

        let mut payload = Vec::with_capacity(len as usize);
        reader.take(len).read_to_end(&mut payload)?;
        if payload.len() as u64 != len {
            return Err(IndexError::corrupt(format!(
                "payload truncated: expected {len} bytes, got {}",
                payload.len()
            )));
        }

        bincode::deserialize(&payload)
            .map_err(|e| IndexError::corrupt(format!("cannot decode records: {e}")))
    }

    /// Load the index file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(IndexError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let index = Self::deserialize(BufReader::new(file))?;
        debug!(path = %path.display(), records = index.records.len(), "Loaded index");
        Ok(index)
    }

    /// Write the index as `materials.idx` inside `dir`, returning its path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(INDEX_FILE_NAME);
        let size = self.size()?;
        let file = File::create(&path)?;
        let mut writer = BufWriter::with_capacity(size.min(1 << 20) as usize, file);
        self.serialize(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!(path = %path.display(), bytes = size, "Saved index");
        Ok(path)
    }

    /// Find the archive root that holds an index file.
    ///
    /// `root` itself is tried first, then its `materials` subdirectory.
    /// Returns the effective root and the index path within it.
    pub fn locate(root: &Path) -> Result<(PathBuf, PathBuf)> {
        let direct = root.join(INDEX_FILE_NAME);
        if direct.is_file() {
            return Ok((root.to_path_buf(), direct));
        }
        let nested_root = root.join(MATERIALS_SUBDIR);
        let nested = nested_root.join(INDEX_FILE_NAME);
        if nested.is_file() {
            return Ok((nested_root, nested));
        }
        Err(IndexError::NotFound(direct))
    }
}

impl Default for MaterialFolderIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsexport_common::{ChannelIdentifier, DataType, Timestamp};

    fn sample_index() -> MaterialFolderIndex {
        let mut index = MaterialFolderIndex::new();
        for (i, dt) in [DataType::Camera, DataType::Audio].into_iter().enumerate() {
            let mut record =
                IndexRecord::material(ChannelIdentifier::new(dt, 1), (i as u32 + 1).into());
            record.note_frame(Timestamp::from_micros(1_000));
            record.note_frame(Timestamp::from_micros(2_000));
            index.records.push(record);
        }
        index
    }

    #[test]
    fn test_size_matches_serialized_bytes() {
        let index = sample_index();
        let mut buf = Vec::new();
        index.serialize(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, index.size().unwrap());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample_index();
        let path = index.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(INDEX_FILE_NAME));

        let loaded = MaterialFolderIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MaterialFolderIndex::load(&dir.path().join(INDEX_FILE_NAME)).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let mut buf = Vec::new();
        sample_index().serialize(&mut buf).unwrap();
        buf[0] = b'X';
        let err = MaterialFolderIndex::deserialize(buf.as_slice()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn test_truncated_payload_is_corrupt() {
        let mut buf = Vec::new();
        sample_index().serialize(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);
        let err = MaterialFolderIndex::deserialize(buf.as_slice()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn test_garbage_payload_is_corrupt() {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&4u64.to_le_bytes());
        buf.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        let err = MaterialFolderIndex::deserialize(buf.as_slice()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn test_locate_probes_materials_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join(MATERIALS_SUBDIR);
        std::fs::create_dir_all(&nested).unwrap();
        sample_index().save(&nested).unwrap();

        let (root, index_path) = MaterialFolderIndex::locate(dir.path()).unwrap();
        assert_eq!(root, nested);
        assert_eq!(index_path, nested.join(INDEX_FILE_NAME));
    }

    #[test]
    fn test_locate_prefers_direct_index() {
        let dir = tempfile::tempdir().unwrap();
        sample_index().save(dir.path()).unwrap();
        let (root, _) = MaterialFolderIndex::locate(dir.path()).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_locate_without_index_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MaterialFolderIndex::locate(dir.path()),
            Err(IndexError::NotFound(_))
        ));
    }
}
