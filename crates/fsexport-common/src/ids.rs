//! Typed ID wrappers.
//!
//! Newtypes keep archive identifiers and material file identifiers from being
//! mixed up with each other or with plain integers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an archive (material folder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveId(Uuid);

impl ArchiveId {
    /// Generate a new random archive ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArchiveId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ArchiveId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<ArchiveId> for Uuid {
    fn from(id: ArchiveId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one material file within an archive.
///
/// Material file names are derived from this value, see
/// [`crate::paths::material_file_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialFileId(u32);

impl MaterialFileId {
    /// Raw numeric value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for MaterialFileId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<MaterialFileId> for u32 {
    fn from(id: MaterialFileId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MaterialFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
