//! Well-known archive file names.
//!
//! An archive root holds one index file plus one material file per
//! identifier. Exported archives additionally carry an archive info file.

use std::path::{Path, PathBuf};

use crate::MaterialFileId;

/// File name of the binary index in an archive root.
pub const INDEX_FILE_NAME: &str = "materials.idx";

/// File name of the JSON archive summary written next to an exported index.
pub const ARCHIVE_INFO_FILE_NAME: &str = "archive_info.json";

/// Subdirectory probed when the index is not found directly in the chosen root.
pub const MATERIALS_SUBDIR: &str = "materials";

/// Extension of material files.
pub const MATERIAL_EXTENSION: &str = "mfd";

/// File name of a material file for `id`.
///
/// # Examples
///
/// ```
/// use fsexport_common::paths::material_file_name;
///
/// assert_eq!(material_file_name(1u32.into()), "00000001.mfd");
/// assert_eq!(material_file_name(u32::MAX.into()), "FFFFFFFF.mfd");
/// ```
#[must_use]
pub fn material_file_name(id: MaterialFileId) -> String {
    format!("{:08X}.{}", id.get(), MATERIAL_EXTENSION)
}

/// Full path of a material file inside `root`.
#[must_use]
pub fn material_file_path(root: &Path, id: MaterialFileId) -> PathBuf {
    root.join(material_file_name(id))
}

/// Parse a material file name back into its identifier.
#[must_use]
pub fn parse_material_file_name(name: &str) -> Option<MaterialFileId> {
    let stem = name.strip_suffix(MATERIAL_EXTENSION)?.strip_suffix('.')?;
    if stem.len() != 8 {
        return None;
    }
    u32::from_str_radix(stem, 16).ok().map(MaterialFileId::from)
}
