//! Fsexport-Index: catalog files of a material archive.
//!
//! - `record` - One index entry per material file
//! - `folder` - The binary `materials.idx` file (load, save, exact sizing)
//! - `archive_info` - Summary metadata written alongside an exported index

pub mod archive_info;
pub mod error;
pub mod folder;
pub mod record;

pub use archive_info::{channel_display_name, ArchiveInfo, ArchiveInfoBuilder, ChannelInfo, FileInfo};
pub use error::{IndexError, Result};
pub use folder::MaterialFolderIndex;
pub use record::IndexRecord;
