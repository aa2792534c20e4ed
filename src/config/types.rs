use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub license: LicenseConfig,
}

/// Last used locations. Written back on shutdown.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Source archive root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    /// Directory under which `Export_*` folders are created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,

    /// License file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Channel worker pool size (default: 1, sequential)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Bytes per source read (default: 16 KiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Open frames larger than this are abandoned (default: 16 MiB)
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// Per output file byte cap, 0 for unlimited
    #[serde(default)]
    pub max_material_file_size: u64,
}

fn default_parallelism() -> usize {
    1
}

fn default_chunk_size() -> usize {
    fsexport_media::scanner::DEFAULT_CHUNK_SIZE
}

fn default_max_frame_size() -> usize {
    fsexport_media::scanner::DEFAULT_MAX_FRAME_SIZE
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            chunk_size: default_chunk_size(),
            max_frame_size: default_max_frame_size(),
            max_material_file_size: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LicenseConfig {
    /// Hex-encoded HMAC key that license files are signed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}
