pub mod persist;
mod types;

pub use types::*;

use anyhow::{Context, Result};
use fsexport_media::frame::MIN_FRAME_LEN;
use std::path::{Path, PathBuf};

/// Smallest accepted read size.
const MIN_CHUNK_SIZE: usize = 64;

/// Default config locations, in lookup order.
const DEFAULT_PATHS: [&str; 2] = ["./fsexport.toml", "~/.config/fsexport/config.toml"];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_config() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// First existing default config file.
pub fn find_config() -> Option<PathBuf> {
    DEFAULT_PATHS.iter().find_map(|path_str| {
        let path = PathBuf::from(shellexpand::tilde(path_str).as_ref());
        path.exists().then_some(path)
    })
}

/// Where settings are written back when no file was loaded.
pub fn default_save_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_PATHS[1]).as_ref())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let export = &config.export;
    if export.parallelism == 0 {
        anyhow::bail!("export.parallelism must be at least 1");
    }
    if export.chunk_size < MIN_CHUNK_SIZE {
        anyhow::bail!(
            "export.chunk_size must be at least {} bytes, got {}",
            MIN_CHUNK_SIZE,
            export.chunk_size
        );
    }
    if export.max_frame_size < MIN_FRAME_LEN {
        anyhow::bail!(
            "export.max_frame_size must be at least {} bytes, got {}",
            MIN_FRAME_LEN,
            export.max_frame_size
        );
    }

    for (name, path) in [
        ("source", &config.paths.source),
        ("destination", &config.paths.destination),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    if let Some(key) = &config.license.key {
        if hex::decode(key.trim()).map_or(true, |k| k.is_empty()) {
            anyhow::bail!("license.key must be a non-empty hex string");
        }
    }

    Ok(())
}
