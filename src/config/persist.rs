//! Configuration persistence using toml_edit to preserve formatting and comments.

use super::PathsConfig;
use anyhow::{Context, Result};
use std::path::Path;
use toml_edit::DocumentMut;

/// Update just the paths section of the config file, creating the file if needed
pub fn update_paths(path: &Path, paths: &PathsConfig) -> Result<()> {
    let mut doc: DocumentMut = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        content
            .parse()
            .with_context(|| format!("Failed to parse config file: {:?}", path))?
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        DocumentMut::new()
    };

    // Serialize paths to TOML
    let paths_toml = toml::to_string(&PathsWrapper {
        paths: paths.clone(),
    })
    .with_context(|| "Failed to serialize paths")?;
    let paths_doc: DocumentMut = paths_toml
        .parse()
        .with_context(|| "Failed to parse serialized paths")?;

    // Replace the paths table
    if let Some(paths_item) = paths_doc.get("paths") {
        doc["paths"] = paths_item.clone();
    } else {
        doc.remove("paths");
    }

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

#[derive(serde::Serialize)]
struct PathsWrapper {
    paths: PathsConfig,
}
