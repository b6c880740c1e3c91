//! Frontends that turn sources into a [`ProjectModel`].
//!
//! A serialized model (`.json`) is loaded as is. Directories and `.java`
//! files go through the tree-sitter Java frontend.

#[cfg(feature = "tree-sitter")]
pub mod java;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::InspectionConfig;
use crate::model::ProjectModel;

/// Java sources under `root`, sorted by path. Unreadable entries are
/// logged and skipped.
pub fn discover_sources(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            // Skip hidden and build output directories
            !(e.depth() > 0
                && e.file_type().is_dir()
                && (name.starts_with('.') || name == "target" || name == "build" || name == "out"))
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if entry.file_type().is_file() && entry.path().extension().and_then(|e| e.to_str()) == Some("java") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load the model for `path`: a serialized model, a Java file or a source
/// directory.
pub fn load_project(path: &Path, config: &InspectionConfig) -> Result<ProjectModel> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
        let model = ProjectModel::load(path)
            .with_context(|| format!("Failed to load model: {}", path.display()))?;
        info!(path = %path.display(), "loaded serialized model");
        return Ok(model);
    }

    let (base_dir, sources) = if path.is_dir() {
        (path.to_path_buf(), discover_sources(path)?)
    } else {
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        (base, vec![path.to_path_buf()])
    };
    info!(path = %path.display(), files = sources.len(), "discovered java sources");
    load_java(&base_dir, &sources, config)
}

#[cfg(feature = "tree-sitter")]
fn load_java(base_dir: &Path, sources: &[PathBuf], config: &InspectionConfig) -> Result<ProjectModel> {
    Ok(java::JavaFrontend::new(config).load(base_dir, sources))
}

#[cfg(not(feature = "tree-sitter"))]
fn load_java(_base_dir: &Path, _sources: &[PathBuf], _config: &InspectionConfig) -> Result<ProjectModel> {
    bail!("Java sources require the `tree-sitter` feature; pass a serialized model instead")
}
