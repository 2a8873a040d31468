use std::path::{Path, PathBuf};

use glob::{glob, Pattern};
use tracing::{info, warn};

use crate::error::{LoadError, Result};

/// Where a load takes its source files from.
#[derive(Debug, Clone)]
pub enum SourceSet {
    Directory { dir: PathBuf, extension: String },
    Files(Vec<PathBuf>),
}

impl SourceSet {
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        SourceSet::Directory {
            dir: dir.into(),
            extension: "parquet".to_string(),
        }
    }

    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            SourceSet::Directory { dir, extension } => discover_sources(dir, extension),
            SourceSet::Files(files) => Ok(files.clone()),
        }
    }
}

/// Lists `*.{extension}` files directly under `dir`, sorted by path.
///
/// A missing directory or one without matching files yields an empty list.
pub fn discover_sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "data directory not found");
        return Ok(Vec::new());
    }

    // Surface permission problems as an I/O error instead of an empty glob.
    std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(extension)
    );

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .collect();
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), extension, "no source files found");
    } else {
        info!(dir = %dir.display(), count = files.len(), "discovered source files");
    }

    Ok(files)
}
