//! Filesystem side of the registry: reading a table tree from disk and
//! writing back the JSON form of tables that were parsed from text.
//!
//! Layout on disk mirrors the registry. Every directory is a category,
//! every `.txt` file a text table and every `.json` file a structured one.
//! Other files and dot-files are ignored.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::registry::{DirectorySource, Source, StructuredSource, TableRegistry, TableSource};
use crate::schema::city::CityData;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path has no usable name: {0}")]
    BadPath(PathBuf),
}

/// Read a directory tree into a [`DirectorySource`] named after the
/// directory itself. Entries are visited in file-name order.
///
/// A table file that cannot be read as UTF-8 text is logged and left out;
/// only errors on a directory fail the call.
pub fn read_directory(path: impl AsRef<Path>) -> Result<DirectorySource, IoError> {
    let path = path.as_ref();
    let id = file_name(path)?;

    let mut entries = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut children = Vec::new();
    for entry in entries {
        let child = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            children.push(Source::Directory(read_directory(&child)?));
            continue;
        }
        let Some(stem) = child.file_stem().and_then(|s| s.to_str()) else {
            log::debug!("ignoring {}", child.display());
            continue;
        };
        let extension = child.extension().and_then(|s| s.to_str());
        if !matches!(extension, Some("txt" | "json")) {
            log::debug!("ignoring {}", child.display());
            continue;
        }
        let contents = match fs::read_to_string(&child) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("skipping {}: {}", child.display(), e);
                continue;
            }
        };
        if extension == Some("txt") {
            children.push(Source::Text(TableSource::from_text(stem, &contents)));
        } else {
            children.push(Source::Structured(StructuredSource {
                id: stem.to_string(),
                json: contents,
            }));
        }
    }

    Ok(DirectorySource { id, children })
}

/// Write `<stem>.json` next to every text-derived table under `root`,
/// skipping any that already exist. Returns the files written.
///
/// `root` is the directory the registry was read from.
pub fn persist_derived(registry: &TableRegistry, root: impl AsRef<Path>) -> Result<Vec<PathBuf>, IoError> {
    let root = root.as_ref();
    let mut written = Vec::new();
    for node in registry.derived_tables() {
        let Some(table) = node.table() else {
            continue;
        };
        let Some((stem, dirs)) = node.source_path().split_last() else {
            continue;
        };
        let mut target: PathBuf = dirs.iter().fold(root.to_path_buf(), |p, d| p.join(d));
        target.push(format!("{}.json", stem));
        if target.exists() {
            log::debug!("{} already exists", target.display());
            continue;
        }
        fs::write(&target, serde_json::to_string_pretty(table)?)?;
        log::info!("wrote {}", target.display());
        written.push(target);
    }
    Ok(written)
}

pub fn load_city_data(path: impl AsRef<Path>) -> Result<CityData, IoError> {
    let contents = fs::read_to_string(path)?;
    Ok(ron::from_str(&contents)?)
}

fn file_name(path: &Path) -> Result<String, IoError> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| IoError::BadPath(path.to_path_buf()))
}
