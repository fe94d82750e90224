//! Input discovery.
//!
//! Turns command-line paths into [`RawFile`]s for the store. Files are taken
//! as given, in argument order. Directories are walked recursively and
//! contribute every supported image, sorted by path:
//!
//! ```text
//! image-toolkit convert shots/ extra.png
//!
//! shots/
//! ├── .thumbs/          # Hidden: skipped
//! ├── 01-beach.png      # → 1st
//! ├── notes.txt         # Unsupported extension: skipped
//! └── trip/
//!     └── dawn.webp     # → 2nd
//!                       # extra.png → 3rd
//! ```
//!
//! Explicitly named files are never filtered; if one cannot be decoded the
//! store skips it and the ingest report says so.

use crate::imaging::supported_input_extensions;
use crate::store::RawFile;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("No images found in the given inputs")]
    NoImages,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Whether `path` carries an extension the backend can decode.
pub fn is_supported_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

fn walk_directory(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut images = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// Expand files and directories into the ordered list of input files.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(walk_directory(path)?);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(InputError::NotFound(path.clone()));
        }
    }
    if files.is_empty() {
        return Err(InputError::NoImages);
    }
    Ok(files)
}

/// Collect and read every input, preserving order.
pub fn read_inputs(paths: &[PathBuf]) -> Result<Vec<RawFile>, InputError> {
    collect_inputs(paths)?
        .iter()
        .map(|path| RawFile::from_path(path).map_err(InputError::from))
        .collect()
}
