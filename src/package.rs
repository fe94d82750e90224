//! Download packaging.
//!
//! A batch run hands its artifacts to a [`Packager`], which decides how they
//! reach the user:
//!
//! | Artifacts | Delivery |
//! |---|---|
//! | 0 | [`Delivery::Nothing`] |
//! | 1 | [`Delivery::Single`], under the artifact's own filename |
//! | 2+ | [`Delivery::Archive`], one ZIP with every artifact at its root |
//!
//! The encoded formats are already compressed, so entries are stored
//! without further compression. Duplicate filenames are numbered by
//! [`naming::unique_entry_names`] so no entry overwrites another.
//!
//! The actual save step sits behind [`DownloadSink`]; [`DirectorySink`]
//! writes into a directory on disk. Like a browser download it never
//! replaces an existing file: a taken name is numbered instead
//! (`photo.png` → `photo (1).png`).

use crate::imaging::TransformedArtifact;
use crate::naming;
use std::fs::{self, OpenOptions};
use std::io::{Cursor, ErrorKind, Write};
use std::path::PathBuf;
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Name of the archive delivered for multi-artifact batches.
pub const DEFAULT_ARCHIVE_NAME: &str = "toolkitsol.com_images.zip";

#[derive(Error, Debug)]
pub enum PackagingError {
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a batch's output reaches the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Nothing,
    Single(TransformedArtifact),
    Archive {
        filename: String,
        bytes: Vec<u8>,
        entries: Vec<String>,
    },
}

impl Delivery {
    /// Filename the user receives, if anything is delivered.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Delivery::Nothing => None,
            Delivery::Single(artifact) => Some(&artifact.filename),
            Delivery::Archive { filename, .. } => Some(filename),
        }
    }

    /// Number of artifacts carried.
    pub fn artifact_count(&self) -> usize {
        match self {
            Delivery::Nothing => 0,
            Delivery::Single(_) => 1,
            Delivery::Archive { entries, .. } => entries.len(),
        }
    }

    /// Size in bytes of what the user receives.
    pub fn byte_len(&self) -> usize {
        match self {
            Delivery::Nothing => 0,
            Delivery::Single(artifact) => artifact.bytes.len(),
            Delivery::Archive { bytes, .. } => bytes.len(),
        }
    }
}

/// Chooses single-file or archive delivery for a batch's artifacts.
#[derive(Debug, Clone)]
pub struct Packager {
    archive_name: String,
}

impl Packager {
    pub fn new(archive_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
        }
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Package artifacts for delivery. Archive entries keep the input order.
    pub fn package(
        &self,
        mut artifacts: Vec<TransformedArtifact>,
    ) -> Result<Delivery, PackagingError> {
        match artifacts.len() {
            0 => Ok(Delivery::Nothing),
            1 => Ok(Delivery::Single(artifacts.remove(0))),
            _ => {
                let (bytes, entries) = build_archive(&artifacts)?;
                Ok(Delivery::Archive {
                    filename: self.archive_name.clone(),
                    bytes,
                    entries,
                })
            }
        }
    }
}

impl Default for Packager {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_NAME)
    }
}

fn build_archive(
    artifacts: &[TransformedArtifact],
) -> Result<(Vec<u8>, Vec<String>), PackagingError> {
    let entries = naming::unique_entry_names(artifacts.iter().map(|a| a.filename.as_str()));
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    for (artifact, entry) in artifacts.iter().zip(&entries) {
        writer.start_file(entry.as_str(), options)?;
        writer.write_all(&artifact.bytes)?;
    }

    let cursor = writer.finish()?;
    Ok((cursor.into_inner(), entries))
}

/// Destination for delivered downloads.
pub trait DownloadSink {
    /// Save `bytes` under `filename` and return where they landed.
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf>;
}

/// Saves downloads into a directory, creating it on first use.
/// Existing files are left alone.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let mut n = 0;
        loop {
            let name = match n {
                0 => filename.to_string(),
                _ => naming::numbered_name(filename, n),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(bytes)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Hand a delivery to `sink` and return where it was saved.
/// [`Delivery::Nothing`] saves nothing.
pub fn deliver(
    delivery: &Delivery,
    sink: &impl DownloadSink,
) -> Result<Option<PathBuf>, PackagingError> {
    let saved = match delivery {
        Delivery::Nothing => None,
        Delivery::Single(artifact) => Some(sink.save(&artifact.filename, &artifact.bytes)?),
        Delivery::Archive { filename, bytes, .. } => Some(sink.save(filename, bytes)?),
    };
    Ok(saved)
}
