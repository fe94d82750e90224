//! In-memory image store.
//!
//! The store owns every ingested [`ImageRecord`] in the order it was added.
//! Ingestion decodes all files of one call in parallel (rayon preserves
//! input order on `collect`), then assigns ids sequentially so records
//! always appear in the order the caller supplied them.
//!
//! ## Preview lifetime
//!
//! Each record holds a decoded preview through a [`PreviewHandle`]. Handles
//! are not `Clone`; dropping one releases it against the store's
//! [`PreviewTracker`]. Removing a record, resetting the store, or dropping
//! the store therefore releases each preview exactly once, and
//! [`PreviewTracker::live`] always equals the number of records alive.

use crate::imaging::{BackendError, Dimensions, ImageBackend};
use crate::naming;
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A file handed to the store: display name, optional MIME type, raw bytes.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a file from disk. The MIME type is guessed from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = ImageFormat::from_path(path)
            .ok()
            .map(|f| f.to_mime_type().to_string());
        Ok(Self { name, mime, bytes })
    }
}

/// Unique identifier of a record within one store.
///
/// Format: `{sequence:04}-{first 8 hex chars of SHA-256(bytes)}`. The
/// sequence never repeats for the lifetime of the store, so ids stay
/// unique even when identical files are added twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(String);

impl RecordId {
    fn assign(sequence: u64, bytes: &[u8]) -> Self {
        let digest = format!("{:x}", Sha256::digest(bytes));
        Self(format!("{sequence:04}-{}", &digest[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct PreviewCounts {
    live: AtomicUsize,
    released: AtomicUsize,
}

/// Counts outstanding and released preview handles.
///
/// Cloning shares the counters, so a caller can keep a tracker while the
/// store that feeds it is dropped.
#[derive(Debug, Clone, Default)]
pub struct PreviewTracker {
    counts: Arc<PreviewCounts>,
}

impl PreviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles acquired and not yet released.
    pub fn live(&self) -> usize {
        self.counts.live.load(Ordering::SeqCst)
    }

    /// Handles released so far.
    pub fn released(&self) -> usize {
        self.counts.released.load(Ordering::SeqCst)
    }

    fn acquire(&self, image: DynamicImage) -> PreviewHandle {
        self.counts.live.fetch_add(1, Ordering::SeqCst);
        PreviewHandle {
            image,
            counts: Arc::clone(&self.counts),
        }
    }
}

/// Owned, displayable preview of a record. Released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    image: DynamicImage,
    counts: Arc<PreviewCounts>,
}

impl PreviewHandle {
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
        self.counts.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// One ingested image.
///
/// The source bytes are never modified after ingestion.
#[derive(Debug)]
pub struct ImageRecord {
    id: RecordId,
    source_bytes: Vec<u8>,
    preview: PreviewHandle,
    display_name: String,
    original_format: String,
    byte_size: u64,
}

impl ImageRecord {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn original_format(&self) -> &str {
        &self.original_format
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn size_label(&self) -> String {
        naming::format_size(self.byte_size)
    }

    pub fn summary(&self) -> RecordSummary {
        let Dimensions { width, height } = self.preview.dimensions();
        RecordSummary {
            id: self.id.clone(),
            name: self.display_name.clone(),
            format: self.original_format.clone(),
            width,
            height,
            bytes: self.byte_size,
            size: self.size_label(),
        }
    }
}

/// Serializable view of a record, used for `inspect` output.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub name: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub size: String,
}

/// A file that ingestion dropped because it could not be decoded.
#[derive(Debug)]
pub struct SkippedFile {
    pub name: String,
    pub error: BackendError,
}

/// Outcome of one [`ImageStore::add_images`] call.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<RecordId>,
    pub skipped: Vec<SkippedFile>,
}

/// Ordered collection of ingested images.
#[derive(Debug, Default)]
pub struct ImageStore {
    records: Vec<ImageRecord>,
    tracker: PreviewTracker,
    next_sequence: u64,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that reports preview acquisition to `tracker`.
    pub fn with_tracker(tracker: PreviewTracker) -> Self {
        Self {
            tracker,
            ..Self::default()
        }
    }

    /// Decode and append `files`, keeping their order.
    ///
    /// Files that fail to decode are left out of the store and listed in
    /// [`AddReport::skipped`]; they never abort the call.
    pub fn add_images(&mut self, backend: &impl ImageBackend, files: Vec<RawFile>) -> AddReport {
        let decoded: Vec<(RawFile, Result<DynamicImage, BackendError>)> = files
            .into_par_iter()
            .map(|file| {
                let result = backend.decode(&file.bytes);
                (file, result)
            })
            .collect();

        let mut report = AddReport::default();
        for (file, result) in decoded {
            match result {
                Ok(image) => {
                    let id = RecordId::assign(self.next_sequence, &file.bytes);
                    self.next_sequence += 1;
                    let record = ImageRecord {
                        id: id.clone(),
                        original_format: naming::original_format(&file.name, file.mime.as_deref()),
                        byte_size: file.bytes.len() as u64,
                        preview: self.tracker.acquire(image),
                        display_name: file.name,
                        source_bytes: file.bytes,
                    };
                    self.records.push(record);
                    report.added.push(id);
                }
                Err(error) => report.skipped.push(SkippedFile {
                    name: file.name,
                    error,
                }),
            }
        }
        report
    }

    /// Remove a record and release its preview. Unknown ids are a no-op.
    pub fn remove_image(&mut self, id: &RecordId) -> bool {
        match self.records.iter().position(|r| r.id() == id) {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every record, releasing all previews.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn get(&self, id: &RecordId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn tracker(&self) -> &PreviewTracker {
        &self.tracker
    }

    /// Previews currently held by this store's tracker.
    pub fn live_previews(&self) -> usize {
        self.tracker.live()
    }
}
