//! Shared test utilities for the image-toolkit test suite.
//!
//! Provides store builders over the recording mock backend and small
//! encoders for synthetic images, so module tests stay focused on behavior.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let backend = MockBackend::new();
//! let store = mock_store(&backend, &[("beach.png", 800, 600), ("dawn.jpg", 600, 800)]);
//! assert_eq!(store.len(), 2);
//! ```

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

pub use crate::imaging::backend::tests::{MockBackend, RecordedOp, mock_image_bytes};
use crate::store::{ImageStore, RawFile};

// =========================================================================
// Store setup
// =========================================================================

/// Build a store whose records decode through `backend` to blank images of
/// the given sizes, in the given order.
pub fn mock_store(backend: &MockBackend, files: &[(&str, u32, u32)]) -> ImageStore {
    let mut store = ImageStore::new();
    let raw = files
        .iter()
        .map(|&(name, w, h)| RawFile::new(name, mock_image_bytes(w, h)))
        .collect();
    let report = store.add_images(backend, raw);
    assert!(report.skipped.is_empty(), "mock files must all decode");
    store
}

/// Operations the backend recorded after ingestion (decodes filtered out).
pub fn transform_ops(backend: &MockBackend) -> Vec<RecordedOp> {
    backend
        .get_operations()
        .into_iter()
        .filter(|op| !matches!(op, RecordedOp::Decode(_)))
        .collect()
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode an RGBA image as PNG bytes.
pub fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .unwrap();
    buf
}
