//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five operations every backend must
//! support: decode, convert, resize, watermark, and compress. Each transform
//! reads a decoded source image and returns the encoded output bytes; nothing
//! touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, with the
//! watermark font embedded in the binary.

use super::params::{CompressParams, ConvertParams, ResizeParams, WatermarkParams};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Font error: {0}")]
    Font(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Every backend must implement all five operations so the store and the
/// batch runner stay backend-agnostic.
pub trait ImageBackend: Sync {
    /// Decode raw file bytes into a renderable image.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Re-encode at natural size, optionally over a solid matte.
    fn convert(&self, source: &DynamicImage, params: &ConvertParams)
    -> Result<Vec<u8>, BackendError>;

    /// Scale to exact dimensions and encode.
    fn resize(&self, source: &DynamicImage, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;

    /// Draw text over the source and encode.
    fn watermark(
        &self,
        source: &DynamicImage,
        params: &WatermarkParams,
    ) -> Result<Vec<u8>, BackendError>;

    /// Lossy re-encode at natural size.
    fn compress(
        &self,
        source: &DynamicImage,
        params: &CompressParams,
    ) -> Result<Vec<u8>, BackendError>;
}
