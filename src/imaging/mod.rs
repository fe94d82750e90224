//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Convert** | matte via `imageops::overlay`, PNG / JPEG / lossless WebP encoders |
//! | **Resize** | `resize_exact` with Lanczos3, JPEG q90 |
//! | **Watermark** | `imageproc::drawing::draw_text_mut` + `ab_glyph`, JPEG q95 |
//! | **Compress** | JPEG at the requested quality |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and placement math (unit testable)
//! - **Parameters**: Tool options and the backend params derived from them
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    TextOrigin, WATERMARK_PADDING, calculate_resize_dimensions, progress_percent,
    watermark_origin,
};
pub use operations::{PlannedArtifact, TransformError, TransformedArtifact, plan, transform};
pub use params::{
    ColorParseError, CompressOptions, CompressParams, ConvertOptions, ConvertParams, Opacity,
    OutputFormat, Quality, ResizeOptions, ResizeParams, ResizePreset, Rgb, Tool,
    TransformOptions, WatermarkOptions, WatermarkParams, WatermarkPosition,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
