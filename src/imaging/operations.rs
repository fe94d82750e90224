//! High-level image operations.
//!
//! These functions combine calculations with backend execution. They take a
//! record and the run's [`TransformOptions`], compute backend parameters,
//! and call the backend. [`plan`] computes the same parameters without
//! touching pixels, for dry runs.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_resize_dimensions;
use super::params::{
    CompressParams, ConvertOptions, ConvertParams, OutputFormat, RESIZE_QUALITY, ResizeOptions,
    ResizeParams, TransformOptions, WATERMARK_QUALITY, WatermarkOptions, WatermarkParams,
};
use crate::naming::artifact_filename;
use crate::store::{ImageRecord, RecordId};
use serde::Serialize;
use thiserror::Error;

/// A record could not be transformed. The batch skips it and moves on.
#[derive(Error, Debug)]
#[error("failed to transform {name}: {source}")]
pub struct TransformError {
    pub name: String,
    #[source]
    pub source: BackendError,
}

/// Encoded output of one transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedArtifact {
    pub source_id: RecordId,
    pub filename: String,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// What a transform would produce, computed without encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedArtifact {
    pub source: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

/// Backend params for a conversion.
///
/// JPEG always gets the matte, since it cannot carry alpha; other formats
/// only when the caller forces it.
fn convert_params(options: &ConvertOptions) -> ConvertParams {
    let matte = options.format == OutputFormat::Jpeg || options.apply_background;
    ConvertParams {
        format: options.format,
        quality: options.quality,
        background: matte.then_some(options.background),
    }
}

fn resize_params(source: (u32, u32), options: &ResizeOptions) -> ResizeParams {
    let (width, height) = calculate_resize_dimensions(
        source,
        (options.width, options.height),
        options.maintain_aspect_ratio,
    );
    ResizeParams {
        width,
        height,
        quality: RESIZE_QUALITY,
    }
}

fn watermark_params(options: &WatermarkOptions) -> WatermarkParams {
    WatermarkParams {
        text: options.text.clone(),
        font_size_px: options.font_size_px.max(1),
        opacity: options.opacity,
        position: options.position,
        color: options.color,
        quality: WATERMARK_QUALITY,
    }
}

/// Produce one artifact from `record`.
pub fn transform(
    backend: &impl ImageBackend,
    record: &ImageRecord,
    options: &TransformOptions,
) -> Result<TransformedArtifact, TransformError> {
    let preview = record.preview().image();
    let natural = (preview.width(), preview.height());

    let encoded = match options {
        TransformOptions::Convert(o) => backend.convert(preview, &convert_params(o)),
        TransformOptions::Resize(o) => backend.resize(preview, &resize_params(natural, o)),
        TransformOptions::Watermark(o) => backend.watermark(preview, &watermark_params(o)),
        TransformOptions::Compress(o) => {
            backend.compress(preview, &CompressParams { quality: o.quality })
        }
    };
    let bytes = encoded.map_err(|source| TransformError {
        name: record.display_name().to_string(),
        source,
    })?;

    Ok(TransformedArtifact {
        source_id: record.id().clone(),
        filename: artifact_filename(record.display_name(), options.tool(), options.output_format()),
        format: options.output_format(),
        bytes,
    })
}

/// Compute the output name and dimensions of a transform without running it.
pub fn plan(record: &ImageRecord, options: &TransformOptions) -> PlannedArtifact {
    let dims = record.preview().dimensions();
    let (width, height) = match options {
        TransformOptions::Resize(o) => {
            let params = resize_params((dims.width, dims.height), o);
            (params.width, params.height)
        }
        _ => (dims.width, dims.height),
    };

    PlannedArtifact {
        source: record.display_name().to_string(),
        filename: artifact_filename(record.display_name(), options.tool(), options.output_format()),
        width,
        height,
        format: options.output_format(),
    }
}
