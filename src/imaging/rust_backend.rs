//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary, including the default
//! watermark font.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Matte / draw source | `image::imageops::overlay` onto a filled `RgbaImage` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Measure / rasterize text | `imageproc::drawing::{text_size, draw_text_mut}` + `ab_glyph` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 1–100) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless only; quality ignored) |

use super::backend::{BackendError, ImageBackend};
use super::calculations::watermark_origin;
use super::params::{
    CompressParams, ConvertParams, OutputFormat, Quality, ResizeParams, Rgb, WatermarkParams,
};
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{
    DynamicImage, ExtendedColorType, GrayImage, ImageEncoder, Luma, RgbImage, Rgba, RgbaImage,
};
use std::path::Path;

/// DejaVu Sans Bold, the watermark font when none is configured.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Matte behind transparent pixels when a tool encodes JPEG without an
/// explicit background: black, matching a canvas JPEG export.
const JPEG_MATTE: Rgb = Rgb::BLACK;

/// Extensions the compiled-in decoders handle.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    font: FontArc,
}

impl RustBackend {
    pub fn new() -> Self {
        let font = FontArc::try_from_slice(EMBEDDED_FONT).expect("embedded font must parse");
        Self { font }
    }

    /// Use a TTF/OTF file for watermark text instead of the embedded font.
    pub fn with_font_file(path: &Path) -> Result<Self, BackendError> {
        let data = std::fs::read(path)?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| BackendError::Font(format!("{}: {e}", path.display())))?;
        Ok(Self { font })
    }

    /// Rendered advance width of `text` at `font_size_px`.
    pub fn measure_text(&self, text: &str, font_size_px: u32) -> u32 {
        let (width, _) = imageproc::drawing::text_size(
            PxScale::from(font_size_px as f32),
            &self.font,
            text,
        );
        width
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill a surface of the source's size with `matte`, then draw the source on top.
fn composite_on(source: &RgbaImage, matte: Rgb) -> RgbaImage {
    let [r, g, b] = matte.0;
    let (w, h) = source.dimensions();
    let mut surface = RgbaImage::from_pixel(w, h, Rgba([r, g, b, 255]));
    imageops::overlay(&mut surface, source, 0, 0);
    surface
}

/// Composite over `matte` and drop the (now fully opaque) alpha channel.
fn flatten(source: &RgbaImage, matte: Rgb) -> RgbImage {
    DynamicImage::ImageRgba8(composite_on(source, matte)).to_rgb8()
}

/// Encode a surface. JPEG output is flattened first; the other formats keep alpha.
fn encode(
    surface: &RgbaImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let (w, h) = surface.dimensions();
    let mut buf = Vec::new();

    let result = match format {
        OutputFormat::Jpeg => {
            let flat = flatten(surface, JPEG_MATTE);
            JpegEncoder::new_with_quality(&mut buf, quality.as_u8()).write_image(
                flat.as_raw(),
                w,
                h,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buf).write_image(surface.as_raw(), w, h, ExtendedColorType::Rgba8)
        }
        OutputFormat::Webp => WebPEncoder::new_lossless(&mut buf).write_image(
            surface.as_raw(),
            w,
            h,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| BackendError::Encode(format!("{format}: {e}")))?;
    if buf.is_empty() {
        return Err(BackendError::Encode(format!("{format}: encoder yielded no output")));
    }
    Ok(buf)
}

/// Blend `color` into `surface` through a coverage mask, scaled by `opacity`.
///
/// Source-over compositing: the mask value times opacity is the text alpha.
fn blend_mask(surface: &mut RgbaImage, mask: &GrayImage, color: Rgb, opacity: f32) {
    for (x, y, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 {
            continue;
        }
        let alpha = (*coverage as f32 / 255.0) * opacity;
        let px = surface.get_pixel_mut(x, y);
        for c in 0..3 {
            let under = px.0[c] as f32;
            px.0[c] = (color.0[c] as f32 * alpha + under * (1.0 - alpha)).round() as u8;
        }
        let under_alpha = px.0[3] as f32 / 255.0;
        px.0[3] = ((alpha + under_alpha * (1.0 - alpha)) * 255.0).round() as u8;
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn convert(
        &self,
        source: &DynamicImage,
        params: &ConvertParams,
    ) -> Result<Vec<u8>, BackendError> {
        let pixels = source.to_rgba8();
        let surface = match params.background {
            Some(matte) => composite_on(&pixels, matte),
            // Transparent surface + unscaled draw is the source itself
            None => pixels,
        };
        encode(&surface, params.format, params.quality)
    }

    fn resize(
        &self,
        source: &DynamicImage,
        params: &ResizeParams,
    ) -> Result<Vec<u8>, BackendError> {
        let scaled = source.resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode(&scaled.to_rgba8(), OutputFormat::Jpeg, params.quality)
    }

    fn watermark(
        &self,
        source: &DynamicImage,
        params: &WatermarkParams,
    ) -> Result<Vec<u8>, BackendError> {
        let mut surface = source.to_rgba8();
        let (w, h) = surface.dimensions();

        if !params.text.is_empty() {
            let scale = PxScale::from(params.font_size_px as f32);
            let text_width = self.measure_text(&params.text, params.font_size_px);
            let origin = watermark_origin(
                (w, h),
                text_width as f32,
                params.font_size_px as f32,
                params.position,
            );

            // draw_text_mut anchors at the top of the line box, the origin is a baseline
            let ascent = self.font.as_scaled(scale).ascent();
            let mut mask = GrayImage::new(w, h);
            imageproc::drawing::draw_text_mut(
                &mut mask,
                Luma([255u8]),
                origin.x.round() as i32,
                (origin.y - ascent).round() as i32,
                scale,
                &self.font,
                &params.text,
            );
            blend_mask(&mut surface, &mask, params.color, params.opacity.value());
        }

        encode(&surface, OutputFormat::Jpeg, params.quality)
    }

    fn compress(
        &self,
        source: &DynamicImage,
        params: &CompressParams,
    ) -> Result<Vec<u8>, BackendError> {
        encode(&source.to_rgba8(), OutputFormat::Jpeg, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{Opacity, WatermarkPosition};
    use crate::test_helpers::png_bytes;

    /// Left half opaque red, right half fully transparent.
    fn half_transparent(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        }))
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "webp"] {
            assert!(exts.contains(expected), "expected {expected} in supported extensions");
        }
    }

    #[test]
    fn decode_png_bytes() {
        let backend = RustBackend::new();
        let bytes = png_bytes(&RgbaImage::new(64, 48));
        let img = backend.decode(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn decode_garbage_errors() {
        let backend = RustBackend::new();
        assert!(matches!(
            backend.decode(b"definitely not an image"),
            Err(BackendError::Decode(_))
        ));
    }

    #[test]
    fn convert_to_jpeg_is_opaque() {
        let backend = RustBackend::new();
        let bytes = backend
            .convert(
                &half_transparent(40, 20),
                &ConvertParams {
                    format: OutputFormat::Jpeg,
                    quality: Quality::new(90),
                    background: Some(Rgb::WHITE),
                },
            )
            .unwrap();

        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!((out.width(), out.height()), (40, 20));
        assert!(!out.color().has_alpha());
        // transparent half picked up the white matte
        let px = out.to_rgb8().get_pixel(35, 10).0;
        assert!(px.iter().all(|&c| c > 230), "expected white matte, got {px:?}");
    }

    #[test]
    fn convert_to_png_keeps_transparency() {
        let backend = RustBackend::new();
        let bytes = backend
            .convert(
                &half_transparent(40, 20),
                &ConvertParams {
                    format: OutputFormat::Png,
                    quality: Quality::new(100),
                    background: None,
                },
            )
            .unwrap();

        let out = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(35, 10).0[3], 0);
        assert_eq!(out.get_pixel(5, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn convert_forced_background_on_png_fills_alpha() {
        let backend = RustBackend::new();
        let bytes = backend
            .convert(
                &half_transparent(40, 20),
                &ConvertParams {
                    format: OutputFormat::Png,
                    quality: Quality::new(90),
                    background: Some("#0000ff".parse().unwrap()),
                },
            )
            .unwrap();

        let out = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert!(out.pixels().all(|p| p.0[3] == 255));
        assert_eq!(out.get_pixel(35, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn convert_to_webp_keeps_dimensions() {
        let backend = RustBackend::new();
        let bytes = backend
            .convert(
                &gradient(33, 17),
                &ConvertParams {
                    format: OutputFormat::Webp,
                    quality: Quality::new(80),
                    background: None,
                },
            )
            .unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::WebP);
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!((out.width(), out.height()), (33, 17));
    }

    #[test]
    fn resize_outputs_exact_dimensions() {
        let backend = RustBackend::new();
        let bytes = backend
            .resize(
                &gradient(800, 600),
                &ResizeParams {
                    width: 400,
                    height: 300,
                    quality: Quality::new(90),
                },
            )
            .unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!((out.width(), out.height()), (400, 300));
    }

    #[test]
    fn compress_lower_quality_is_smaller() {
        let backend = RustBackend::new();
        let img = gradient(256, 256);
        let low = backend
            .compress(&img, &CompressParams { quality: Quality::new(10) })
            .unwrap();
        let high = backend
            .compress(&img, &CompressParams { quality: Quality::new(95) })
            .unwrap();
        assert!(low.len() < high.len(), "q10 {} >= q95 {}", low.len(), high.len());
    }

    fn dark_canvas(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([30, 30, 30])))
    }

    fn watermark_params(position: WatermarkPosition) -> WatermarkParams {
        WatermarkParams {
            text: "© 2025".to_string(),
            font_size_px: 40,
            opacity: Opacity::new(1.0),
            position,
            color: Rgb::WHITE,
            quality: Quality::new(95),
        }
    }

    /// Bounding box (min_x, min_y, max_x, max_y) of pixels brighter than the dark source.
    fn ink_bounds(img: &RgbImage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, px) in img.enumerate_pixels() {
            if px.0.iter().all(|&c| c > 160) {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    #[test]
    fn watermark_bottom_right_lands_in_padded_corner() {
        let backend = RustBackend::new();
        let source = dark_canvas(1000, 800);
        let bytes = backend
            .watermark(&source, &watermark_params(WatermarkPosition::BottomRight))
            .unwrap();

        let out = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (1000, 800));

        let (min_x, min_y, max_x, max_y) = ink_bounds(&out).expect("watermark text rendered");
        // right edge within padding (plus glyph-metric slack) of x=1000
        assert!((960..=982).contains(&max_x), "rightmost ink at {max_x}");
        // baseline within padding of y=800
        assert!((770..=790).contains(&max_y), "lowest ink at {max_y}");
        assert!(min_x > 800 && min_y > 700, "text strayed to ({min_x}, {min_y})");
    }

    #[test]
    fn watermark_top_left_lands_in_padded_corner() {
        let backend = RustBackend::new();
        let source = dark_canvas(600, 400);
        let bytes = backend
            .watermark(&source, &watermark_params(WatermarkPosition::TopLeft))
            .unwrap();

        let out = image::load_from_memory(&bytes).unwrap().to_rgb8();
        let (min_x, min_y, _, max_y) = ink_bounds(&out).expect("watermark text rendered");
        assert!((18..=30).contains(&min_x), "leftmost ink at {min_x}");
        assert!(min_y >= 15, "text clipped at top: {min_y}");
        assert!(max_y <= 65, "baseline too low: {max_y}");
    }

    #[test]
    fn watermark_zero_opacity_leaves_source_untouched() {
        let backend = RustBackend::new();
        let source = dark_canvas(300, 200);
        let params = WatermarkParams {
            opacity: Opacity::new(0.0),
            ..watermark_params(WatermarkPosition::Center)
        };
        let bytes = backend.watermark(&source, &params).unwrap();
        let out = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert!(ink_bounds(&out).is_none());
    }

    #[test]
    fn measure_text_grows_with_font_size() {
        let backend = RustBackend::new();
        let small = backend.measure_text("© 2025", 20);
        let large = backend.measure_text("© 2025", 40);
        assert!(small > 0);
        assert!(large > small);
    }

    #[test]
    fn with_font_file_rejects_non_font() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("bogus.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(
            RustBackend::with_font_file(&path),
            Err(BackendError::Font(_))
        ));
    }

    #[test]
    fn with_font_file_missing_is_io_error() {
        assert!(matches!(
            RustBackend::with_font_file(Path::new("/nonexistent/font.ttf")),
            Err(BackendError::Io(_))
        ));
    }

    #[test]
    fn flatten_blends_semi_transparent_pixels() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        let flat = flatten(&src, Rgb::BLACK);
        let v = flat.get_pixel(0, 0).0[0];
        assert!((120..=136).contains(&v), "expected mid gray, got {v}");
    }
}
