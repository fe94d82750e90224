//! Pure calculation functions for image geometry and batch progress.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::WatermarkPosition;

/// Distance in pixels between watermark text and the edges it is anchored to.
pub const WATERMARK_PADDING: f32 = 20.0;

/// Calculate output dimensions for a resize.
///
/// Width is always authoritative. With the aspect ratio locked, height is
/// derived from the source ratio and `target.1` is ignored; otherwise the
/// target height is used verbatim. Neither edge drops below 1px.
///
/// # Examples
/// ```
/// # use image_toolkit::imaging::calculate_resize_dimensions;
/// // 800x600 locked to width 400 → 400x300
/// assert_eq!(calculate_resize_dimensions((800, 600), (400, 999), true), (400, 300));
///
/// // unlocked → target taken verbatim
/// assert_eq!(calculate_resize_dimensions((800, 600), (400, 999), false), (400, 999));
/// ```
pub fn calculate_resize_dimensions(
    source: (u32, u32),
    target: (u32, u32),
    maintain_aspect: bool,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    let width = tgt_w.max(1);

    let height = if maintain_aspect && src_w > 0 {
        (width as f64 * src_h as f64 / src_w as f64).round() as u32
    } else {
        tgt_h
    };

    (width, height.max(1))
}

/// Draw origin for watermark text: `x` is the left edge of the text run,
/// `y` is its baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOrigin {
    pub x: f32,
    pub y: f32,
}

/// Calculate where watermark text is drawn.
///
/// `text_height` stands in for the glyph box height (the font size), so
/// top rows drop the baseline by one text height below the padding and the
/// middle row centers the box vertically.
///
/// ```text
///  x: padding          (W - tw) / 2        W - tw - padding
///  y: padding + th     (H + th) / 2        H - padding
/// ```
pub fn watermark_origin(
    canvas: (u32, u32),
    text_width: f32,
    text_height: f32,
    position: WatermarkPosition,
) -> TextOrigin {
    use WatermarkPosition::*;

    let (w, h) = (canvas.0 as f32, canvas.1 as f32);
    let pad = WATERMARK_PADDING;

    let left = pad;
    let center_x = (w - text_width) / 2.0;
    let right = w - text_width - pad;

    let top = pad + text_height;
    let center_y = (h + text_height) / 2.0;
    let bottom = h - pad;

    let (x, y) = match position {
        TopLeft => (left, top),
        TopCenter => (center_x, top),
        TopRight => (right, top),
        CenterLeft => (left, center_y),
        Center => (center_x, center_y),
        CenterRight => (right, center_y),
        BottomLeft => (left, bottom),
        BottomCenter => (center_x, bottom),
        BottomRight => (right, bottom),
    };

    TextOrigin { x, y }
}

/// Aggregate batch progress as a percentage.
///
/// An empty batch is complete by definition.
pub fn progress_percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    completed.min(total) as f64 / total as f64 * 100.0
}
