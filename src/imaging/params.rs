//! Parameter types for image operations.
//!
//! Two layers live here:
//!
//! - **Tool options** ([`TransformOptions`] and its per-tool variants) are what
//!   the caller hands to a batch run. They are built from config and CLI flags,
//!   and their numeric fields are clamped on construction.
//! - **Backend params** ([`ConvertParams`], [`ResizeParams`], [`WatermarkParams`],
//!   [`CompressParams`]) describe exactly one pixel operation. They are computed by
//!   [`operations`](super::operations) from the options and the record, and are
//!   the interface to the [`backend`](super::backend). Swapping in a mock backend
//!   never changes how they are computed.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Opacity`]: Watermark alpha (0.0–1.0). Clamped on construction.
//! - [`Rgb`]: An opaque color parsed from `#rgb` / `#rrggbb`.
//! - [`OutputFormat`]: The three encodable formats.
//! - [`WatermarkPosition`]: The nine-way watermark anchor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    /// Any integer is accepted; values outside 1-100 are clamped.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(1, 100) as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Value as the `u8` the JPEG encoder expects.
    pub fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Drawing alpha for watermark text (0.0 = invisible, 1.0 = opaque).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opacity(f32);

impl Opacity {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Self(0.7)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color '{0}': expected #rgb, #rrggbb, white or black")]
pub struct ColorParseError(pub String);

/// An opaque RGB color.
///
/// Parsed from CSS-style hex (`#fff`, `#ffffff`) or the names `white` and
/// `black`. Serialized back as lowercase `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "white" => return Ok(Rgb::WHITE),
            "black" => return Ok(Rgb::BLACK),
            _ => {}
        }
        let err = || ColorParseError(s.to_string());
        let hex = trimmed.strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    // #abc expands to #aabbcc
                    let v = c.to_digit(16).ok_or_else(err)? as u8;
                    out[i] = v * 17;
                }
                Ok(Rgb(out))
            }
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
                Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
}

impl OutputFormat {
    /// File extension used for output names (`jpeg` keeps its long form, as
    /// the converter names files after the format token).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Whether the encoded file can carry an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(format!("unsupported output format '{other}' (png, jpeg, webp)")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Nine-way anchor for watermark text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 9] = [
        WatermarkPosition::TopLeft,
        WatermarkPosition::TopCenter,
        WatermarkPosition::TopRight,
        WatermarkPosition::CenterLeft,
        WatermarkPosition::Center,
        WatermarkPosition::CenterRight,
        WatermarkPosition::BottomLeft,
        WatermarkPosition::BottomCenter,
        WatermarkPosition::BottomRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "top-left",
            WatermarkPosition::TopCenter => "top-center",
            WatermarkPosition::TopRight => "top-right",
            WatermarkPosition::CenterLeft => "center-left",
            WatermarkPosition::Center => "center",
            WatermarkPosition::CenterRight => "center-right",
            WatermarkPosition::BottomLeft => "bottom-left",
            WatermarkPosition::BottomCenter => "bottom-center",
            WatermarkPosition::BottomRight => "bottom-right",
        }
    }
}

impl FromStr for WatermarkPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown watermark position '{s}'"))
    }
}

/// Named target sizes offered by the resize tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizePreset {
    Thumbnail,
    SocialMedia,
    Hd,
    Square,
}

impl ResizePreset {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            ResizePreset::Thumbnail => (200, 200),
            ResizePreset::SocialMedia => (1200, 630),
            ResizePreset::Hd => (1920, 1080),
            ResizePreset::Square => (500, 500),
        }
    }
}

impl FromStr for ResizePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thumbnail" => Ok(ResizePreset::Thumbnail),
            "social-media" => Ok(ResizePreset::SocialMedia),
            "hd" => Ok(ResizePreset::Hd),
            "square" => Ok(ResizePreset::Square),
            other => Err(format!(
                "unknown preset '{other}' (thumbnail, social-media, hd, square)"
            )),
        }
    }
}

// ============================================================================
// Tool options
// ============================================================================

/// Which tool produced an artifact. Drives the output filename convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Convert,
    Resize,
    Watermark,
    Compress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub format: OutputFormat,
    pub quality: Quality,
    pub background: Rgb,
    /// Force the matte on alpha-capable formats too.
    pub apply_background: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: Quality::default(),
            background: Rgb::WHITE,
            apply_background: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeOptions {
    pub width: u32,
    /// Ignored while `maintain_aspect_ratio` is set: width is authoritative.
    pub height: u32,
    pub maintain_aspect_ratio: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            maintain_aspect_ratio: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    pub font_size_px: u32,
    pub opacity: Opacity,
    pub position: WatermarkPosition,
    pub color: Rgb,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: "© 2025".to_string(),
            font_size_px: 40,
            opacity: Opacity::default(),
            position: WatermarkPosition::BottomRight,
            color: Rgb::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressOptions {
    pub quality: Quality,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            quality: Quality::new(75),
        }
    }
}

/// Options for one batch run, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOptions {
    Convert(ConvertOptions),
    Resize(ResizeOptions),
    Watermark(WatermarkOptions),
    Compress(CompressOptions),
}

impl TransformOptions {
    pub fn tool(&self) -> Tool {
        match self {
            TransformOptions::Convert(_) => Tool::Convert,
            TransformOptions::Resize(_) => Tool::Resize,
            TransformOptions::Watermark(_) => Tool::Watermark,
            TransformOptions::Compress(_) => Tool::Compress,
        }
    }

    /// Format every artifact of this run is encoded to.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            TransformOptions::Convert(o) => o.format,
            _ => OutputFormat::Jpeg,
        }
    }
}

// ============================================================================
// Backend params
// ============================================================================

/// Fixed quality for resize output.
pub const RESIZE_QUALITY: Quality = Quality(90);

/// Fixed quality for watermark output.
pub const WATERMARK_QUALITY: Quality = Quality(95);

/// Parameters for a format conversion (natural size, optional matte).
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub format: OutputFormat,
    pub quality: Quality,
    /// `Some` fills the surface before drawing; `None` keeps source alpha.
    pub background: Option<Rgb>,
}

/// Parameters for a scaled redraw at exact output dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Parameters for drawing watermark text over the unmodified source.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub text: String,
    pub font_size_px: u32,
    pub opacity: Opacity,
    pub position: WatermarkPosition,
    pub color: Rgb,
    pub quality: Quality,
}

/// Parameters for a lossy re-encode at natural size.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressParams {
    pub quality: Quality,
}
