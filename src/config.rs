//! Tool configuration module.
//!
//! Handles loading, validating, and merging the `image-toolkit.toml` file.
//! Stock defaults are overridden by the user file, and command-line flags
//! override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [convert]
//! format = "png"            # png, jpeg (or jpg), webp
//! quality = 90              # Lossy quality (1-100); lossless WebP ignores it
//! background = "#ffffff"    # Matte behind transparent pixels for JPEG
//! apply_background = false  # Also apply the matte to PNG / WebP
//!
//! [resize]
//! width = 800
//! height = 600              # Ignored while maintain_aspect_ratio is true
//! maintain_aspect_ratio = true
//!
//! [watermark]
//! text = "© 2025"
//! font_size = 40            # Pixels
//! opacity = 0.7             # 0.0-1.0
//! position = "bottom-right" # top|center|bottom - left|center|right, or "center"
//! color = "#ffffff"
//! # font = "/path/to/font.ttf"  # Defaults to the embedded DejaVu Sans Bold
//!
//! [compress]
//! quality = 75
//!
//! [archive]
//! name = "toolkitsol.com_images.zip"  # Used when a batch yields 2+ files
//!
//! [processing]
//! max_processes = 4         # Max parallel decoders (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [watermark]
//! text = "ACME Corp"
//! position = "top-left"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    CompressOptions, ConvertOptions, Opacity, OutputFormat, Quality, ResizeOptions, Rgb,
    WatermarkOptions, WatermarkPosition,
};
use crate::package::DEFAULT_ARCHIVE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "image-toolkit.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Tool configuration loaded from `image-toolkit.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Format conversion defaults.
    pub convert: ConvertConfig,
    /// Resize defaults.
    pub resize: ResizeConfig,
    /// Watermark text, style and placement.
    pub watermark: WatermarkConfig,
    /// Compression defaults.
    pub compress: CompressConfig,
    /// Multi-file delivery settings.
    pub archive: ArchiveConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ToolConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.width == 0 {
            return Err(ConfigError::Validation(
                "resize.width must be at least 1".into(),
            ));
        }
        if self.resize.height == 0 {
            return Err(ConfigError::Validation(
                "resize.height must be at least 1".into(),
            ));
        }
        if self.watermark.font_size == 0 {
            return Err(ConfigError::Validation(
                "watermark.font_size must be at least 1".into(),
            ));
        }
        if self.archive.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "archive.name must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Format conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub format: OutputFormat,
    /// Clamped to 1-100 when turned into options.
    pub quality: i64,
    /// Matte color behind transparent pixels.
    pub background: Rgb,
    /// Apply the matte to alpha-capable formats as well.
    pub apply_background: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 90,
            background: Rgb::WHITE,
            apply_background: false,
        }
    }
}

impl ConvertConfig {
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            format: self.format,
            quality: Quality::new(self.quality),
            background: self.background,
            apply_background: self.apply_background,
        }
    }
}

/// Resize settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub width: u32,
    pub height: u32,
    pub maintain_aspect_ratio: bool,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            maintain_aspect_ratio: true,
        }
    }
}

impl ResizeConfig {
    pub fn to_options(&self) -> ResizeOptions {
        ResizeOptions {
            width: self.width,
            height: self.height,
            maintain_aspect_ratio: self.maintain_aspect_ratio,
        }
    }
}

/// Watermark settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub text: String,
    /// Font size in pixels.
    pub font_size: u32,
    /// Clamped to 0.0-1.0 when turned into options.
    pub opacity: f32,
    pub position: WatermarkPosition,
    pub color: Rgb,
    /// TTF/OTF file for the text. The embedded font is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "© 2025".to_string(),
            font_size: 40,
            opacity: 0.7,
            position: WatermarkPosition::BottomRight,
            color: Rgb::WHITE,
            font: None,
        }
    }
}

impl WatermarkConfig {
    pub fn to_options(&self) -> WatermarkOptions {
        WatermarkOptions {
            text: self.text.clone(),
            font_size_px: self.font_size,
            opacity: Opacity::new(self.opacity),
            position: self.position,
            color: self.color,
        }
    }
}

/// Compression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressConfig {
    /// Clamped to 1-100 when turned into options.
    pub quality: i64,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self { quality: 75 }
    }
}

impl CompressConfig {
    pub fn to_options(&self) -> CompressOptions {
        CompressOptions {
            quality: Quality::new(self.quality),
        }
    }
}

/// Multi-file delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Filename of the archive delivered for batches with 2+ artifacts.
    pub name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel decode workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `image-toolkit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Toolkit Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Looked up as ./image-toolkit.toml, or pass --config <file>.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Format conversion
# ---------------------------------------------------------------------------
[convert]
# Output format: "png", "jpeg" (or "jpg"), "webp".
format = "png"

# Lossy encoding quality (1 = worst, 100 = best).
# WebP output is lossless and ignores this value.
quality = 90

# Solid color behind transparent pixels. Always applied for JPEG,
# which cannot store transparency.
background = "#ffffff"

# Apply the background to PNG and WebP output as well.
apply_background = false

# ---------------------------------------------------------------------------
# Resizing
# ---------------------------------------------------------------------------
[resize]
# Target width in pixels. Always honored exactly.
width = 800

# Target height in pixels. Only used when maintain_aspect_ratio = false;
# otherwise the height follows the source proportions.
height = 600

maintain_aspect_ratio = true

# ---------------------------------------------------------------------------
# Watermark
# ---------------------------------------------------------------------------
[watermark]
text = "© 2025"

# Font size in pixels.
font_size = 40

# Text opacity (0.0 = invisible, 1.0 = solid).
opacity = 0.7

# One of: top-left, top-center, top-right, center-left, center,
# center-right, bottom-left, bottom-center, bottom-right.
position = "bottom-right"

color = "#ffffff"

# TTF/OTF font file. Uses the embedded DejaVu Sans Bold when unset.
# font = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compress]
# JPEG quality (1 = smallest file, 100 = best quality).
quality = 75

# ---------------------------------------------------------------------------
# Delivery
# ---------------------------------------------------------------------------
[archive]
# Batches producing two or more files are delivered as one ZIP archive.
name = "toolkitsol.com_images.zip"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for decoding input files.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4
"##
}
