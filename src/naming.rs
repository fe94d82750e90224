//! Centralized filename handling for uploaded images and their outputs.
//!
//! Every artifact name is derived from the uploaded file's display name in
//! one place, so the single-file download and the archive entries always
//! agree.
//!
//! ## Output Names
//!
//! The stem is everything before the **first** dot, so multi-dot names lose
//! all their extensions. The tool decides the suffix:
//! - convert: `holiday.final.png` → `holiday.webp` (the chosen format token)
//! - resize: `holiday.png` → `holiday_resized.jpg`
//! - compress: `holiday.png` → `holiday_compressed.jpg`
//! - watermark: `holiday.png` → `holiday_watermarked.jpg`

use crate::imaging::{OutputFormat, Tool};
use std::collections::HashSet;

/// Stem used when a name has nothing before its first dot.
const FALLBACK_STEM: &str = "image";

/// Stem of a display name: the last path component, cut at its first `.`.
///
/// - `"photo.png"` → `"photo"`
/// - `"photo.final.png"` → `"photo"`
/// - `"uploads/photo.png"` → `"photo"`
/// - `".hidden"` → `"image"`
pub fn file_stem(display_name: &str) -> &str {
    let base = display_name.rsplit(['/', '\\']).next().unwrap_or(display_name);
    let stem = base.split('.').next().unwrap_or("");
    if stem.is_empty() { FALLBACK_STEM } else { stem }
}

/// Output filename for an artifact produced by `tool`.
pub fn artifact_filename(display_name: &str, tool: Tool, format: OutputFormat) -> String {
    let stem = file_stem(display_name);
    match tool {
        Tool::Convert => format!("{stem}.{}", format.extension()),
        Tool::Resize => format!("{stem}_resized.jpg"),
        Tool::Compress => format!("{stem}_compressed.jpg"),
        Tool::Watermark => format!("{stem}_watermarked.jpg"),
    }
}

/// Lowercase format token for display labels.
///
/// The MIME subtype wins when a MIME type is known (`image/jpeg` → `jpeg`);
/// otherwise the filename extension is used; otherwise `unknown`.
pub fn original_format(display_name: &str, mime: Option<&str>) -> String {
    let subtype = mime
        .and_then(|m| m.split_once('/'))
        .map(|(_, sub)| sub)
        .filter(|sub| !sub.is_empty());
    if let Some(subtype) = subtype {
        return subtype.to_ascii_lowercase();
    }
    match display_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "unknown".to_string(),
    }
}

/// File size label in megabytes with two decimals, e.g. `"1.25 MB"`.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// `name` with a ` (n)` counter before its extension: `a.webp` → `a (2).webp`.
pub fn numbered_name(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => format!("{base} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Make archive entry names unique, preserving order.
///
/// The first occurrence of a name is kept as-is. Later repeats get a counter
/// before the extension: `a.webp`, `a (1).webp`, `a (2).webp`. A generated
/// name that collides with a later original is bumped again, so every entry
/// stays distinct.
pub fn unique_entry_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut result = Vec::new();

    for name in names {
        let candidate = if taken.contains(name) {
            (1..)
                .map(|n| numbered_name(name, n))
                .find(|c| !taken.contains(c))
                .unwrap_or_else(|| name.to_string())
        } else {
            name.to_string()
        };
        taken.insert(candidate.clone());
        result.push(candidate);
    }

    result
}
