//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so output
//! can be tested without capturing stdout. The matching `print_*` wrappers
//! just print those lines.
//!
//! Records are listed by their 1-based position, zero-padded to three digits:
//!
//! ```text
//! Processing 3 images
//!     001 beach.png → beach.webp (33%)
//!     002 notes.png skipped (67%)
//!         Reason: Encode failed: …
//!     003 sunset.png → sunset.webp (100%)
//! Done: 2 produced, 1 skipped
//! ```

use crate::batch::BatchEvent;
use crate::imaging::PlannedArtifact;
use crate::naming::format_size;
use crate::package::Delivery;
use crate::store::{AddReport, ImageRecord};
use std::path::Path;

fn format_index(pos: usize) -> String {
    format!("{:03}", pos)
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Summarize an ingestion call: how many images loaded, which files were dropped.
pub fn format_ingest_report(report: &AddReport) -> Vec<String> {
    let mut lines = vec![format!("Loaded {}", plural(report.added.len(), "image"))];
    for skipped in &report.skipped {
        lines.push(format!("    Skipped {}: {}", skipped.name, skipped.error));
    }
    lines
}

pub fn print_ingest_report(report: &AddReport) {
    for line in format_ingest_report(report) {
        println!("{}", line);
    }
}

/// One line per record: position, name, format, dimensions and size label.
pub fn format_records(records: &[ImageRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let dims = record.preview().dimensions();
            format!(
                "{} {} [{}] {}x{} {}",
                format_index(i + 1),
                record.display_name(),
                record.original_format(),
                dims.width,
                dims.height,
                record.size_label()
            )
        })
        .collect()
}

pub fn print_records(records: &[ImageRecord]) {
    for line in format_records(records) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch progress
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total, .. } => {
            vec![format!("Processing {}", plural(*total, "image"))]
        }
        BatchEvent::Transformed {
            index,
            source,
            filename,
            percent,
            ..
        } => vec![format!(
            "    {} {} \u{2192} {} ({:.0}%)",
            format_index(*index),
            source,
            filename,
            percent
        )],
        BatchEvent::Skipped {
            index,
            source,
            reason,
            percent,
            ..
        } => vec![
            format!(
                "    {} {} skipped ({:.0}%)",
                format_index(*index),
                source,
                percent
            ),
            format!("        Reason: {}", reason),
        ],
        BatchEvent::Finished { produced, skipped } => {
            vec![format!("Done: {} produced, {} skipped", produced, skipped)]
        }
    }
}

// ============================================================================
// Planning and delivery
// ============================================================================

/// Format a dry-run plan: what each record would become.
pub fn format_plan(planned: &[PlannedArtifact]) -> Vec<String> {
    let mut lines = vec![format!("Plan for {}", plural(planned.len(), "image"))];
    for (i, p) in planned.iter().enumerate() {
        lines.push(format!(
            "    {} {} \u{2192} {} ({}x{} {})",
            format_index(i + 1),
            p.source,
            p.filename,
            p.width,
            p.height,
            p.format
        ));
    }
    lines
}

pub fn print_plan(planned: &[PlannedArtifact]) {
    for line in format_plan(planned) {
        println!("{}", line);
    }
}

/// Describe where a delivery was saved.
///
/// `saved_to` is the path the sink reported; the delivery's own filename is
/// shown when it is unknown.
pub fn format_delivery(delivery: &Delivery, saved_to: Option<&Path>) -> Vec<String> {
    let size = format_size(delivery.byte_len() as u64);
    let location = |filename: &str| {
        saved_to
            .unwrap_or(Path::new(filename))
            .display()
            .to_string()
    };
    match delivery {
        Delivery::Nothing => vec!["Nothing to deliver".to_string()],
        Delivery::Single(artifact) => {
            vec![format!("Saved {} ({})", location(&artifact.filename), size)]
        }
        Delivery::Archive {
            filename, entries, ..
        } => {
            let mut lines = vec![format!(
                "Saved {} ({}, {})",
                location(filename),
                plural(entries.len(), "file"),
                size
            )];
            for entry in entries {
                lines.push(format!("    {}", entry));
            }
            lines
        }
    }
}

pub fn print_delivery(delivery: &Delivery, saved_to: Option<&Path>) {
    for line in format_delivery(delivery, saved_to) {
        println!("{}", line);
    }
}
