//! # Image Toolkit
//!
//! Batch image conversion, compression, resizing and watermarking. Images are
//! loaded into an in-memory store, one tool runs over every image in order,
//! and the results are delivered as a single file or, for two or more
//! results, as one ZIP archive.
//!
//! # Architecture: Store → Batch → Package
//!
//! ```text
//! 1. Ingest    files    →  ImageStore   (decode, preview, display metadata)
//! 2. Batch     store    →  artifacts    (one tool, strictly in store order)
//! 3. Package   artifacts →  delivery    (nothing / single file / archive)
//! ```
//!
//! Every pixel operation goes through the [`imaging::ImageBackend`] trait, so
//! the store, the batch runner and the packager are all exercised in unit
//! tests with a recording mock backend; only the backend tests and the
//! integration suite touch real encoders.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`store`] | Ordered image records, parallel decode on ingest, preview lifetime tracking |
//! | [`imaging`] | Tool options, geometry math, the backend trait and the pure-Rust backend |
//! | [`batch`] | Sequential batch runs with aggregate progress and per-record skip |
//! | [`package`] | Single-file vs. archive delivery and the download sink |
//! | [`naming`] | Output filename rules and display labels |
//! | [`input`] | Expands command-line files and directories into raw inputs |
//! | [`config`] | `image-toolkit.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting for ingest, progress, plans and deliveries |
//!
//! # Design Decisions
//!
//! ## One Record at a Time
//!
//! Decoding on ingest runs in parallel on the rayon pool, but batch runs
//! transform records strictly one after another. Progress is then a simple
//! `completed / total` ratio and the archive's entry order always matches
//! the store order.
//!
//! ## Skip, Don't Abort
//!
//! A record that fails to transform is reported and skipped. The rest of the
//! batch still runs and still gets delivered. Only a failure to package or
//! save the output fails the run.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, text is rasterized with
//! `imageproc` + `ab_glyph`, and a watermark font is embedded in the binary.
//! No system libraries, no font lookup at runtime.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod input;
pub mod naming;
pub mod output;
pub mod package;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
