//! # pixel-squeeze
//!
//! A batch image compressor. Give it a handful of images and, for each one,
//! it searches across output formats (and, optionally, lower quality
//! settings) for the smallest encoding, keeps the original when nothing
//! beats it, renders a difference overlay for visual QA, and packages the
//! results as individual files or one zip archive.
//!
//! # Architecture: Intake → Search → Export
//!
//! ```text
//! 1. Intake    files      →  BatchSession       (type, size, count, duplicate checks)
//! 2. Search    per entry  →  CompressionResult  (formats × quality, retention, diff)
//! 3. Export    session    →  downloads / .zip   (one file per result)
//! ```
//!
//! Everything lives in memory for one session. Processing is sequential: one
//! image is decoded at a time, so peak memory stays at a single surface plus
//! its candidate encodings.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Intake validation, batch limits, entries and their results |
//! | [`search`] | Per-image format/quality search, retention policy, SVG minification |
//! | [`process`] | Runs the search over a whole session, progress events, input intake from disk |
//! | [`cache`] | SHA-256 result keys so unchanged entries are not re-encoded |
//! | [`export`] | Downloads, zip archive, diff overlay files |
//! | [`naming`] | Output file names and collision suffixes |
//! | [`imaging`] | Codec backend trait, pure-Rust backend, formats, diff overlay |
//! | [`config`] | `squeeze.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting and the JSON report |
//!
//! # Design Decisions
//!
//! ## Smallest Wins, Original Kept
//!
//! Every candidate format is encoded and the smallest byte count wins, ties
//! going to the earlier format in the preference table. If that winner is
//! still not smaller than the source and is the same format, the source is
//! returned untouched: re-encoding would only add generation loss.
//!
//! ## Pinned Means Pinned
//!
//! A user-chosen output format is never substituted. If the runtime cannot
//! encode it, the file fails with a clear error instead of silently coming
//! back as something else.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, `rav1e` for AVIF encoding and
//! `rav1d` for AVIF decoding. No system libraries, no external processes:
//! the binary is fully self-contained.

pub mod cache;
pub mod config;
pub mod export;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod search;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
