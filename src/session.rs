//! Batch session and input intake.
//!
//! A [`BatchSession`] is the ordered set of source images currently loaded,
//! each paired with its latest [`CompressionResult`] (or the error that
//! prevented one). The session owns every byte buffer: removing an entry
//! drops its source and result together, and dropping the session releases
//! everything.
//!
//! ## Intake rules
//!
//! [`BatchSession::add`] checks each incoming file, in order, against:
//!
//! | Rule | Error |
//! |---|---|
//! | name is a plain file name (no path separators, not `.`/`..`) | [`IntakeError::InvalidName`] |
//! | MIME type is `image/*`, or the name ends in `.svg` | [`IntakeError::UnsupportedType`] |
//! | no entry with the same name | [`IntakeError::DuplicateName`] |
//! | size ≤ `max_file_bytes` (100 MiB) | [`IntakeError::FileTooLarge`] |
//! | aggregate ≤ `max_total_bytes` (1 GiB) | [`IntakeError::BatchTooLarge`] |
//! | count ≤ `max_files` (20) | [`IntakeError::TooManyFiles`] |
//!
//! A rejected file leaves the session untouched. Accepted files are appended
//! in arrival order. [`BatchSession::check`] applies the same rules to a
//! name, type and size alone, so hosts can vet a file before reading it.

use crate::imaging::DiffStyle;
use crate::search::CompressionResult;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIB: u64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    #[error("{0:?}: not a plain file name")]
    InvalidName(String),
    #[error("{name}: not an image (type '{mime_type}')")]
    UnsupportedType { name: String, mime_type: String },
    #[error("{0}: a file with this name is already in the batch")]
    DuplicateName(String),
    #[error("{name}: {size} bytes exceeds the per-file limit of {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("{name}: batch would grow to {total} bytes, over the {limit} byte limit")]
    BatchTooLarge { name: String, total: u64, limit: u64 },
    #[error("{name}: batch is limited to {limit} files")]
    TooManyFiles { name: String, limit: usize },
}

/// Batch bounds enforced at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub max_files: usize,
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_file_bytes: 100 * MIB,
            max_total_bytes: 1024 * MIB,
        }
    }
}

/// A file offered to the session by the host.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// An accepted source image. Immutable once in the session.
#[derive(Debug)]
pub struct SourceImage {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl SourceImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension of the source name without the dot, as written.
    pub fn extension(&self) -> &str {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }
}

impl From<IncomingFile> for SourceImage {
    fn from(file: IncomingFile) -> Self {
        Self {
            name: file.name,
            mime_type: file.mime_type,
            bytes: file.bytes,
        }
    }
}

/// One source image and what processing made of it.
#[derive(Debug)]
pub struct Entry {
    pub source: SourceImage,
    result: Option<CompressionResult>,
    error: Option<String>,
    /// Settings fingerprint the current result was produced under.
    result_key: Option<String>,
    /// Style the current result's diff overlay was rendered with.
    diff_style: Option<DiffStyle>,
}

impl Entry {
    fn new(source: SourceImage) -> Self {
        Self {
            source,
            result: None,
            error: None,
            result_key: None,
            diff_style: None,
        }
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn result_key(&self) -> Option<&str> {
        self.result.as_ref().and(self.result_key.as_deref())
    }

    pub(crate) fn diff_style(&self) -> Option<&DiffStyle> {
        self.result.as_ref().and(self.diff_style.as_ref())
    }

    /// Replace any previous outcome with a fresh result.
    pub(crate) fn set_result(&mut self, result: CompressionResult, key: String, style: DiffStyle) {
        self.result = Some(result);
        self.result_key = Some(key);
        self.diff_style = Some(style);
        self.error = None;
    }

    /// Swap the current result's overlay for one rendered with `style`.
    pub(crate) fn set_diff_overlay(&mut self, overlay: Option<RgbaImage>, style: DiffStyle) {
        if let Some(result) = &mut self.result {
            result.diff_overlay = overlay;
            self.diff_style = Some(style);
        }
    }

    /// Record a failure. The entry is left without a result.
    pub(crate) fn set_error(&mut self, message: String) {
        self.result = None;
        self.result_key = None;
        self.diff_style = None;
        self.error = Some(message);
    }
}

/// Outcome of one [`BatchSession::add`] call.
#[derive(Debug, Default)]
pub struct IntakeReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<IntakeError>,
}

/// The ordered collection of images loaded for processing.
#[derive(Debug, Default)]
pub struct BatchSession {
    limits: Limits,
    entries: Vec<Entry>,
}

fn is_acceptable_type(name: &str, mime_type: &str) -> bool {
    mime_type.to_ascii_lowercase().starts_with("image/")
        || std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// Names end up as output paths and archive entries.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

impl BatchSession {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            entries: Vec::new(),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all source sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.source.size()).sum()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.source.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Check a single file against the intake rules without adding it.
    pub fn validate(&self, file: &IncomingFile) -> Result<(), IntakeError> {
        self.check(&file.name, &file.mime_type, file.bytes.len() as u64)
    }

    /// The intake rules, applied to a file's name, type and size.
    pub fn check(&self, name: &str, mime_type: &str, size: u64) -> Result<(), IntakeError> {
        if !is_plain_file_name(name) {
            return Err(IntakeError::InvalidName(name.to_string()));
        }
        if !is_acceptable_type(name, mime_type) {
            return Err(IntakeError::UnsupportedType {
                name: name.to_string(),
                mime_type: mime_type.to_string(),
            });
        }
        if self.contains(name) {
            return Err(IntakeError::DuplicateName(name.to_string()));
        }
        if size > self.limits.max_file_bytes {
            return Err(IntakeError::FileTooLarge {
                name: name.to_string(),
                size,
                limit: self.limits.max_file_bytes,
            });
        }
        let total = self.total_bytes() + size;
        if total > self.limits.max_total_bytes {
            return Err(IntakeError::BatchTooLarge {
                name: name.to_string(),
                total,
                limit: self.limits.max_total_bytes,
            });
        }
        if self.entries.len() + 1 > self.limits.max_files {
            return Err(IntakeError::TooManyFiles {
                name: name.to_string(),
                limit: self.limits.max_files,
            });
        }
        Ok(())
    }

    /// Add files in order, rejecting any that break an intake rule.
    pub fn add(&mut self, files: impl IntoIterator<Item = IncomingFile>) -> IntakeReport {
        let mut report = IntakeReport::default();
        for file in files {
            match self.validate(&file) {
                Ok(()) => {
                    report.accepted.push(file.name.clone());
                    self.entries.push(Entry::new(file.into()));
                }
                Err(e) => report.rejected.push(e),
            }
        }
        report
    }

    /// Remove an entry and everything it owns. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.source.name() != name);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries that currently hold a result, in session order.
    pub fn completed(&self) -> impl Iterator<Item = (&Entry, &CompressionResult)> {
        self.entries
            .iter()
            .filter_map(|e| e.result().map(|r| (e, r)))
    }
}
