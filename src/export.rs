//! Packaging results for the user: single downloads and the bulk archive.
//!
//! Every entry that holds a result contributes exactly one file, named by
//! its session-unique `file_name`. Entries without a result (failed or not
//! yet processed) are skipped.
//!
//! ```text
//! optimized-images.zip
//! ├── photo_optimized.avif
//! ├── photo_optimized-2.avif     # name collision resolved at processing time
//! ├── logo.min.svg
//! └── shot.jpg                   # retained original, unchanged name
//! ```

use crate::naming::{diff_name, name_key, unique_name};
use crate::session::{BatchSession, Entry};
use log::debug;
use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Default file name for the bulk archive.
pub const ARCHIVE_NAME: &str = "optimized-images.zip";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("No optimized images to export")]
    NothingToExport,
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),
}

/// A ready-to-save file, borrowed from its session entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Download<'a> {
    pub file_name: &'a str,
    pub mime_type: &'a str,
    pub bytes: &'a [u8],
}

/// What [`write_archive`] put into the zip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub file_names: Vec<String>,
    /// Sum of the uncompressed entry sizes.
    pub total_bytes: u64,
}

/// The download for one entry, if it has a result.
pub fn download(entry: &Entry) -> Option<Download<'_>> {
    entry.result().map(|result| Download {
        file_name: &result.file_name,
        mime_type: &result.mime_type,
        bytes: &result.bytes,
    })
}

/// Downloads for every entry holding a result, in session order.
pub fn downloads(session: &BatchSession) -> impl Iterator<Item = Download<'_>> {
    session.entries().iter().filter_map(download)
}

/// Write one zip entry per result into `writer`.
///
/// Fails with [`ExportError::NothingToExport`] when no entry has a result.
pub fn write_archive<W: Write + Seek>(
    session: &BatchSession,
    writer: W,
) -> Result<ArchiveSummary, ExportError> {
    let mut zip = ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut seen = HashSet::new();
    let mut summary = ArchiveSummary {
        file_names: Vec::new(),
        total_bytes: 0,
    };
    for file in downloads(session) {
        if !seen.insert(name_key(file.file_name)) {
            return Err(ExportError::DuplicateEntry(file.file_name.to_string()));
        }
        zip.start_file(file.file_name, options)?;
        zip.write_all(file.bytes)?;
        debug!("archived {} ({} bytes)", file.file_name, file.bytes.len());
        summary.file_names.push(file.file_name.to_string());
        summary.total_bytes += file.bytes.len() as u64;
    }
    if summary.file_names.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    zip.finish()?;
    Ok(summary)
}

/// Write the archive to a file on disk.
pub fn save_archive(session: &BatchSession, path: &Path) -> Result<ArchiveSummary, ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_archive(session, file)
}

/// Write every download into `dir`. Returns the written paths.
pub fn save_downloads(session: &BatchSession, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    downloads(session)
        .map(|file| -> Result<PathBuf, ExportError> {
            let path = dir.join(file.file_name);
            std::fs::write(&path, file.bytes)?;
            Ok(path)
        })
        .collect()
}

/// Write each diff overlay as `<stem>_diff.png` into `dir`.
pub fn save_diffs(session: &BatchSession, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut taken: HashSet<String> = downloads(session).map(|d| name_key(d.file_name)).collect();
    let mut written = Vec::new();
    for (entry, result) in session.completed() {
        let Some(overlay) = &result.diff_overlay else {
            continue;
        };
        let name = unique_name(&diff_name(entry.source.name()), &taken);
        taken.insert(name_key(&name));
        let path = dir.join(&name);
        overlay.save_with_format(&path, image::ImageFormat::Png)?;
        written.push(path);
    }
    Ok(written)
}
