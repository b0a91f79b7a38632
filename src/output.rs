//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every image is shown by its positional index and source name first; what
//! happened to it (result name, format, size change, advisory notes) follows
//! as indented context lines. This keeps the output readable as a batch
//! inventory while still tracing each result back to its source.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! [1/3] photo.png
//!     → photo_optimized.avif (AVIF q80)
//!     2.0 MB → 900.0 KB (-56.1%)
//! [2/3] shot.jpg
//!     → shot.jpg (Original)
//!     Note: Kept original: no candidate format was smaller than the source
//! [3/3] broken.png
//!     Failed: could not decode source: ...
//! ```
//!
//! ## Results
//!
//! ```text
//! 001 photo.png → photo_optimized.avif
//!     AVIF q80, 2.0 MB → 900.0 KB (-56.1%)
//! 002 broken.png
//!     Failed: could not decode source: ...
//!
//! Saved 1.1 MB across 1 image
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::export::ArchiveSummary;
use crate::imaging::{ImageBackend, OutputFormat};
use crate::process::{BatchSummary, Notifier, ProcessEvent};
use crate::search::{CompressionResult, ResultFormat};
use crate::session::{BatchSession, IntakeReport};
use serde::Serialize;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Human-readable byte count, binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `2.0 MB → 900.0 KB (-56.1%)`; a grown file shows `+`.
pub fn format_size_change(original: u64, size: u64) -> String {
    let percent = if original == 0 {
        0.0
    } else {
        (size as f64 - original as f64) / original as f64 * 100.0
    };
    format!(
        "{} \u{2192} {} ({:+.1}%)",
        format_bytes(original),
        format_bytes(size),
        percent
    )
}

/// `AVIF q80`, `PNG`, `Original`.
fn format_label(format: ResultFormat, quality: Option<u32>) -> String {
    match quality {
        Some(q) => format!("{} q{}", format.label(), q),
        None => format.label().to_string(),
    }
}

fn result_detail(result: &CompressionResult) -> String {
    format!(
        "{}, {}",
        format_label(result.format, result.quality.map(|q| q.value())),
        format_size_change(result.original_size, result.size())
    )
}

// ============================================================================
// Intake
// ============================================================================

/// One line per rejected file; nothing when all were accepted.
pub fn format_intake_report(report: &IntakeReport) -> Vec<String> {
    report
        .rejected
        .iter()
        .map(|e| format!("Skipped {}", e))
        .collect()
}

// ============================================================================
// Process
// ============================================================================

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { index, total, name } => {
            vec![format!("[{}/{}] {}", index, total, name)]
        }
        ProcessEvent::Optimized {
            file_name,
            format,
            quality,
            original_size,
            size,
            advisory,
            ..
        } => {
            let mut lines = vec![
                format!(
                    "    \u{2192} {} ({})",
                    file_name,
                    format_label(*format, *quality)
                ),
                format!("    {}", format_size_change(*original_size, *size)),
            ];
            if let Some(note) = advisory {
                lines.push(format!("    Note: {}", note));
            }
            lines
        }
        ProcessEvent::Cached {
            index,
            name,
            file_name,
        } => vec![format!(
            "[{}] {} \u{2192} {} (cached)",
            index, name, file_name
        )],
        ProcessEvent::Failed { error, .. } => vec![format!("    Failed: {}", error)],
    }
}

// ============================================================================
// Results
// ============================================================================

/// Per-entry results plus the savings total.
pub fn format_results(session: &BatchSession, summary: &BatchSummary) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in session.entries().iter().enumerate() {
        let index = format_index(i + 1);
        match (entry.result(), entry.error()) {
            (Some(result), _) => {
                lines.push(format!(
                    "{} {} \u{2192} {}",
                    index,
                    entry.source.name(),
                    result.file_name
                ));
                lines.push(format!("    {}", result_detail(result)));
                if let Some(note) = &result.advisory {
                    lines.push(format!("    Note: {}", note));
                }
            }
            (None, Some(error)) => {
                lines.push(format!("{} {}", index, entry.source.name()));
                lines.push(format!("    Failed: {}", error));
            }
            (None, None) => {
                lines.push(format!("{} {} (not processed)", index, entry.source.name()));
            }
        }
    }

    let done = summary.processed + summary.cached;
    lines.push(String::new());
    let verb = if summary.bytes_saved >= 0 { "Saved" } else { "Grew by" };
    lines.push(format!(
        "{} {} across {} image{}",
        verb,
        format_bytes(summary.bytes_saved.unsigned_abs()),
        done,
        if done == 1 { "" } else { "s" }
    ));
    lines
}

/// Print results to stdout.
pub fn print_results(session: &BatchSession, summary: &BatchSummary) {
    for line in format_results(session, summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

pub fn format_archive_summary(summary: &ArchiveSummary, path: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "Archive {} ({} files, {})",
        path.display(),
        summary.file_names.len(),
        format_bytes(summary.total_bytes)
    )];
    lines.extend(summary.file_names.iter().map(|n| format!("    {}", n)));
    lines
}

pub fn print_archive_summary(summary: &ArchiveSummary, path: &Path) {
    for line in format_archive_summary(summary, path) {
        println!("{}", line);
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Which encoders this runtime provides, in search preference order.
pub fn format_formats(backend: &impl ImageBackend) -> Vec<String> {
    OutputFormat::ALL
        .iter()
        .map(|&format| {
            let kind = match backend.encoder(format) {
                Some(kind) if kind.takes_quality() => "lossy, quality search",
                Some(_) => "lossless",
                None => "unavailable",
            };
            format!("{:<5} .{:<5} {}", format.label(), format.extension(), kind)
        })
        .chain(std::iter::once(format!(
            "{:<5} .{:<5} {}",
            "SVG", "svg", "minify only, SVG sources"
        )))
        .collect()
}

pub fn print_formats(backend: &impl ImageBackend) {
    for line in format_formats(backend) {
        println!("{}", line);
    }
}

// ============================================================================
// JSON report
// ============================================================================

/// Machine-readable record of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub summary: BatchSummary,
    pub entries: Vec<EntryReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct EntryReport<'a> {
    pub source: &'a str,
    pub original_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ResultReport<'a> {
    pub file_name: &'a str,
    pub format: ResultFormat,
    pub mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
    pub size: u64,
    pub byte_size_delta: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<&'a str>,
}

pub fn batch_report<'a>(session: &'a BatchSession, summary: &BatchSummary) -> BatchReport<'a> {
    BatchReport {
        summary: *summary,
        entries: session
            .entries()
            .iter()
            .map(|entry| EntryReport {
                source: entry.source.name(),
                original_size: entry.source.size(),
                result: entry.result().map(|r| ResultReport {
                    file_name: &r.file_name,
                    format: r.format,
                    mime_type: &r.mime_type,
                    quality: r.quality.map(|q| q.value()),
                    size: r.size(),
                    byte_size_delta: r.byte_size_delta,
                    advisory: r.advisory.as_deref(),
                }),
                error: entry.error(),
            })
            .collect(),
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notifier for the terminal: notices to stdout, errors to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, is_error: bool) {
        if is_error {
            eprintln!("error: {}", message);
        } else {
            println!("==> {}", message);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
