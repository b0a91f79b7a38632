//! Batch processing: run the search engine over every entry in a session.
//!
//! ## Flow
//!
//! ```text
//! for each entry, in session order (one decoded surface alive at a time):
//!   key = sha256(source bytes, settings, tuning)
//!   key matches stored result? ──► Cached, overlay redrawn if the diff style changed
//!   search::optimize ──► Ok:  name made unique within the session, stored
//!                    └─► Err: message stored on the entry, batch continues
//! ```
//!
//! Progress is reported as [`ProcessEvent`]s over an optional mpsc channel,
//! so a host can render it on its own thread while the batch runs.
//! End-of-batch notices go through a [`Notifier`].

use crate::cache::{self, CacheStats};
use crate::imaging::ImageBackend;
use crate::naming::{name_key, unique_name};
use crate::search::{self, CompressionSettings, ResultFormat, SearchOptions};
use crate::session::{BatchSession, IncomingFile, IntakeReport};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),
}

/// Progress of a batch run, one event per state change of an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Started {
        index: usize,
        total: usize,
        name: String,
    },
    Optimized {
        index: usize,
        name: String,
        file_name: String,
        format: ResultFormat,
        quality: Option<u32>,
        original_size: u64,
        size: u64,
        advisory: Option<String>,
    },
    Cached {
        index: usize,
        name: String,
        file_name: String,
    },
    Failed {
        index: usize,
        name: String,
        error: String,
    },
}

/// Host-side sink for user-facing notices.
pub trait Notifier {
    fn notify(&self, message: &str, is_error: bool);
}

/// Totals for one [`process_batch`] run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Entries encoded during this run.
    pub processed: usize,
    /// Entries whose stored result was reused.
    pub cached: usize,
    pub failed: usize,
    /// Sum of `byte_size_delta` over every entry holding a result.
    pub bytes_saved: i64,
}

impl BatchSummary {
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.cached as u32,
            misses: self.processed as u32,
        }
    }
}

/// Result names of every entry except `index`, as [`name_key`]s.
fn names_taken_by_others(session: &BatchSession, index: usize) -> HashSet<String> {
    session
        .entries()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .filter_map(|(_, e)| e.result())
        .map(|r| name_key(&r.file_name))
        .collect()
}

/// Optimize every entry in the session, sequentially.
///
/// Per-file failures never abort the batch: the entry records the error
/// message and keeps no result.
pub fn process_batch(
    session: &mut BatchSession,
    backend: &impl ImageBackend,
    settings: &CompressionSettings,
    options: &SearchOptions,
    progress: Option<Sender<ProcessEvent>>,
) -> BatchSummary {
    let total = session.len();
    let mut summary = BatchSummary::default();
    let send = |event: ProcessEvent| {
        if let Some(tx) = &progress {
            tx.send(event).ok();
        }
    };

    for index in 0..total {
        let entry = &session.entries()[index];
        let name = entry.source.name().to_string();
        let key = cache::result_key(&entry.source, settings, &options.tuning);

        if entry.result_key() == Some(key.as_str())
            && let Some(result) = entry.result()
        {
            debug!("{name}: settings unchanged, reusing result");
            let file_name = result.file_name.clone();
            if entry.diff_style() != Some(&options.diff) {
                debug!("{name}: diff style changed, redrawing overlay");
                let overlay = search::redraw_diff(backend, &entry.source, result, &options.diff);
                session.entries_mut()[index].set_diff_overlay(overlay, options.diff);
            }
            summary.cached += 1;
            send(ProcessEvent::Cached {
                index: index + 1,
                name,
                file_name,
            });
            continue;
        }

        send(ProcessEvent::Started {
            index: index + 1,
            total,
            name: name.clone(),
        });

        match search::optimize(backend, &entry.source, settings, options) {
            Ok(mut result) => {
                let taken = names_taken_by_others(session, index);
                result.file_name = unique_name(&result.file_name, &taken);
                summary.processed += 1;
                send(ProcessEvent::Optimized {
                    index: index + 1,
                    name,
                    file_name: result.file_name.clone(),
                    format: result.format,
                    quality: result.quality.map(|q| q.value()),
                    original_size: result.original_size,
                    size: result.size(),
                    advisory: result.advisory.clone(),
                });
                session.entries_mut()[index].set_result(result, key, options.diff);
            }
            Err(e) => {
                info!("{name}: {e}");
                summary.failed += 1;
                let error = e.to_string();
                send(ProcessEvent::Failed {
                    index: index + 1,
                    name,
                    error: error.clone(),
                });
                session.entries_mut()[index].set_error(error);
            }
        }
    }

    summary.bytes_saved = session
        .completed()
        .map(|(_, result)| result.byte_size_delta)
        .sum();
    summary
}

/// Report the outcome of a batch through the host's notifier.
pub fn announce_summary(summary: &BatchSummary, notifier: &dyn Notifier) {
    let done = summary.processed + summary.cached;
    if done > 0 {
        notifier.notify(
            &format!(
                "Optimized {} image{}: {}",
                done,
                if done == 1 { "" } else { "s" },
                summary.cache_stats()
            ),
            false,
        );
    }
    if summary.failed > 0 {
        notifier.notify(
            &format!(
                "{} image{} could not be optimized",
                summary.failed,
                if summary.failed == 1 { "" } else { "s" }
            ),
            true,
        );
    }
}

/// MIME type guessed from a file extension.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if ext.eq_ignore_ascii_case("svg") {
        return "image/svg+xml";
    }
    image::ImageFormat::from_extension(ext)
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Add input files to the session, expanding directories recursively in
/// name order.
///
/// Each file is checked against the intake rules from its name, guessed
/// type and on-disk size first. Only files that pass are read, so oversized
/// or non-image files never reach memory.
pub fn add_inputs(
    session: &mut BatchSession,
    paths: &[PathBuf],
) -> Result<IntakeReport, ProcessError> {
    let mut report = IntakeReport::default();
    for path in paths {
        if !path.exists() {
            return Err(ProcessError::InputNotFound(path.clone()));
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let mime_type = guess_mime_type(entry.path());
            if let Err(e) = session.check(&name, mime_type, entry.metadata()?.len()) {
                debug!("{}: not read, {e}", entry.path().display());
                report.rejected.push(e);
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            let added = session.add([IncomingFile::new(name, mime_type, bytes)]);
            report.accepted.extend(added.accepted);
            report.rejected.extend(added.rejected);
        }
    }
    Ok(report)
}
