//! Session-scoped result cache.
//!
//! Re-running a batch is common: the user tweaks one setting, adds a file,
//! and hits optimize again. Encoding (AVIF in particular) dominates the run
//! time, so each stored result remembers the key it was produced under and
//! [`process_batch`](crate::process::process_batch) skips entries whose key
//! is unchanged.
//!
//! ## Cache keys
//!
//! A key is the SHA-256 of:
//!
//! - the source bytes (content, not name, so a rename alone never re-encodes)
//! - the [`CompressionSettings`] (format, quality ceiling, smart optimize)
//! - the [`SearchTuning`] step-down schedule
//!
//! The diff style is absent from the key: it never changes the encoded bytes.
//! A reused result whose overlay was drawn in another style gets the overlay
//! redrawn instead. Nothing is written to disk; the cache lives and dies with
//! the [`BatchSession`](crate::session::BatchSession).

use crate::imaging::SearchTuning;
use crate::search::CompressionSettings;
use crate::session::SourceImage;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 of a byte buffer, as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of everything that influences which encoding wins.
pub fn hash_settings(settings: &CompressionSettings, tuning: &SearchTuning) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"settings\0");
    hasher.update(settings.format.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(settings.quality.value().to_le_bytes());
    hasher.update([u8::from(settings.smart_optimize)]);
    hasher.update(tuning.max_attempts.to_le_bytes());
    hasher.update(tuning.step_fraction.to_le_bytes());
    hasher.update(tuning.min_step.to_le_bytes());
    hasher.update(tuning.quality_floor.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Key a result is stored under: `"{source_hash}:{settings_hash}"`.
pub fn result_key(
    source: &SourceImage,
    settings: &CompressionSettings,
    tuning: &SearchTuning,
) -> String {
    format!(
        "{}:{}",
        hash_bytes(source.bytes()),
        hash_settings(settings, tuning)
    )
}

/// Summary of cache behaviour for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} encoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.misses)
        }
    }
}
