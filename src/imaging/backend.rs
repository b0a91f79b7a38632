//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the pixel-surface seam of the crate: it
//! decodes source bytes into a surface, reports which encoders the runtime
//! has, encodes a surface into a target format, and renders the diff
//! overlay used for visual QA.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust, everything
//! statically linked. Tests drive the search engine through the scripted
//! `MockBackend` in this module's test submodule.

use super::diff::{DiffStyle, diff_overlay};
use super::format::OutputFormat;
use super::params::Quality;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    DecodeFailed(String),
    #[error("{0} encoding is not supported by this runtime")]
    Unsupported(OutputFormat),
    #[error("{format} encode failed: {reason}")]
    EncodeFailed {
        format: OutputFormat,
        reason: String,
    },
}

/// Whether an encoder takes a quality parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Lossy,
    Lossless,
}

impl EncoderKind {
    pub fn takes_quality(self) -> bool {
        self == EncoderKind::Lossy
    }
}

/// Trait for image codec backends.
///
/// `encode` receives `Some(quality)` only for [`EncoderKind::Lossy`]
/// encoders; lossless encoders are always called with `None`.
pub trait ImageBackend {
    /// Decode raw file bytes into a pixel surface at native dimensions.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// The encoder available for `format`, or `None` if this runtime lacks one.
    fn encoder(&self, format: OutputFormat) -> Option<EncoderKind>;

    /// Encode a surface into `format`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError>;

    /// Render a sparse overlay highlighting pixels that differ noticeably.
    fn diff(
        &self,
        original: &DynamicImage,
        candidate: &DynamicImage,
        style: &DiffStyle,
    ) -> RgbaImage {
        diff_overlay(original, candidate, style)
    }
}
