//! Shared test utilities for the pixel-squeeze test suite.
//!
//! Fixture builders for in-memory files, sessions, and real encoded images.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut session = session_with(vec![
//!     incoming("a.png", "image/png", 1000),
//!     incoming("logo.svg", "image/svg+xml", 200),
//! ]);
//! let photo = source("b.jpg", "image/jpeg", 4096);
//! ```
//!
//! Generated byte buffers are filled with `1`, which the mock backend decodes
//! as a solid surface distinct from anything it encodes.

use crate::session::{BatchSession, IncomingFile, SourceImage};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage};

// =========================================================================
// In-memory files
// =========================================================================

/// An incoming file of `size` filler bytes.
pub fn incoming(name: &str, mime_type: &str, size: usize) -> IncomingFile {
    IncomingFile::new(name, mime_type, vec![1; size])
}

/// A source image of `size` filler bytes.
pub fn source(name: &str, mime_type: &str, size: usize) -> SourceImage {
    incoming(name, mime_type, size).into()
}

/// A source image with explicit content.
pub fn source_with_bytes(name: &str, mime_type: &str, bytes: Vec<u8>) -> SourceImage {
    IncomingFile::new(name, mime_type, bytes).into()
}

/// A default-limits session holding `files`. Panics if any is rejected.
pub fn session_with(files: Vec<IncomingFile>) -> BatchSession {
    let mut session = BatchSession::default();
    let report = session.add(files);
    assert!(
        report.rejected.is_empty(),
        "fixture files rejected: {:?}",
        report.rejected
    );
    session
}

// =========================================================================
// Real images
// =========================================================================

/// A PNG-encoded gradient, for tests that go through the real backend.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 4 % 256) as u8, (y * 4 % 256) as u8, 96])
    });
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            img.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    buf
}
