//! Format and quality search for a single source image.
//!
//! [`optimize`] turns one [`SourceImage`] into exactly one
//! [`CompressionResult`], or an [`OptimizeError`] scoped to that file.
//!
//! ## Algorithm
//!
//! ```text
//! SVG source ──► minify markup ──► result (always SVG)
//!
//! raster source
//!   │ decode at native size
//!   ▼
//! candidate formats ── pinned: [fmt]   auto: preference table for the source extension
//!   │
//!   ▼ for each format
//! encode at ceiling quality (lossless: no quality)
//!   │ smart optimize && not smaller than source?
//!   ▼
//! retry at lower quality (bounded step-down), keep the smallest
//!   │
//!   ▼
//! smallest candidate across formats ──► retention policy ──► diff overlay
//! ```
//!
//! ## Retention policy
//!
//! In auto mode, if even the best candidate is not smaller than the source
//! *and* has the source's (normalized) extension, re-encoding buys nothing:
//! the original bytes are kept, reported as format `Original` with a zero
//! delta. A pinned format is always honoured, even when it grows the file.
//!
//! ## Failure containment
//!
//! In auto mode a format whose encoder is missing or fails is skipped. A
//! pinned format that cannot be encoded fails the whole file; nothing is
//! ever silently substituted.

use crate::imaging::{
    BackendError, DiffStyle, ImageBackend, OutputFormat, Quality, RequestedFormat, SearchTuning,
    candidates_for_extension, is_svg, minify_svg, normalize_extension,
};
use crate::naming::{minified_svg_name, optimized_name};
use crate::session::SourceImage;
use image::{DynamicImage, RgbaImage};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest quality ceiling a user may select.
pub const MIN_QUALITY_CEILING: u32 = 10;

const SVG_MIME: &str = "image/svg+xml";

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("SVG sources can only be minified; {0} output was requested")]
    SvgRasterRequested(OutputFormat),
    #[error("SVG output was requested for a raster source")]
    SvgRequestedForRaster,
    #[error("SVG is not valid UTF-8: {0}")]
    InvalidSvg(#[from] std::str::Utf8Error),
    #[error("could not decode source: {0}")]
    Decode(#[source] BackendError),
    #[error("{0} encoding is not available in this runtime")]
    EncoderUnavailable(OutputFormat),
    #[error("{0}")]
    EncodeFailed(#[source] BackendError),
    #[error("no candidate format could be encoded")]
    NoValidCandidate,
}

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionSettings {
    pub format: RequestedFormat,
    /// Ceiling for lossy encoders, 10–100.
    pub quality: Quality,
    pub smart_optimize: bool,
}

impl CompressionSettings {
    /// Build settings, clamping the quality ceiling into 10–100.
    pub fn new(format: RequestedFormat, quality: u32, smart_optimize: bool) -> Self {
        Self {
            format,
            quality: Quality::new(quality.max(MIN_QUALITY_CEILING)),
            smart_optimize,
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self::new(RequestedFormat::Auto, Quality::default().value(), true)
    }
}

/// Engine tuning that is not a per-run user choice.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchOptions {
    pub tuning: SearchTuning,
    pub diff: DiffStyle,
}

/// One attempted encoding.
#[derive(Debug, Clone)]
pub struct EncodingCandidate {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    /// Present only for lossy encodings.
    pub quality: Option<Quality>,
}

impl EncodingCandidate {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// The format a result ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "format", rename_all = "lowercase")]
pub enum ResultFormat {
    Encoded(OutputFormat),
    Svg,
    Original,
}

impl ResultFormat {
    pub fn label(self) -> &'static str {
        match self {
            ResultFormat::Encoded(format) => format.label(),
            ResultFormat::Svg => "SVG",
            ResultFormat::Original => "Original",
        }
    }
}

/// The outcome kept for one source image.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// Download / archive entry name, unique within the session.
    pub file_name: String,
    pub format: ResultFormat,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub quality: Option<Quality>,
    pub original_size: u64,
    /// `original_size - size()`; negative when the file grew.
    pub byte_size_delta: i64,
    pub diff_overlay: Option<RgbaImage>,
    pub advisory: Option<String>,
}

impl CompressionResult {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_retained(&self) -> bool {
        self.format == ResultFormat::Original
    }

    /// Saved bytes as a percentage of the original (negative if larger).
    pub fn saved_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        self.byte_size_delta as f64 / self.original_size as f64 * 100.0
    }
}

fn size_delta(original: u64, result: u64) -> i64 {
    original as i64 - result as i64
}

/// Extension used to pick candidates: from the name, else the MIME subtype.
fn source_extension(source: &SourceImage) -> String {
    let ext = source.extension();
    if !ext.is_empty() {
        return normalize_extension(ext);
    }
    source
        .mime_type()
        .split_once('/')
        .map(|(_, subtype)| normalize_extension(subtype))
        .unwrap_or_default()
}

/// Search for the smallest acceptable encoding of `source`.
pub fn optimize(
    backend: &impl ImageBackend,
    source: &SourceImage,
    settings: &CompressionSettings,
    options: &SearchOptions,
) -> Result<CompressionResult, OptimizeError> {
    if is_svg(source.name(), source.mime_type()) {
        return optimize_svg(source, settings);
    }

    let formats = candidate_formats(backend, source, settings.format)?;
    let surface = backend.decode(source.bytes()).map_err(OptimizeError::Decode)?;
    let original_size = source.size();

    let mut best: Option<EncodingCandidate> = None;
    for format in formats {
        match search_format(backend, &surface, format, original_size, settings, &options.tuning) {
            Ok(candidate) => {
                if best.as_ref().is_none_or(|b| candidate.size() < b.size()) {
                    best = Some(candidate);
                }
            }
            Err(e) if settings.format.is_pinned() => return Err(OptimizeError::EncodeFailed(e)),
            Err(e) => warn!("{}: skipping {format}: {e}", source.name()),
        }
    }
    let winner = best.ok_or(OptimizeError::NoValidCandidate)?;

    let matches_source = normalize_extension(winner.format.extension()) == source_extension(source);
    if !settings.format.is_pinned() && winner.size() >= original_size && matches_source {
        info!(
            "{}: kept original, best candidate {} was {} bytes",
            source.name(),
            winner.format,
            winner.size()
        );
        return Ok(CompressionResult {
            file_name: source.name().to_string(),
            format: ResultFormat::Original,
            mime_type: source.mime_type().to_string(),
            bytes: source.bytes().to_vec(),
            quality: None,
            original_size,
            byte_size_delta: 0,
            diff_overlay: None,
            advisory: Some(format!(
                "Kept original: no candidate format was smaller than the source ({} was closest at {} bytes)",
                winner.format,
                winner.size()
            )),
        });
    }

    let advisory = (winner.size() >= original_size).then(|| {
        format!(
            "{} output is not smaller than the original ({} vs {} bytes)",
            winner.format,
            winner.size(),
            original_size
        )
    });
    let diff_overlay = render_diff(
        backend,
        &surface,
        &winner.bytes,
        winner.format,
        &options.diff,
        source.name(),
    );
    info!(
        "{}: {} at {} bytes (was {})",
        source.name(),
        winner.format,
        winner.size(),
        original_size
    );

    Ok(CompressionResult {
        file_name: optimized_name(source.name(), winner.format.extension()),
        format: ResultFormat::Encoded(winner.format),
        mime_type: winner.format.mime_type().to_string(),
        byte_size_delta: size_delta(original_size, winner.size()),
        quality: winner.quality,
        bytes: winner.bytes,
        original_size,
        diff_overlay,
        advisory,
    })
}

/// Ordered formats to try. A pinned format must have an encoder.
fn candidate_formats(
    backend: &impl ImageBackend,
    source: &SourceImage,
    requested: RequestedFormat,
) -> Result<Vec<OutputFormat>, OptimizeError> {
    match requested {
        RequestedFormat::Svg => Err(OptimizeError::SvgRequestedForRaster),
        RequestedFormat::Pinned(format) => {
            if backend.encoder(format).is_none() {
                return Err(OptimizeError::EncoderUnavailable(format));
            }
            Ok(vec![format])
        }
        RequestedFormat::Auto => Ok(candidates_for_extension(&source_extension(source))
            .into_iter()
            .filter(|format| {
                let available = backend.encoder(*format).is_some();
                if !available {
                    debug!("{}: no {format} encoder, skipping", source.name());
                }
                available
            })
            .collect()),
    }
}

/// Encode one format, stepping quality down while the output isn't smaller.
fn search_format(
    backend: &impl ImageBackend,
    surface: &DynamicImage,
    format: OutputFormat,
    original_size: u64,
    settings: &CompressionSettings,
    tuning: &SearchTuning,
) -> Result<EncodingCandidate, BackendError> {
    let kind = backend
        .encoder(format)
        .ok_or(BackendError::Unsupported(format))?;
    let initial = kind.takes_quality().then_some(settings.quality);
    let mut best = encode_candidate(backend, surface, format, initial)?;

    if settings.smart_optimize
        && let Some(initial) = initial
    {
        let mut current = initial;
        for _ in 0..tuning.max_attempts {
            if best.size() < original_size {
                break;
            }
            let Some(next) = tuning.next_quality(initial, current) else {
                break;
            };
            current = next;
            match encode_candidate(backend, surface, format, Some(next)) {
                Ok(candidate) if candidate.size() < best.size() => best = candidate,
                Ok(_) => {}
                Err(e) => {
                    warn!("{format} retry at quality {} failed: {e}", next.value());
                    break;
                }
            }
        }
    }
    Ok(best)
}

fn encode_candidate(
    backend: &impl ImageBackend,
    surface: &DynamicImage,
    format: OutputFormat,
    quality: Option<Quality>,
) -> Result<EncodingCandidate, BackendError> {
    let bytes = backend.encode(surface, format, quality)?;
    debug!(
        "{format} at quality {}: {} bytes",
        quality.map_or("lossless".to_string(), |q| q.value().to_string()),
        bytes.len()
    );
    Ok(EncodingCandidate {
        format,
        bytes,
        quality,
    })
}

/// Decode an encoding back and diff it against the source surface.
fn render_diff(
    backend: &impl ImageBackend,
    surface: &DynamicImage,
    bytes: &[u8],
    format: OutputFormat,
    style: &DiffStyle,
    name: &str,
) -> Option<RgbaImage> {
    match backend.decode(bytes) {
        Ok(decoded) => Some(backend.diff(surface, &decoded, style)),
        Err(e) => {
            warn!("{name}: no diff overlay, {format} output did not decode: {e}");
            None
        }
    }
}

/// Render a stored result's overlay again under another style.
///
/// `None` for retained originals and SVG output, which never carry one.
pub fn redraw_diff(
    backend: &impl ImageBackend,
    source: &SourceImage,
    result: &CompressionResult,
    style: &DiffStyle,
) -> Option<RgbaImage> {
    let ResultFormat::Encoded(format) = result.format else {
        return None;
    };
    match backend.decode(source.bytes()) {
        Ok(surface) => render_diff(backend, &surface, &result.bytes, format, style, source.name()),
        Err(e) => {
            warn!("{}: no diff overlay, source did not decode: {e}", source.name());
            None
        }
    }
}

fn optimize_svg(
    source: &SourceImage,
    settings: &CompressionSettings,
) -> Result<CompressionResult, OptimizeError> {
    if let RequestedFormat::Pinned(format) = settings.format {
        return Err(OptimizeError::SvgRasterRequested(format));
    }
    let text = std::str::from_utf8(source.bytes())?;
    let minified = minify_svg(text).into_bytes();
    let original_size = source.size();
    let size = minified.len() as u64;

    Ok(CompressionResult {
        file_name: minified_svg_name(source.name()),
        format: ResultFormat::Svg,
        mime_type: SVG_MIME.to_string(),
        quality: None,
        original_size,
        byte_size_delta: size_delta(original_size, size),
        diff_overlay: None,
        advisory: (size >= original_size)
            .then(|| "SVG was already minimal; minification saved nothing".to_string()),
        bytes: minified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::EncoderKind;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::source;

    const KB: usize = 1024;

    fn auto(quality: u32, smart: bool) -> CompressionSettings {
        CompressionSettings::new(RequestedFormat::Auto, quality, smart)
    }

    fn pinned(format: OutputFormat) -> CompressionSettings {
        CompressionSettings::new(RequestedFormat::Pinned(format), 80, true)
    }

    /// A backend with every format, all larger than any test source.
    fn bloated_backend() -> MockBackend {
        MockBackend::new()
            .with_encoder(OutputFormat::Avif, EncoderKind::Lossy, |_| 90 * KB)
            .with_encoder(OutputFormat::Webp, EncoderKind::Lossy, |_| 80 * KB)
            .with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |_| 70 * KB)
            .with_encoder(OutputFormat::Png, EncoderKind::Lossless, |_| 95 * KB)
            .with_encoder(OutputFormat::Bmp, EncoderKind::Lossless, |_| 99 * KB)
    }

    #[test]
    fn png_source_auto_tries_table_order_and_picks_avif() {
        let backend = MockBackend::new()
            .with_encoder(OutputFormat::Avif, EncoderKind::Lossy, |_| 900 * KB)
            .with_encoder(OutputFormat::Webp, EncoderKind::Lossy, |_| 1200 * KB)
            .with_encoder(OutputFormat::Png, EncoderKind::Lossless, |_| 1900 * KB)
            .with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |_| 1000 * KB)
            .with_encoder(OutputFormat::Bmp, EncoderKind::Lossless, |_| 6000 * KB);
        let photo = source("photo.png", "image/png", 2048 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(
            backend.encoded_formats(),
            vec![
                OutputFormat::Avif,
                OutputFormat::Webp,
                OutputFormat::Png,
                OutputFormat::Jpeg,
                OutputFormat::Bmp
            ]
        );
        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Avif));
        assert_eq!(result.format.label(), "AVIF");
        assert_eq!(result.byte_size_delta, (2048 * KB - 900 * KB) as i64);
        assert_eq!(result.quality, Some(Quality::new(80)));
        assert_eq!(backend.encode_calls(OutputFormat::Avif), vec![Some(80)]);
        assert_eq!(result.file_name, "photo_optimized.avif");
        assert_eq!(result.mime_type, "image/avif");
        assert!(result.advisory.is_none());
    }

    #[test]
    fn near_optimal_jpeg_is_retained() {
        let backend = bloated_backend();
        let photo = source("shot.jpg", "image/jpeg", 50 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(result.format, ResultFormat::Original);
        assert_eq!(result.format.label(), "Original");
        assert_eq!(result.byte_size_delta, 0);
        assert_eq!(result.bytes, photo.bytes());
        assert_eq!(result.file_name, "shot.jpg");
        assert!(result.diff_overlay.is_none());
        assert!(result.advisory.unwrap().starts_with("Kept original"));
        // stepped down 80 → 52 → 24 → 15 for every lossy format
        assert_eq!(
            backend.encode_calls(OutputFormat::Jpeg),
            vec![Some(80), Some(52), Some(24), Some(15)]
        );
    }

    #[test]
    fn larger_winner_in_other_format_is_emitted_with_advisory() {
        let backend = bloated_backend();
        let photo = source("shot.png", "image/png", 50 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Jpeg));
        assert_eq!(result.byte_size_delta, (50 * KB) as i64 - (70 * KB) as i64);
        assert!(result.advisory.is_some());
    }

    #[test]
    fn pinned_format_is_honoured_even_when_larger() {
        let backend = bloated_backend();
        let photo = source("shot.jpg", "image/jpeg", 50 * KB);

        let result = optimize(&backend, &photo, &pinned(OutputFormat::Jpeg), &SearchOptions::default()).unwrap();

        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Jpeg));
        assert_eq!(result.byte_size_delta, -(20 * KB as i64));
        assert!(result.advisory.is_some());
        assert_eq!(backend.encoded_formats(), vec![OutputFormat::Jpeg]);
    }

    #[test]
    fn pinned_format_without_encoder_fails_without_substitution() {
        let backend = MockBackend::new().with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |_| 1);
        let photo = source("shot.png", "image/png", 10 * KB);

        let err = optimize(&backend, &photo, &pinned(OutputFormat::Avif), &SearchOptions::default())
            .unwrap_err();

        assert!(matches!(err, OptimizeError::EncoderUnavailable(OutputFormat::Avif)));
        assert!(backend.encoded_formats().is_empty());
    }

    #[test]
    fn pinned_format_encode_failure_is_fatal() {
        let backend = MockBackend::new()
            .with_failing_encoder(OutputFormat::Webp, EncoderKind::Lossy)
            .with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |_| 1);
        let photo = source("shot.png", "image/png", 10 * KB);

        let err = optimize(&backend, &photo, &pinned(OutputFormat::Webp), &SearchOptions::default())
            .unwrap_err();

        assert!(matches!(err, OptimizeError::EncodeFailed(_)));
        assert_eq!(backend.encoded_formats(), vec![OutputFormat::Webp]);
    }

    #[test]
    fn auto_skips_missing_and_failing_encoders() {
        let backend = MockBackend::new()
            .with_failing_encoder(OutputFormat::Avif, EncoderKind::Lossy)
            .with_encoder(OutputFormat::Png, EncoderKind::Lossless, |_| 3 * KB);
        let photo = source("shot.png", "image/png", 10 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Png));
        assert_eq!(result.quality, None);
        assert_eq!(
            backend.encoded_formats(),
            vec![OutputFormat::Avif, OutputFormat::Png]
        );
    }

    #[test]
    fn every_candidate_failing_is_no_valid_candidate() {
        let backend = MockBackend::new()
            .with_failing_encoder(OutputFormat::Avif, EncoderKind::Lossy)
            .with_failing_encoder(OutputFormat::Png, EncoderKind::Lossless);
        let photo = source("shot.png", "image/png", 10 * KB);

        let err = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, OptimizeError::NoValidCandidate));
    }

    #[test]
    fn corrupt_source_is_a_decode_error() {
        let backend = bloated_backend();
        let mut photo_bytes = b"corrupt".to_vec();
        photo_bytes.resize(100, 0);
        let photo = crate::test_helpers::source_with_bytes("bad.png", "image/png", photo_bytes);

        let err = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, OptimizeError::Decode(_)));
    }

    #[test]
    fn smart_optimize_off_encodes_once_per_format() {
        let backend = bloated_backend();
        let photo = source("shot.jpg", "image/jpeg", 50 * KB);

        optimize(&backend, &photo, &auto(80, false), &SearchOptions::default()).unwrap();

        assert_eq!(backend.encode_calls(OutputFormat::Jpeg), vec![Some(80)]);
        assert_eq!(backend.encode_calls(OutputFormat::Avif), vec![Some(80)]);
    }

    #[test]
    fn step_down_stops_once_smaller_than_source() {
        // 40 KB only once quality drops to 52
        let backend = MockBackend::new().with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |q| {
            if q.unwrap_or(100) > 60 { 60 * KB } else { 40 * KB }
        });
        let photo = source("shot.jpg", "image/jpeg", 50 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(backend.encode_calls(OutputFormat::Jpeg), vec![Some(80), Some(52)]);
        assert_eq!(result.quality, Some(Quality::new(52)));
        assert_eq!(result.byte_size_delta, (10 * KB) as i64);
    }

    #[test]
    fn step_down_is_capped_at_max_attempts() {
        let backend = MockBackend::new().with_encoder(OutputFormat::Jpeg, EncoderKind::Lossy, |_| 60 * KB);
        let options = SearchOptions {
            tuning: SearchTuning {
                step_fraction: 0.0,
                ..SearchTuning::default()
            },
            ..SearchOptions::default()
        };
        let photo = source("shot.jpg", "image/jpeg", 50 * KB);

        optimize(&backend, &photo, &pinned(OutputFormat::Jpeg), &options).unwrap();

        let calls = backend.encode_calls(OutputFormat::Jpeg);
        assert_eq!(calls.len(), 7);
        assert_eq!(calls.last(), Some(&Some(50)));
    }

    #[test]
    fn lossless_formats_are_never_stepped_down() {
        let backend = MockBackend::new().with_encoder(OutputFormat::Png, EncoderKind::Lossless, |_| 60 * KB);
        let photo = source("shot.png", "image/png", 50 * KB);

        let result = optimize(&backend, &photo, &pinned(OutputFormat::Png), &SearchOptions::default()).unwrap();

        assert_eq!(backend.encode_calls(OutputFormat::Png), vec![None]);
        assert_eq!(result.quality, None);
    }

    #[test]
    fn step_down_keeps_smallest_seen() {
        let backend = MockBackend::new().with_encoder(OutputFormat::Webp, EncoderKind::Lossy, |q| {
            match q {
                Some(52) => 55 * KB,
                Some(24) => 58 * KB,
                _ => 70 * KB,
            }
        });
        let photo = source("art.webp", "image/webp", 50 * KB);

        let result = optimize(&backend, &photo, &pinned(OutputFormat::Webp), &SearchOptions::default()).unwrap();

        assert_eq!(result.quality, Some(Quality::new(52)));
        assert_eq!(result.size(), (55 * KB) as u64);
    }

    #[test]
    fn ties_go_to_the_earlier_candidate() {
        let backend = MockBackend::new()
            .with_encoder(OutputFormat::Avif, EncoderKind::Lossy, |_| 5 * KB)
            .with_encoder(OutputFormat::Webp, EncoderKind::Lossy, |_| 5 * KB);
        let photo = source("pic.png", "image/png", 10 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();
        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Avif));
    }

    #[test]
    fn selection_is_deterministic() {
        let photo = source("pic.png", "image/png", 100 * KB);
        let pick = || {
            let backend = bloated_backend();
            let result = optimize(&backend, &photo, &auto(60, true), &SearchOptions::default()).unwrap();
            (result.format, result.quality, result.size())
        };
        assert_eq!(pick(), pick());
    }

    #[test]
    fn delta_matches_sizes() {
        let backend = bloated_backend();
        for (name, mime) in [("a.png", "image/png"), ("b.jpg", "image/jpeg"), ("c.bmp", "image/bmp")] {
            let photo = source(name, mime, 100 * KB);
            let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();
            assert_eq!(
                result.byte_size_delta,
                result.original_size as i64 - result.size() as i64
            );
        }
    }

    #[test]
    fn emitted_raster_result_has_diff_overlay() {
        let backend = bloated_backend();
        let photo = source("pic.png", "image/png", 200 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();

        let overlay = result.diff_overlay.expect("overlay");
        assert_eq!(overlay.dimensions(), backend.dimensions);
        // source decodes as level 1, candidates as level 200
        assert_eq!(crate::imaging::changed_pixels(&overlay), 64);
        assert!(
            backend
                .get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Decode { .. }))
                .count()
                == 2
        );
    }

    #[test]
    fn svg_source_is_minified_in_auto_mode() {
        let backend = bloated_backend();
        let svg = "<svg>\n  <!-- note -->\n  <rect width = \"1\" />\n</svg>\n";
        let logo = crate::test_helpers::source_with_bytes("logo.svg", "image/svg+xml", svg.as_bytes().to_vec());

        let result = optimize(&backend, &logo, &auto(80, true), &SearchOptions::default()).unwrap();

        assert_eq!(result.format, ResultFormat::Svg);
        assert_eq!(result.bytes, b"<svg><rect width=\"1\"/></svg>");
        assert_eq!(result.file_name, "logo.min.svg");
        assert_eq!(result.mime_type, "image/svg+xml");
        assert!(result.byte_size_delta > 0);
        assert!(result.diff_overlay.is_none());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn svg_source_accepts_explicit_svg_request() {
        let backend = bloated_backend();
        let logo = crate::test_helpers::source_with_bytes("logo.svg", "", b"<svg/>".to_vec());
        let settings = CompressionSettings::new(RequestedFormat::Svg, 80, true);

        let result = optimize(&backend, &logo, &settings, &SearchOptions::default()).unwrap();
        assert_eq!(result.format, ResultFormat::Svg);
        assert_eq!(result.byte_size_delta, 0);
        assert!(result.advisory.is_some());
    }

    #[test]
    fn svg_source_rejects_every_raster_format() {
        let backend = bloated_backend();
        let logo = crate::test_helpers::source_with_bytes("logo.svg", "image/svg+xml", b"<svg/>".to_vec());
        for format in OutputFormat::ALL {
            let err = optimize(&backend, &logo, &pinned(format), &SearchOptions::default()).unwrap_err();
            assert!(matches!(err, OptimizeError::SvgRasterRequested(f) if f == format));
        }
    }

    #[test]
    fn svg_request_for_raster_source_fails() {
        let backend = bloated_backend();
        let photo = source("pic.png", "image/png", 10 * KB);
        let settings = CompressionSettings::new(RequestedFormat::Svg, 80, true);

        let err = optimize(&backend, &photo, &settings, &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, OptimizeError::SvgRequestedForRaster));
    }

    #[test]
    fn quality_ceiling_is_clamped_to_ten() {
        assert_eq!(auto(3, true).quality.value(), 10);
        assert_eq!(auto(250, true).quality.value(), 100);
    }

    #[test]
    fn extensionless_source_uses_mime_subtype() {
        let backend = bloated_backend();
        let photo = source("scan", "image/jpeg", 50 * KB);

        let result = optimize(&backend, &photo, &auto(80, true), &SearchOptions::default()).unwrap();
        assert_eq!(result.format, ResultFormat::Original);
    }

    #[test]
    fn real_backend_pinned_png_reencodes_gradient() {
        let backend = crate::imaging::RustBackend::new();
        let photo = crate::test_helpers::source_with_bytes(
            "gradient.png",
            "image/png",
            crate::test_helpers::gradient_png(32, 32),
        );

        let result = optimize(
            &backend,
            &photo,
            &pinned(OutputFormat::Png),
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(result.format, ResultFormat::Encoded(OutputFormat::Png));
        assert_eq!(result.file_name, "gradient_optimized.png");
        assert_eq!(result.quality, None);
        let overlay = result.diff_overlay.expect("lossless re-encode has an overlay");
        assert_eq!(overlay.dimensions(), (32, 32));
        assert_eq!(crate::imaging::changed_pixels(&overlay), 0);
    }
}
