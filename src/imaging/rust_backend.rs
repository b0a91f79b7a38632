//! Pure Rust codec backend — zero system dependencies.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function | Kind |
//! |---|---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP, GIF) | `image::ImageReader` with format sniffing | |
//! | Decode (AVIF) | `avif-parse` + `rav1d` (see [`avif`](super::avif)) | |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` | lossy |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) | lossy |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (best compression, adaptive filter) | lossless |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (VP8L only) | lossless |
//! | Encode → BMP | `image::codecs::bmp::BmpEncoder` | lossless |

use super::avif::{decode_avif, is_avif};
use super::backend::{BackendError, EncoderKind, ImageBackend};
use super::format::OutputFormat;
use super::params::Quality;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// rav1e speed preset: 1 (slowest, smallest) to 10 (fastest).
const AVIF_SPEED: u8 = 6;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop alpha when the surface is fully opaque, so encoders that store an
/// alpha channel verbatim don't pay for it.
fn without_redundant_alpha(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() && img.to_rgba8().pixels().all(|p| p.0[3] == u8::MAX) {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img.clone()
    }
}

/// Normalize to 8-bit RGB or RGBA, the layouts every encoder here accepts.
fn as_8bit(img: &DynamicImage) -> DynamicImage {
    let img = without_redundant_alpha(img);
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

fn encode_failed(format: OutputFormat) -> impl FnOnce(image::ImageError) -> BackendError {
    move |e| BackendError::EncodeFailed {
        format,
        reason: e.to_string(),
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        if is_avif(bytes) {
            return decode_avif(bytes);
        }
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| BackendError::DecodeFailed(e.to_string()))
    }

    fn encoder(&self, format: OutputFormat) -> Option<EncoderKind> {
        match format {
            OutputFormat::Jpeg | OutputFormat::Avif => Some(EncoderKind::Lossy),
            OutputFormat::Png | OutputFormat::Webp | OutputFormat::Bmp => {
                Some(EncoderKind::Lossless)
            }
        }
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Option<Quality>,
    ) -> Result<Vec<u8>, BackendError> {
        let quality = quality.unwrap_or(Quality::new(100)).value() as u8;
        let mut buf = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
                rgb.write_with_encoder(encoder)
                    .map_err(encode_failed(format))?;
            }
            OutputFormat::Avif => {
                let encoder = AvifEncoder::new_with_speed_quality(&mut buf, AVIF_SPEED, quality);
                as_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_failed(format))?;
            }
            OutputFormat::Png => {
                let encoder =
                    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
                without_redundant_alpha(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_failed(format))?;
            }
            OutputFormat::Webp => {
                let encoder = WebPEncoder::new_lossless(&mut buf);
                as_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_failed(format))?;
            }
            OutputFormat::Bmp => {
                let encoder = BmpEncoder::new(&mut buf);
                as_8bit(image)
                    .write_with_encoder(encoder)
                    .map_err(encode_failed(format))?;
            }
        }
        Ok(buf)
    }
}
