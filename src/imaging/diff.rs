//! Pixel-difference overlay for visual QA.
//!
//! Both surfaces are compared as RGBA at the original's size. A pixel whose
//! summed absolute R, G and B difference exceeds the threshold is painted in
//! the highlight color; every other pixel stays fully transparent, so the
//! result is a sparse overlay meant to be drawn on top of the original.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Threshold and highlight appearance for [`diff_overlay`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffStyle {
    /// Minimum summed per-channel difference (0–765) that counts as changed.
    pub threshold: u32,
    /// Highlight color as `[r, g, b]`.
    pub highlight: [u8; 3],
    /// Highlight opacity, 0.0–1.0.
    pub opacity: f32,
}

impl Default for DiffStyle {
    fn default() -> Self {
        Self {
            threshold: 45,
            highlight: [255, 0, 0],
            opacity: 0.6,
        }
    }
}

impl DiffStyle {
    fn highlight_pixel(&self) -> Rgba<u8> {
        let alpha = (self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let [r, g, b] = self.highlight;
        Rgba([r, g, b, alpha])
    }
}

/// Summed absolute difference of the R, G and B channels.
#[inline]
fn channel_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> u32 {
    (0..3)
        .map(|i| (a.0[i] as i32 - b.0[i] as i32).unsigned_abs())
        .sum()
}

/// Render the difference overlay between `original` and `candidate`.
///
/// The overlay always has the original's dimensions. A candidate of another
/// size is scaled onto that grid first.
pub fn diff_overlay(
    original: &DynamicImage,
    candidate: &DynamicImage,
    style: &DiffStyle,
) -> RgbaImage {
    let base = original.to_rgba8();
    let (width, height) = base.dimensions();
    let other = if candidate.width() == width && candidate.height() == height {
        candidate.to_rgba8()
    } else {
        image::imageops::resize(&candidate.to_rgba8(), width, height, FilterType::Nearest)
    };

    let highlight = style.highlight_pixel();
    let mut overlay = RgbaImage::new(width, height);
    for ((a, b), out) in base.pixels().zip(other.pixels()).zip(overlay.pixels_mut()) {
        if channel_distance(a, b) > style.threshold {
            *out = highlight;
        }
    }
    overlay
}

/// Number of highlighted pixels in an overlay.
pub fn changed_pixels(overlay: &RgbaImage) -> usize {
    overlay.pixels().filter(|p| p.0[3] != 0).count()
}
