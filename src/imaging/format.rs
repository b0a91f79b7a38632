//! Output formats and the per-source candidate preference table.
//!
//! [`OutputFormat`] is the fixed set of raster encodings the search engine
//! may produce. [`RequestedFormat`] is what the user asked for: `auto`, the
//! SVG passthrough, or one pinned raster format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raster encodings the search engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
    Bmp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Avif,
        OutputFormat::Webp,
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Bmp,
    ];

    /// File extension written for this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Avif => "avif",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Avif => "image/avif",
            OutputFormat::Bmp => "image/bmp",
        }
    }

    /// Upper-case display label, e.g. `"AVIF"`.
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::Webp => "WEBP",
            OutputFormat::Avif => "AVIF",
            OutputFormat::Bmp => "BMP",
        }
    }

    /// Map a normalized extension back to its format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match normalize_extension(ext).as_str() {
            "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            "avif" => Some(OutputFormat::Avif),
            "bmp" => Some(OutputFormat::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The format the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestedFormat {
    /// Try the preference table for the source extension.
    #[default]
    Auto,
    /// SVG minification; only valid for SVG sources.
    Svg,
    /// Exactly this format, or fail.
    Pinned(OutputFormat),
}

impl RequestedFormat {
    pub fn is_pinned(self) -> bool {
        matches!(self, RequestedFormat::Pinned(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format '{0}' (expected auto, svg, jpeg, png, webp, avif or bmp)")]
pub struct UnknownFormat(pub String);

impl FromStr for RequestedFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "auto" => Ok(RequestedFormat::Auto),
            "svg" => Ok(RequestedFormat::Svg),
            other => OutputFormat::from_extension(other)
                .map(RequestedFormat::Pinned)
                .ok_or_else(|| UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for RequestedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedFormat::Auto => f.write_str("auto"),
            RequestedFormat::Svg => f.write_str("svg"),
            RequestedFormat::Pinned(format) => {
                f.write_str(&normalize_extension(format.extension()))
            }
        }
    }
}

/// Lower-case an extension and fold aliases (`jpg` → `jpeg`, `tif` → `tiff`).
pub fn normalize_extension(ext: &str) -> String {
    let lowered = ext.trim_start_matches('.').to_ascii_lowercase();
    match lowered.as_str() {
        "jpg" | "jpe" | "jfif" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        _ => lowered,
    }
}

/// Ordered, deduplicated candidate formats for a source with the given extension.
pub fn candidates_for_extension(ext: &str) -> Vec<OutputFormat> {
    use OutputFormat::*;
    let preference: &[OutputFormat] = match normalize_extension(ext).as_str() {
        "png" => &[Avif, Webp, Png, Jpeg, Bmp],
        "jpeg" => &[Avif, Jpeg, Webp, Png, Bmp],
        "webp" => &[Avif, Webp, Jpeg, Png, Bmp],
        "avif" => &[Avif, Webp, Jpeg, Png, Bmp],
        "bmp" => &[Avif, Webp, Png, Jpeg, Bmp],
        "gif" => &[Avif, Webp, Png, Jpeg, Bmp],
        _ => &[Avif, Webp, Jpeg, Png, Bmp],
    };
    let mut out: Vec<OutputFormat> = Vec::with_capacity(preference.len());
    for format in preference {
        if !out.contains(format) {
            out.push(*format);
        }
    }
    out
}
