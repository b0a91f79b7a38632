//! Image codecs and pixel work — pure Rust, zero external dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (+ `rav1d` for AVIF) |
//! | **Encode** | `image::codecs::*` encoders, AVIF via rav1e |
//! | **Diff overlay** | per-pixel RGB distance over `RgbaImage` |
//! | **SVG minify** | `regex` text passes |
//!
//! The module is split into:
//! - **Format**: Output formats and the per-extension candidate table
//! - **Parameters**: Quality and the smart-optimize step-down schedule
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Diff / SVG**: Pure functions over pixels and markup (unit testable)

mod avif;
pub mod backend;
pub mod diff;
pub mod format;
mod params;
pub mod rust_backend;
pub mod svg;

pub use backend::{BackendError, EncoderKind, ImageBackend};
pub use diff::{DiffStyle, changed_pixels, diff_overlay};
pub use format::{
    OutputFormat, RequestedFormat, UnknownFormat, candidates_for_extension, normalize_extension,
};
pub use params::{Quality, SearchTuning};
pub use rust_backend::RustBackend;
pub use svg::{is_svg, minify_svg};
