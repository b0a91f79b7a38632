//! Output filename rules.
//!
//! Every result gets a name derived from its source:
//! - `photo.png` optimized to AVIF → `photo_optimized.avif`
//! - `logo.svg` minified → `logo.min.svg`
//! - a retained original keeps its own name
//! - a diff overlay of `photo.png` → `photo_diff.png`
//!
//! Names must be unique across a session because they become zip entry
//! names. When a derived name is already taken, a numeric suffix is added
//! before the extension: `photo_optimized-2.avif`, `photo_optimized-3.avif`, …

use std::collections::HashSet;

/// A filename split into stem and extension.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitName {
    /// Everything before the last dot. The whole name when there is no dot.
    pub stem: String,
    /// Extension without the dot, original case. Empty if none.
    pub extension: String,
}

/// Split on the last dot. Leading dots (`.hidden`) are part of the stem.
pub fn split_name(name: &str) -> SplitName {
    match name.rfind('.') {
        Some(pos) if pos > 0 => SplitName {
            stem: name[..pos].to_string(),
            extension: name[pos + 1..].to_string(),
        },
        _ => SplitName {
            stem: name.to_string(),
            extension: String::new(),
        },
    }
}

/// `<stem>_optimized.<ext>`
pub fn optimized_name(source_name: &str, extension: &str) -> String {
    format!("{}_optimized.{}", split_name(source_name).stem, extension)
}

/// `<stem>.min.svg`
pub fn minified_svg_name(source_name: &str) -> String {
    format!("{}.min.svg", split_name(source_name).stem)
}

/// `<stem>_diff.png`
pub fn diff_name(source_name: &str) -> String {
    format!("{}_diff.png", split_name(source_name).stem)
}

/// Return `preferred` if it is free, otherwise the first free `<stem>-N.<ext>`.
///
/// Comparison is case-insensitive so archives stay extractable on
/// case-insensitive filesystems.
pub fn unique_name(preferred: &str, taken: &HashSet<String>) -> String {
    let is_taken = |candidate: &str| taken.contains(&candidate.to_lowercase());
    if !is_taken(preferred) {
        return preferred.to_string();
    }
    let SplitName { stem, extension } = split_name(preferred);
    (2..)
        .map(|n| {
            if extension.is_empty() {
                format!("{stem}-{n}")
            } else {
                format!("{stem}-{n}.{extension}")
            }
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| preferred.to_string())
}

/// Lower-cased key used in the `taken` set of [`unique_name`].
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}
