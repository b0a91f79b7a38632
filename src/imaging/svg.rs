//! Textual SVG minification.
//!
//! SVG sources never go through the raster pipeline. They are shrunk by
//! stripping comments and collapsing whitespace around tag and attribute
//! delimiters. Attribute tightening only touches tag spans, so text nodes,
//! CDATA and `<style>` bodies keep their content.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^!][^>]*>").unwrap());
static BETWEEN_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());
static AROUND_EQUALS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*=\s*").unwrap());
static BEFORE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+(/?>)").unwrap());
static RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Minify SVG markup.
pub fn minify_svg(source: &str) -> String {
    let text = COMMENT.replace_all(source, "");
    let text = BETWEEN_TAGS.replace_all(&text, "><");
    let text = TAG.replace_all(&text, |caps: &Captures| {
        let tag = AROUND_EQUALS.replace_all(&caps[0], "=");
        BEFORE_CLOSE.replace_all(&tag, "$1").into_owned()
    });
    let text = RUNS.replace_all(&text, " ");
    text.trim().to_string()
}

/// Whether a file is SVG, judged by MIME type or extension.
pub fn is_svg(name: &str, mime_type: &str) -> bool {
    mime_type.eq_ignore_ascii_case("image/svg+xml")
        || std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}
