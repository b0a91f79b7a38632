//! Configuration module.
//!
//! Handles loading, validating, and merging `squeeze.toml`. Stock defaults
//! are the base layer; a user file overrides any subset of keys; CLI flags
//! override both (applied by the binary).
//!
//! ## Config File Location
//!
//! `--config FILE` names the file explicitly (it must exist). Without it,
//! `squeeze.toml` in the working directory is used when present.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [compression]
//! format = "auto"           # auto, svg, jpeg, png, webp, avif, bmp
//! quality = 80              # Quality ceiling for lossy encoders (10-100)
//! smart_optimize = true     # Step quality down when output isn't smaller
//!
//! [limits]
//! max_files = 20
//! max_file_bytes = 104857600     # 100 MiB
//! max_total_bytes = 1073741824   # 1 GiB
//!
//! [search]
//! max_attempts = 6          # Step-down retries per format
//! step_fraction = 0.35      # Step as a fraction of the initial quality
//! min_step = 5              # Smallest quality step
//! quality_floor = 15        # Never go below this quality
//!
//! [diff]
//! threshold = 45            # Summed RGB difference that counts as changed
//! highlight = [255, 0, 0]
//! opacity = 0.6
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [compression]
//! format = "webp"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DiffStyle, RequestedFormat, SearchTuning, UnknownFormat};
use crate::search::{CompressionSettings, MIN_QUALITY_CEILING, SearchOptions};
use crate::session::Limits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILENAME: &str = "squeeze.toml";

/// Largest possible summed RGB difference.
const MAX_DIFF_THRESHOLD: u32 = 3 * 255;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Format(#[from] UnknownFormat),
}

/// Configuration loaded from `squeeze.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqueezeConfig {
    /// Default output format, quality ceiling, smart optimize.
    pub compression: CompressionConfig,
    /// Batch bounds enforced at intake.
    pub limits: Limits,
    /// Smart-optimize step-down schedule.
    pub search: SearchTuning,
    /// Diff overlay appearance.
    pub diff: DiffStyle,
}

/// `[compression]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    pub format: String,
    pub quality: u32,
    pub smart_optimize: bool,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
            quality: 80,
            smart_optimize: true,
        }
    }
}

impl SqueezeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compression.format.parse::<RequestedFormat>()?;
        if !(MIN_QUALITY_CEILING..=100).contains(&self.compression.quality) {
            return Err(ConfigError::Validation(format!(
                "compression.quality must be {MIN_QUALITY_CEILING}-100"
            )));
        }
        if self.limits.max_files == 0
            || self.limits.max_file_bytes == 0
            || self.limits.max_total_bytes == 0
        {
            return Err(ConfigError::Validation(
                "limits values must be non-zero".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.search.step_fraction) {
            return Err(ConfigError::Validation(
                "search.step_fraction must be in [0, 1)".into(),
            ));
        }
        if self.search.min_step == 0 {
            return Err(ConfigError::Validation(
                "search.min_step must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.search.quality_floor) {
            return Err(ConfigError::Validation(
                "search.quality_floor must be 1-100".into(),
            ));
        }
        if self.diff.threshold > MAX_DIFF_THRESHOLD {
            return Err(ConfigError::Validation(format!(
                "diff.threshold must be 0-{MAX_DIFF_THRESHOLD}"
            )));
        }
        if !(0.0..=1.0).contains(&self.diff.opacity) {
            return Err(ConfigError::Validation(
                "diff.opacity must be 0.0-1.0".into(),
            ));
        }
        Ok(())
    }

    /// The compression settings this config describes.
    pub fn settings(&self) -> Result<CompressionSettings, ConfigError> {
        Ok(CompressionSettings::new(
            self.compression.format.parse()?,
            self.compression.quality,
            self.compression.smart_optimize,
        ))
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            tuning: self.search,
            diff: self.diff,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SqueezeConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SqueezeConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SqueezeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// An `explicit` path must exist. Otherwise `squeeze.toml` in `dir` is used
/// if present, and stock defaults if not.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<SqueezeConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            Some(load_raw_config(path)?.ok_or_else(|| ConfigError::NotFound(path.to_path_buf()))?)
        }
        None => load_raw_config(&dir.join(CONFIG_FILENAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `squeeze.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixel-squeeze configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags (--format, --quality, --no-smart) override this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compression]
# Output format:
#   auto  - try every candidate format, keep the smallest
#   svg   - minify SVG sources (raster sources fail)
#   jpeg, png, webp, avif, bmp - always this format, fail if unavailable
format = "auto"

# Quality ceiling for lossy encoders (10-100). Lossless encoders ignore it.
quality = 80

# When a candidate isn't smaller than the original, retry it at
# progressively lower quality (see [search]).
smart_optimize = true

# ---------------------------------------------------------------------------
# Batch limits
# ---------------------------------------------------------------------------
[limits]
# Maximum number of images in one batch.
max_files = 20

# Largest accepted single image, in bytes (100 MiB).
max_file_bytes = 104857600

# Largest accepted batch total, in bytes (1 GiB).
max_total_bytes = 1073741824

# ---------------------------------------------------------------------------
# Smart-optimize step-down
# ---------------------------------------------------------------------------
[search]
# Retries per candidate format.
max_attempts = 6

# Each retry lowers quality by max(min_step, step_fraction * initial quality).
step_fraction = 0.35
min_step = 5

# Quality never drops below this.
quality_floor = 15

# ---------------------------------------------------------------------------
# Diff overlay
# ---------------------------------------------------------------------------
[diff]
# Summed |dR| + |dG| + |dB| above which a pixel counts as changed (0-765).
threshold = 45

# Highlight color [r, g, b] and its opacity (0.0-1.0).
highlight = [255, 0, 0]
opacity = 0.6
"##
}
