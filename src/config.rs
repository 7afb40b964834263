//! Configuration module.
//!
//! Handles loading, validating, and merging `simple-srcset.toml`. Stock
//! defaults are the base layer; the user file only needs the keys it wants to
//! override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! widths = [480, 1024, 1920, 2560]  # Candidate widths (capped at source width)
//! quality = 75                      # Lossy encoding quality (1-100)
//! formats = ["webp", "avif"]        # Alternate encodings besides the source's own
//!
//! [placeholder]
//! enabled = true                    # Emit a blurred placeholder
//! inline = true                     # Data URI (true) or files in the output dir (false)
//! blur = 40                         # Gaussian blur standard deviation
//! width = 64                        # Preview raster width
//!
//! [output]
//! url_prefix = ""                   # Prefix joined onto derivative paths in srcsets
//!
//! [processing]
//! max_processes = 4                 # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::attributes::UrlRewrite;
use crate::generate::AttributeRequest;
use crate::options::{DEFAULT_ALTERNATE_FORMATS, DEFAULT_QUALITY, DEFAULT_WIDTHS};
use crate::placeholder::{DEFAULT_BLUR, DEFAULT_PLACEHOLDER_WIDTH};
use crate::types::Format;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "simple-srcset.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `simple-srcset.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SrcsetConfig {
    /// Derivative generation settings (widths, quality, formats).
    pub images: ImagesConfig,
    /// Blurred placeholder settings.
    pub placeholder: PlaceholderConfig,
    /// How derivative paths become URLs.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl SrcsetConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.widths.is_empty() {
            return Err(ConfigError::Validation(
                "images.widths must not be empty".into(),
            ));
        }
        if self.images.widths.contains(&0) {
            return Err(ConfigError::Validation(
                "images.widths values must be non-zero".into(),
            ));
        }
        if self.placeholder.blur == 0 {
            return Err(ConfigError::Validation(
                "placeholder.blur must be greater than 0".into(),
            ));
        }
        if self.placeholder.width == 0 {
            return Err(ConfigError::Validation(
                "placeholder.width must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// An attribute request for `src` carrying this config's settings.
    pub fn attribute_request(
        &self,
        src: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> AttributeRequest {
        let mut request = AttributeRequest::new(src, input_dir, output_dir);
        request.widths = Some(self.images.widths.clone());
        request.quality = Some(self.images.quality);
        request.formats = Some(self.images.formats.iter().copied().collect());
        request.skip_placeholder = !self.placeholder.enabled;
        request.placeholder_inline = self.placeholder.inline;
        request.placeholder_blur = self.placeholder.blur;
        request.placeholder_width = self.placeholder.width;
        request.url_rewrite = UrlRewrite::prefix(self.output.url_prefix.clone());
        request
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Candidate widths. Widths above the source width are skipped.
    pub widths: Vec<u32>,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Alternate encodings generated next to the source's own.
    pub formats: Vec<Format>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            widths: DEFAULT_WIDTHS.to_vec(),
            quality: DEFAULT_QUALITY,
            formats: DEFAULT_ALTERNATE_FORMATS.to_vec(),
        }
    }
}

/// Placeholder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    pub enabled: bool,
    /// Data URI when true, files in the output directory when false.
    pub inline: bool,
    /// Gaussian blur standard deviation, in source pixels.
    pub blur: u32,
    /// Width of the preview raster.
    pub width: u32,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inline: true,
            blur: DEFAULT_BLUR,
            width: DEFAULT_PLACEHOLDER_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Joined onto each derivative path (relative to the output directory).
    pub url_prefix: String,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SrcsetConfig::default())?)
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
) -> Result<SrcsetConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SrcsetConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it is missing.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<SrcsetConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `simple-srcset.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-srcset configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Responsive derivatives
# ---------------------------------------------------------------------------
[images]
# Candidate widths in pixels. Widths larger than a source are skipped; the
# source width itself is added when no candidate reaches it.
widths = [480, 1024, 1920, 2560]

# Lossy encoding quality (1 = worst, 100 = best).
quality = 75

# Alternate encodings generated next to the source's own encoding.
# Any of: "jpeg", "png", "webp", "avif", "tiff".
formats = ["webp", "avif"]

# ---------------------------------------------------------------------------
# Blurred placeholder
# ---------------------------------------------------------------------------
[placeholder]
enabled = true

# true: embed as a data URI. false: write small files to the output directory.
inline = true

# Gaussian blur standard deviation, in source pixels.
blur = 40

# Width of the preview raster.
width = 64

# ---------------------------------------------------------------------------
# URLs
# ---------------------------------------------------------------------------
[output]
# Prefix joined onto each derivative path (relative to the output directory).
# Example: "/images" turns "dawn.1a2b3c4d.9f3e.webp" into "/images/dawn.1a2b3c4d.9f3e.webp".
url_prefix = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
