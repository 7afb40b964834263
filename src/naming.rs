//! Derivative filename conventions.
//!
//! Every derivative is named
//!
//! ```text
//! {base}.{width_hash}.{fingerprint}.{ext}
//! dawn.3f9a1c2e.9b1d…e4.webp
//! ```
//!
//! - `base`: the source file stem (`photos/dawn.jpg` → `dawn`)
//! - `width_hash`: short digest of the per-file options (width and quality)
//! - `fingerprint`: digest of the source bytes
//! - `ext`: extension of the target encoding
//!
//! The name is a pure function of those four parts, so the same source bytes
//! encoded with the same per-file options always land on the same path. That
//! path is what makes a previous build's output reusable.

use crate::error::DeriveError;
use std::path::Path;

/// Source file name without its extension.
pub fn base_name(source: &Path) -> Result<String, DeriveError> {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            DeriveError::InvalidInput(format!("no file name in {}", source.display()))
        })
}

/// Compose a derivative filename. Returns `None` if any part is empty.
pub fn derivative_filename(
    base: &str,
    width_hash: &str,
    fingerprint: &str,
    extension: &str,
) -> Option<String> {
    let parts = [base, width_hash, fingerprint, extension];
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    Some(parts.join("."))
}
