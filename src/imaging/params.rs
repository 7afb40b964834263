//! Parameter types for codec operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the pipelines (which decide which derivatives to create)
//! and the [`backend`](super::backend) (which does the pixel work). This
//! separation lets tests swap in a mock backend without changing pipeline
//! logic.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (1-100, default 75). Clamped on construction.
//! - [`ResizeParams`]: source, target width, optional height and target encoding.

use crate::types::Format;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
///
/// The value is always in range: construction and deserialization both clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// Parameters for a resize + re-encode.
///
/// `height` may be left out, in which case the backend preserves the source
/// aspect ratio. `format` may be left out for in-memory previews, in which
/// case the backend picks [`Format::inline_encoding`] of the source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub width: u32,
    pub height: Option<u32>,
    pub quality: Quality,
    pub format: Option<Format>,
}

/// An in-memory encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: Format,
    pub width: u32,
    pub height: u32,
}
