//! Shared types used across the pipelines and the attribute assembler.
//!
//! These are the values that flow between stages: the codec reports
//! [`ImageInfo`], the derivative pipeline produces [`Derivative`]s grouped into
//! [`DerivativeSet`]s, and the assembler turns a [`DerivativeResult`] into
//! markup attributes. Everything here serializes to JSON for the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// An image encoding family the codec can read or write.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    Webp,
    Avif,
    #[serde(alias = "tif")]
    Tiff,
}

impl Format {
    /// File extension used for derivative filenames.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Avif => "avif",
            Format::Tiff => "tiff",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Webp => "image/webp",
            Format::Avif => "image/avif",
            Format::Tiff => "image/tiff",
        }
    }

    /// Capitalized name used to build attribute keys (`srcsetWebp`,
    /// `placeholderAvifSrc`).
    pub fn label(self) -> &'static str {
        match self {
            Format::Jpeg => "Jpeg",
            Format::Png => "Png",
            Format::Webp => "Webp",
            Format::Avif => "Avif",
            Format::Tiff => "Tiff",
        }
    }

    /// Encoding used when a tiny preview of this format is inlined into a
    /// data URI. Browsers cannot be relied on for AVIF or TIFF here.
    pub fn inline_encoding(self) -> Format {
        match self {
            Format::Jpeg | Format::Png | Format::Webp => self,
            Format::Avif | Format::Tiff => Format::Png,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Webp => "webp",
            Format::Avif => "avif",
            Format::Tiff => "tiff",
        })
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Format::Jpeg),
            "png" => Ok(Format::Png),
            "webp" => Ok(Format::Webp),
            "avif" => Ok(Format::Avif),
            "tiff" | "tif" => Ok(Format::Tiff),
            other => Err(format!("unknown image format: {other}")),
        }
    }
}

/// Source metadata reported by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: Format,
}

impl ImageInfo {
    /// `width / height`. Callers reject zero dimensions before asking.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// One resized output file and its dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivative {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// All derivatives of one source in one format, ascending by width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeSet {
    pub format: Format,
    pub derivatives: Vec<Derivative>,
}

impl DerivativeSet {
    pub fn widths(&self) -> Vec<u32> {
        self.derivatives.iter().map(|d| d.width).collect()
    }
}

/// Output of the image derivative pipeline for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeResult {
    /// Derivatives in the source's own encoding.
    pub original: DerivativeSet,
    /// One set per requested alternate encoding.
    pub alternates: BTreeMap<Format, DerivativeSet>,
    pub aspect_ratio: f64,
}

impl DerivativeResult {
    /// Every set, original first.
    pub fn sets(&self) -> impl Iterator<Item = &DerivativeSet> {
        std::iter::once(&self.original).chain(self.alternates.values())
    }
}
