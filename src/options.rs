//! Processing options and their normalization.
//!
//! Callers may leave any option unset. Two forms of normalization exist:
//!
//! - [`ProcessingOptions::key_record`] fills in defaults and sorts widths. It
//!   needs no I/O, so the request caches can deduplicate before the source is
//!   even opened. Leaving an option out and spelling out its default value
//!   produce the same record.
//! - [`ProcessingOptions::normalize`] additionally applies the width policy
//!   against the source width, once metadata is known.

use crate::imaging::{Quality, calculate_derivative_widths, capped_widths};
use crate::types::Format;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Widths generated when the caller asks for none.
pub const DEFAULT_WIDTHS: [u32; 4] = [480, 1024, 1920, 2560];

pub const DEFAULT_QUALITY: u32 = 75;

/// Alternate encodings generated when the caller does not choose.
pub const DEFAULT_ALTERNATE_FORMATS: [Format; 2] = [Format::Webp, Format::Avif];

/// Caller-supplied options for one derivative request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub widths: Option<Vec<u32>>,
    pub quality: Option<u32>,
    /// Alternate encodings, in addition to the source's own.
    pub formats: Option<BTreeSet<Format>>,
    pub skip_generation: bool,
    /// Generate only the requested widths, without the full-size fallback.
    pub exact_widths: bool,
}

/// Options with defaults applied, as they enter a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionsKey {
    pub widths: Vec<u32>,
    pub quality: u32,
    pub formats: BTreeSet<Format>,
    pub skip_generation: bool,
    pub exact_widths: bool,
}

/// Options resolved against a concrete source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedOptions {
    /// Ascending, deduplicated, never wider than the source.
    pub widths: Vec<u32>,
    pub quality: Quality,
    pub formats: BTreeSet<Format>,
    pub skip_generation: bool,
}

impl ProcessingOptions {
    pub fn with_widths(mut self, widths: impl Into<Vec<u32>>) -> Self {
        self.widths = Some(widths.into());
        self
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = Format>) -> Self {
        self.formats = Some(formats.into_iter().collect());
        self
    }

    pub fn skip_generation(mut self, skip: bool) -> Self {
        self.skip_generation = skip;
        self
    }

    /// Requested widths with the default list substituted.
    fn requested_widths(&self) -> Vec<u32> {
        self.widths
            .clone()
            .unwrap_or_else(|| DEFAULT_WIDTHS.to_vec())
    }

    fn quality(&self) -> Quality {
        Quality::new(self.quality.unwrap_or(DEFAULT_QUALITY))
    }

    fn formats(&self) -> BTreeSet<Format> {
        self.formats
            .clone()
            .unwrap_or_else(|| DEFAULT_ALTERNATE_FORMATS.into_iter().collect())
    }

    /// Defaults filled in, zero widths dropped, widths sorted and
    /// deduplicated.
    pub fn key_record(&self) -> OptionsKey {
        let mut widths = self.requested_widths();
        widths.retain(|&w| w > 0);
        widths.sort_unstable();
        widths.dedup();
        OptionsKey {
            widths,
            quality: self.quality().value(),
            formats: self.formats(),
            skip_generation: self.skip_generation,
            exact_widths: self.exact_widths,
        }
    }

    /// Resolve against a source `source_width` pixels wide.
    pub fn normalize(&self, source_width: u32) -> NormalizedOptions {
        let requested = self.requested_widths();
        let widths = if self.exact_widths {
            capped_widths(source_width, &requested)
        } else {
            calculate_derivative_widths(source_width, &requested)
        };
        NormalizedOptions {
            widths,
            quality: self.quality(),
            formats: self.formats(),
            skip_generation: self.skip_generation,
        }
    }
}
