//! Blurred placeholder pipeline.
//!
//! A placeholder is a tiny preview shown while the real image loads. Two
//! shapes are produced:
//!
//! - **Inline** (default): the source is resized to a few dozen pixels into
//!   memory, base64-embedded in an SVG that applies a Gaussian blur over the
//!   full source dimensions, and returned as a compact `data:image/svg+xml`
//!   URI. Nothing is written to disk.
//! - **Materialized**: a real single-width derivative per format, produced by
//!   the [`DerivativePipeline`] so it shares naming, reuse and memoization
//!   with regular derivatives.
//!
//! The inline preview and the source metadata are fetched concurrently; the
//! codec never upscales, so a source narrower than the preview width is
//! embedded at its own size.

use crate::derivatives::{DerivativePipeline, ImageRequest, metadata_job, require_dimensions};
use crate::error::DeriveError;
use crate::hashing::{ContentHasher, digest_record};
use crate::imaging::{EncodedImage, ImageBackend, Quality, ResizeParams};
use crate::options::{DEFAULT_ALTERNATE_FORMATS, DEFAULT_QUALITY, ProcessingOptions};
use crate::scheduler::{JobFuture, Operation, Scheduler};
use crate::types::{Derivative, Format};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_BLUR: u32 = 40;
pub const DEFAULT_PLACEHOLDER_WIDTH: u32 = 64;

/// How a placeholder is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderOptions {
    /// Gaussian blur standard deviation, in source pixels.
    pub blur: u32,
    /// Width of the preview raster.
    pub width: u32,
    /// Embed as a data URI instead of writing files.
    pub inline: bool,
    pub quality: Option<u32>,
    /// Alternate encodings for materialized placeholders.
    pub formats: Option<BTreeSet<Format>>,
    pub skip_generation: bool,
}

impl Default for PlaceholderOptions {
    fn default() -> Self {
        Self {
            blur: DEFAULT_BLUR,
            width: DEFAULT_PLACEHOLDER_WIDTH,
            inline: true,
            quality: None,
            formats: None,
            skip_generation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderRequest {
    pub input_file: PathBuf,
    /// Required when `options.inline` is false.
    pub output_dir: Option<PathBuf>,
    pub options: PlaceholderOptions,
}

impl PlaceholderRequest {
    pub fn inline(input_file: impl Into<PathBuf>, options: PlaceholderOptions) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: None,
            options,
        }
    }

    pub fn materialized(
        input_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        options: PlaceholderOptions,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: Some(output_dir.into()),
            options: PlaceholderOptions {
                inline: false,
                ..options
            },
        }
    }

    fn validate(&self) -> Result<(), DeriveError> {
        if self.input_file.as_os_str().is_empty() {
            return Err(DeriveError::InvalidInput("input file is empty".into()));
        }
        if self.options.width == 0 {
            return Err(DeriveError::InvalidInput("placeholder width is zero".into()));
        }
        Ok(())
    }
}

/// A placeholder ready for the attribute assembler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlaceholderResult {
    Inline {
        /// Encoding of the embedded raster.
        format: Format,
        data_uri: String,
        aspect_ratio: f64,
    },
    Materialized {
        original: Derivative,
        alternates: BTreeMap<Format, Derivative>,
        aspect_ratio: f64,
    },
}

impl PlaceholderResult {
    pub fn aspect_ratio(&self) -> f64 {
        match self {
            PlaceholderResult::Inline { aspect_ratio, .. }
            | PlaceholderResult::Materialized { aspect_ratio, .. } => *aspect_ratio,
        }
    }
}

#[derive(Serialize)]
struct RequestKey<'a> {
    input_file: &'a Path,
    output_dir: Option<&'a Path>,
    blur: u32,
    width: u32,
    inline: bool,
    quality: u32,
    formats: BTreeSet<Format>,
    skip_generation: bool,
}

/// Request cache key for placeholders, with defaults filled in.
pub fn placeholder_request_key(
    hasher: &dyn ContentHasher,
    request: &PlaceholderRequest,
) -> Result<String, DeriveError> {
    request.validate()?;
    let options = &request.options;
    let key = RequestKey {
        input_file: &request.input_file,
        output_dir: request.output_dir.as_deref(),
        blur: options.blur,
        width: options.width,
        inline: options.inline,
        quality: Quality::new(options.quality.unwrap_or(DEFAULT_QUALITY)).value(),
        formats: options
            .formats
            .clone()
            .unwrap_or_else(|| DEFAULT_ALTERNATE_FORMATS.into_iter().collect()),
        skip_generation: options.skip_generation,
    };
    Ok(digest_record(hasher, &key, None)?)
}

#[derive(Clone)]
pub struct PlaceholderPipeline {
    scheduler: Arc<Scheduler>,
    backend: Arc<dyn ImageBackend>,
    derivatives: DerivativePipeline,
}

impl PlaceholderPipeline {
    pub fn new(
        scheduler: Arc<Scheduler>,
        backend: Arc<dyn ImageBackend>,
        derivatives: DerivativePipeline,
    ) -> Self {
        Self {
            scheduler,
            backend,
            derivatives,
        }
    }

    pub async fn generate(
        &self,
        request: PlaceholderRequest,
    ) -> Result<PlaceholderResult, DeriveError> {
        request.validate()?;
        if request.options.inline {
            self.inline(&request.input_file, &request.options).await
        } else {
            self.materialized(request).await
        }
    }

    async fn inline(
        &self,
        source: &Path,
        options: &PlaceholderOptions,
    ) -> Result<PlaceholderResult, DeriveError> {
        let metadata = metadata_job(&self.scheduler, &self.backend, source)?;
        let preview = self.preview_job(source, options.width, options.quality)?;
        let (info, preview) = futures::try_join!(metadata, preview)?;
        let info = require_dimensions(info, source)?;

        let raster_uri = raster_data_uri(&preview);
        let svg = blurred_svg(info.width, info.height, options.blur, &raster_uri);
        info!(
            source = %source.display(),
            bytes = preview.bytes.len(),
            "inline placeholder ready"
        );
        Ok(PlaceholderResult::Inline {
            format: preview.format,
            data_uri: svg_data_uri(&svg),
            aspect_ratio: info.aspect_ratio(),
        })
    }

    fn preview_job(
        &self,
        source: &Path,
        width: u32,
        quality: Option<u32>,
    ) -> Result<JobFuture<EncodedImage>, DeriveError> {
        let params = ResizeParams {
            source: source.to_path_buf(),
            width,
            height: None,
            quality: Quality::new(quality.unwrap_or(DEFAULT_QUALITY)),
            format: None,
        };
        let backend = Arc::clone(&self.backend);
        let args = serde_json::to_value(&params)?;
        self.scheduler
            .enqueue(Operation::ResizeToBuffer, &args, move || {
                Ok(backend.resize_to_buffer(&params)?)
            })
    }

    async fn materialized(
        &self,
        request: PlaceholderRequest,
    ) -> Result<PlaceholderResult, DeriveError> {
        let output_dir = request.output_dir.ok_or_else(|| {
            DeriveError::InvalidInput("materialized placeholder needs an output directory".into())
        })?;
        let source = request.input_file.clone();
        let options = request.options;
        let processing = ProcessingOptions {
            widths: Some(vec![options.width]),
            quality: options.quality,
            formats: options.formats,
            skip_generation: options.skip_generation,
            exact_widths: true,
        };
        let result = self
            .derivatives
            .generate(ImageRequest::new(request.input_file, output_dir, processing))
            .await?;

        // The width list is never empty once dimensions are known.
        let original = result
            .original
            .derivatives
            .first()
            .cloned()
            .ok_or(DeriveError::MetadataUnavailable(source))?;
        let alternates = result
            .alternates
            .iter()
            .filter_map(|(format, set)| set.derivatives.first().map(|d| (*format, d.clone())))
            .collect();
        Ok(PlaceholderResult::Materialized {
            original,
            alternates,
            aspect_ratio: result.aspect_ratio,
        })
    }
}

/// `data:<mime>;base64,<payload>` for an encoded raster.
pub fn raster_data_uri(image: &EncodedImage) -> String {
    format!(
        "data:{};base64,{}",
        image.format.mime(),
        STANDARD.encode(&image.bytes)
    )
}

/// SVG sized to the source that blurs `href` across its whole viewport.
pub fn blurred_svg(width: u32, height: u32, blur: u32, href: &str) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}">"#,
            r#"<filter id="b" color-interpolation-filters="sRGB">"#,
            r#"<feGaussianBlur stdDeviation="{blur}"/>"#,
            r#"<feComponentTransfer>"#,
            r#"<feFuncA type="discrete" tableValues="1 1"/>"#,
            r#"</feComponentTransfer>"#,
            r#"</filter>"#,
            r#"<image filter="url(#b)" x="0" y="0" width="100%" height="100%" "#,
            r#"preserveAspectRatio="none" href="{href}"/>"#,
            r#"</svg>"#
        ),
        w = width,
        h = height,
        blur = blur,
        href = href
    )
}

/// Compact `data:image/svg+xml` URI. Double quotes become single quotes and
/// only characters that break URIs or CSS `url()` are percent-encoded.
pub fn svg_data_uri(svg: &str) -> String {
    let mut out = String::with_capacity(svg.len() + 32);
    out.push_str("data:image/svg+xml,");
    for ch in svg.chars() {
        match ch {
            '"' => out.push('\''),
            '%' | '#' | '<' | '>' | '{' | '}' | '|' | '\\' | '^' | '`' | '[' | ']' => {
                // ASCII only, so one byte each
                let _ = write!(out, "%{:02X}", ch as u32);
            }
            c if c.is_ascii_whitespace() => out.push(' '),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "%{:02X}", byte);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::{DeriveStats, Sha256Hasher};
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use futures::executor::block_on;
    use tempfile::TempDir;

    fn pipelines(backend: Arc<MockBackend>) -> (Arc<Scheduler>, PlaceholderPipeline) {
        let scheduler = Arc::new(Scheduler::new(2).unwrap());
        let backend: Arc<dyn ImageBackend> = backend;
        let derivatives = DerivativePipeline::new(
            Arc::clone(&scheduler),
            Arc::clone(&backend),
            Arc::new(Sha256Hasher),
            Arc::new(DeriveStats::default()),
        );
        let placeholder = PlaceholderPipeline::new(Arc::clone(&scheduler), backend, derivatives);
        (scheduler, placeholder)
    }

    fn source_file(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("hero.jpg");
        std::fs::write(&path, b"hero bytes").unwrap();
        path
    }

    #[test]
    fn inline_placeholder_wraps_blurred_preview() {
        let tmp = TempDir::new().unwrap();
        let source = source_file(&tmp);
        let backend = Arc::new(MockBackend::with_source(&source, 300, 200, Format::Jpeg));
        let (_, pipeline) = pipelines(Arc::clone(&backend));

        let result = block_on(
            pipeline.generate(PlaceholderRequest::inline(&source, PlaceholderOptions::default())),
        )
        .unwrap();

        let PlaceholderResult::Inline {
            format,
            data_uri,
            aspect_ratio,
        } = result
        else {
            panic!("expected inline placeholder");
        };
        assert_eq!(format, Format::Jpeg);
        assert_eq!(aspect_ratio, 1.5);
        assert!(data_uri.starts_with("data:image/svg+xml,%3Csvg"));
        assert!(data_uri.contains("viewBox='0 0 300 200'"));
        assert!(data_uri.contains("stdDeviation='40'"));
        // base64 of the mock's "preview" bytes
        assert!(data_uri.contains("data:image/jpeg;base64,cHJldmlldw=="));

        let ops = backend.get_operations();
        assert!(ops.contains(&RecordedOp::ResizeToBuffer {
            source: source.to_string_lossy().into_owned(),
            width: 64,
            format: None,
        }));
        assert_eq!(backend.resize_count(), 0);
    }

    #[test]
    fn custom_blur_and_width() {
        let tmp = TempDir::new().unwrap();
        let source = source_file(&tmp);
        let backend = Arc::new(MockBackend::with_source(&source, 1000, 500, Format::Png));
        let (_, pipeline) = pipelines(Arc::clone(&backend));

        let options = PlaceholderOptions {
            blur: 12,
            width: 32,
            ..PlaceholderOptions::default()
        };
        let result =
            block_on(pipeline.generate(PlaceholderRequest::inline(&source, options))).unwrap();
        let PlaceholderResult::Inline { data_uri, .. } = result else {
            panic!("expected inline placeholder");
        };
        assert!(data_uri.contains("stdDeviation='12'"));
        assert!(data_uri.contains("data:image/png;base64,"));
        assert!(backend
            .get_operations()
            .iter()
            .any(|op| matches!(op, RecordedOp::ResizeToBuffer { width: 32, .. })));
    }

    #[test]
    fn materialized_placeholder_is_a_small_derivative() {
        let tmp = TempDir::new().unwrap();
        let source = source_file(&tmp);
        let backend = Arc::new(MockBackend::with_source(&source, 300, 200, Format::Jpeg));
        let (_, pipeline) = pipelines(Arc::clone(&backend));

        let options = PlaceholderOptions {
            formats: Some(BTreeSet::from([Format::Webp])),
            ..PlaceholderOptions::default()
        };
        let request = PlaceholderRequest::materialized(&source, tmp.path().join("out"), options);
        let result = block_on(pipeline.generate(request)).unwrap();

        let PlaceholderResult::Materialized {
            original,
            alternates,
            aspect_ratio,
        } = result
        else {
            panic!("expected materialized placeholder");
        };
        assert_eq!((original.width, original.height), (64, 43));
        assert!(original.path.exists());
        assert_eq!(alternates[&Format::Webp].width, 64);
        assert_eq!(aspect_ratio, 1.5);
        assert_eq!(backend.resize_count(), 2);
    }

    #[test]
    fn materialized_without_output_dir_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let source = source_file(&tmp);
        let backend = Arc::new(MockBackend::with_source(&source, 300, 200, Format::Jpeg));
        let (_, pipeline) = pipelines(backend);

        let request = PlaceholderRequest {
            input_file: source,
            output_dir: None,
            options: PlaceholderOptions {
                inline: false,
                ..PlaceholderOptions::default()
            },
        };
        assert!(matches!(
            block_on(pipeline.generate(request)),
            Err(DeriveError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_input_fails_before_any_job() {
        let backend = Arc::new(MockBackend::new());
        let (scheduler, pipeline) = pipelines(Arc::clone(&backend));

        let result = block_on(
            pipeline.generate(PlaceholderRequest::inline("", PlaceholderOptions::default())),
        );
        assert!(matches!(result, Err(DeriveError::InvalidInput(_))));
        assert_eq!(scheduler.jobs_started(), 0);
        assert_eq!(backend.total_calls(), 0);
    }

    #[test]
    fn request_key_fills_defaults() {
        let implicit = PlaceholderRequest::inline("/src/a.jpg", PlaceholderOptions::default());
        let explicit = PlaceholderRequest::inline(
            "/src/a.jpg",
            PlaceholderOptions {
                quality: Some(DEFAULT_QUALITY),
                formats: Some(DEFAULT_ALTERNATE_FORMATS.into_iter().collect()),
                ..PlaceholderOptions::default()
            },
        );
        let blurrier = PlaceholderRequest::inline(
            "/src/a.jpg",
            PlaceholderOptions {
                blur: 60,
                ..PlaceholderOptions::default()
            },
        );
        let key = |r: &PlaceholderRequest| placeholder_request_key(&Sha256Hasher, r).unwrap();
        assert_eq!(key(&implicit), key(&explicit));
        assert_ne!(key(&implicit), key(&blurrier));
    }

    #[test]
    fn svg_data_uri_escapes_reserved_characters() {
        let uri = svg_data_uri(r##"<svg a="1" b="#x">50%</svg>"##);
        assert_eq!(
            uri,
            "data:image/svg+xml,%3Csvg a='1' b='%23x'%3E50%25%3C/svg%3E"
        );
    }

    #[test]
    fn svg_data_uri_collapses_whitespace_and_encodes_unicode() {
        assert_eq!(svg_data_uri("a\nb"), "data:image/svg+xml,a b");
        assert_eq!(svg_data_uri("é"), "data:image/svg+xml,%C3%A9");
    }

    #[test]
    fn blurred_svg_uses_source_viewbox() {
        let svg = blurred_svg(1920, 1080, 40, "data:x");
        assert!(svg.contains(r#"viewBox="0 0 1920 1080""#));
        assert!(svg.contains(r#"stdDeviation="40""#));
        assert!(svg.contains(r#"href="data:x""#));
    }
}
