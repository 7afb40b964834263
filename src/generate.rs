//! The request surface: one call per source image, attributes out.
//!
//! [`Generator::generate_attributes`] issues a derivative request and a
//! placeholder request concurrently. Each goes through its own
//! [`RequestCache`], so overlapping callers (the same image referenced from
//! several pages, say) share one computation per distinct request. Both
//! pipelines share one [`Scheduler`], so their underlying jobs (metadata
//! reads in particular) are shared too.
//!
//! ```text
//! generate_attributes
//!  ├── RequestCache<ImageRequest>       → DerivativePipeline  ─┐
//!  └── RequestCache<PlaceholderRequest> → PlaceholderPipeline ─┴→ Scheduler → codec
//!                        ↓
//!                    assemble → AttributeRecord
//! ```

use crate::attributes::{AttributeRecord, RewriteContext, SrcsetStyle, UrlRewrite, assemble};
use crate::derivatives::{DerivativePipeline, ImageRequest, image_request_key};
use crate::error::DeriveError;
use crate::hashing::{ContentHasher, DeriveStats, Sha256Hasher};
use crate::imaging::{ImageBackend, RustBackend};
use crate::options::ProcessingOptions;
use crate::placeholder::{
    DEFAULT_BLUR, DEFAULT_PLACEHOLDER_WIDTH, PlaceholderOptions, PlaceholderPipeline,
    PlaceholderRequest, PlaceholderResult, placeholder_request_key,
};
use crate::request_cache::RequestCache;
use crate::scheduler::Scheduler;
use crate::types::{DerivativeResult, Format};
use futures::FutureExt;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything needed to produce attributes for one `src`.
#[derive(Debug, Clone)]
pub struct AttributeRequest {
    /// Source path, relative to `input_dir` unless absolute.
    pub src: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Alternate encodings. `None` means the defaults.
    pub formats: Option<BTreeSet<Format>>,
    pub widths: Option<Vec<u32>>,
    pub quality: Option<u32>,
    pub skip_generation: bool,
    pub skip_placeholder: bool,
    pub placeholder_inline: bool,
    pub placeholder_blur: u32,
    pub placeholder_width: u32,
    pub url_rewrite: UrlRewrite,
    pub srcset_style: SrcsetStyle,
}

impl AttributeRequest {
    pub fn new(
        src: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            src: src.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            formats: None,
            widths: None,
            quality: None,
            skip_generation: false,
            skip_placeholder: false,
            placeholder_inline: true,
            placeholder_blur: DEFAULT_BLUR,
            placeholder_width: DEFAULT_PLACEHOLDER_WIDTH,
            url_rewrite: UrlRewrite::default(),
            srcset_style: SrcsetStyle::default(),
        }
    }

    fn source_path(&self) -> PathBuf {
        self.input_dir.join(&self.src)
    }

    fn image_request(&self) -> ImageRequest {
        ImageRequest::new(
            self.source_path(),
            &self.output_dir,
            ProcessingOptions {
                widths: self.widths.clone(),
                quality: self.quality,
                formats: self.formats.clone(),
                skip_generation: self.skip_generation,
                exact_widths: false,
            },
        )
    }

    fn placeholder_request(&self) -> Option<PlaceholderRequest> {
        if self.skip_placeholder {
            return None;
        }
        let options = PlaceholderOptions {
            blur: self.placeholder_blur,
            width: self.placeholder_width,
            inline: self.placeholder_inline,
            quality: self.quality,
            formats: self.formats.clone(),
            skip_generation: self.skip_generation,
        };
        Some(if self.placeholder_inline {
            PlaceholderRequest::inline(self.source_path(), options)
        } else {
            PlaceholderRequest::materialized(self.source_path(), &self.output_dir, options)
        })
    }
}

/// Front door to both pipelines, with one request cache each.
pub struct Generator {
    scheduler: Arc<Scheduler>,
    stats: Arc<DeriveStats>,
    derivatives: RequestCache<ImageRequest, DerivativeResult>,
    placeholders: RequestCache<PlaceholderRequest, PlaceholderResult>,
}

impl Generator {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        hasher: Arc<dyn ContentHasher>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let stats = Arc::new(DeriveStats::default());
        let derivative_pipeline = DerivativePipeline::new(
            Arc::clone(&scheduler),
            Arc::clone(&backend),
            Arc::clone(&hasher),
            Arc::clone(&stats),
        );
        let placeholder_pipeline = PlaceholderPipeline::new(
            Arc::clone(&scheduler),
            backend,
            derivative_pipeline.clone(),
        );

        let derivatives = {
            let hasher = Arc::clone(&hasher);
            RequestCache::new(
                "derivatives",
                move |request: &ImageRequest| image_request_key(hasher.as_ref(), request),
                move |request: ImageRequest| {
                    let pipeline = derivative_pipeline.clone();
                    async move { pipeline.generate(request).await }.boxed()
                },
            )
        };
        let placeholders = RequestCache::new(
            "placeholders",
            move |request: &PlaceholderRequest| placeholder_request_key(hasher.as_ref(), request),
            move |request: PlaceholderRequest| {
                let pipeline = placeholder_pipeline.clone();
                async move { pipeline.generate(request).await }.boxed()
            },
        );

        Self {
            scheduler,
            stats,
            derivatives,
            placeholders,
        }
    }

    /// Production wiring: pure Rust codec, SHA-256, `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, DeriveError> {
        Ok(Self::new(
            Arc::new(RustBackend::new()),
            Arc::new(Sha256Hasher),
            Arc::new(Scheduler::new(threads)?),
        ))
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &DeriveStats {
        &self.stats
    }

    /// Distinct derivative and placeholder requests seen so far.
    pub fn cached_requests(&self) -> (usize, usize) {
        (self.derivatives.len(), self.placeholders.len())
    }

    /// Derivatives for one request, memoized by request key.
    pub async fn derivatives(
        &self,
        request: ImageRequest,
    ) -> Result<DerivativeResult, DeriveError> {
        self.derivatives.process(request).await
    }

    /// Placeholder for one request, memoized by request key.
    pub async fn placeholder(
        &self,
        request: PlaceholderRequest,
    ) -> Result<PlaceholderResult, DeriveError> {
        self.placeholders.process(request).await
    }

    /// Derivatives and placeholder for `request.src`, assembled into markup
    /// attributes.
    pub async fn generate_attributes(
        &self,
        request: &AttributeRequest,
    ) -> Result<AttributeRecord, DeriveError> {
        if request.src.as_os_str().is_empty() {
            return Err(DeriveError::InvalidInput("src is empty".into()));
        }
        debug!(src = %request.src.display(), "attributes requested");

        let placeholder_request = request.placeholder_request();
        let (derivatives, placeholder) = futures::try_join!(
            self.derivatives(request.image_request()),
            async {
                match placeholder_request {
                    Some(r) => self.placeholder(r).await.map(Some),
                    None => Ok(None),
                }
            }
        )?;

        let ctx = RewriteContext {
            input_dir: request.input_dir.clone(),
            output_dir: request.output_dir.clone(),
            source_path: request.source_path(),
        };
        assemble(
            &derivatives,
            placeholder.as_ref(),
            &request.url_rewrite,
            &ctx,
            request.srcset_style,
        )
    }
}
