//! Image derivative pipeline.
//!
//! Turns one source image into a set of resized, re-encoded files: one
//! [`DerivativeSet`] in the source's own encoding plus one per requested
//! alternate encoding, each covering the normalized width list.
//!
//! ## Steps
//!
//! 1. Reject empty input or output paths before anything is scheduled.
//! 2. Ensure the output directory, read source metadata and fingerprint the
//!    source bytes, concurrently and through the [`Scheduler`], so
//!    overlapping requests share that work.
//! 3. Normalize the options against the source width.
//! 4. For every format and width, derive a content-addressed filename (see
//!    [`naming`](crate::naming)) and run one resize job. A job whose output
//!    file already exists reads that file's dimensions instead of encoding.
//!    Encodes go to a temporary file in the output directory and are renamed
//!    into place when complete, so an existing name is always a whole file.
//!
//! Widths of a format are independent jobs; results are collected in width
//! order regardless of completion order. Any failing job fails the whole
//! request, so partial sets are never returned.
//!
//! With `skip_generation` the pipeline computes names and dimensions only:
//! no directory is created and no codec work happens.

use crate::error::DeriveError;
use crate::hashing::{ContentHasher, DeriveStats, digest_record};
use crate::imaging::{ImageBackend, Quality, ResizeParams, scaled_height};
use crate::naming::{base_name, derivative_filename};
use crate::options::{OptionsKey, ProcessingOptions};
use crate::scheduler::{JobFuture, Operation, Scheduler};
use crate::types::{Derivative, DerivativeResult, DerivativeSet, Format, ImageInfo};
use futures::future::{BoxFuture, FutureExt, try_join_all};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Length of the per-width options digest in filenames.
const WIDTH_HASH_LEN: usize = 8;

/// One logical derivative request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequest {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub options: ProcessingOptions,
}

impl ImageRequest {
    pub fn new(
        input_file: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            input_file: input_file.into(),
            output_dir: output_dir.into(),
            options,
        }
    }

    fn validate(&self) -> Result<(), DeriveError> {
        if self.input_file.as_os_str().is_empty() {
            return Err(DeriveError::InvalidInput("input file is empty".into()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(DeriveError::InvalidInput("output directory is empty".into()));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RequestKey<'a> {
    input_file: &'a Path,
    output_dir: &'a Path,
    options: OptionsKey,
}

/// Request cache key: digest of the paths and the default-filled options.
///
/// Does not touch the source file, so duplicates are caught before any I/O.
pub fn image_request_key(
    hasher: &dyn ContentHasher,
    request: &ImageRequest,
) -> Result<String, DeriveError> {
    request.validate()?;
    let key = RequestKey {
        input_file: &request.input_file,
        output_dir: &request.output_dir,
        options: request.options.key_record(),
    };
    Ok(digest_record(hasher, &key, None)?)
}

/// Per-file options that enter the width segment of a filename.
#[derive(Serialize)]
struct WidthKey {
    width: u32,
    quality: u32,
}

/// Arguments of one resize job; also its memo identity.
#[derive(Serialize)]
struct ResizeJob {
    params: ResizeParams,
    output: PathBuf,
    skip_generation: bool,
}

// ============================================================================
// Scheduler jobs shared by both pipelines
// ============================================================================

/// Create `dir` and its parents. An existing directory counts as success.
pub(crate) fn ensure_dir_job(
    scheduler: &Scheduler,
    dir: &Path,
) -> Result<JobFuture<()>, DeriveError> {
    let dir_owned = dir.to_path_buf();
    scheduler.enqueue(Operation::EnsureDir, dir, move || {
        std::fs::create_dir_all(&dir_owned).map_err(|e| DeriveError::io(&dir_owned, e))
    })
}

pub(crate) fn metadata_job(
    scheduler: &Scheduler,
    backend: &Arc<dyn ImageBackend>,
    path: &Path,
) -> Result<JobFuture<ImageInfo>, DeriveError> {
    let backend = Arc::clone(backend);
    let path_owned = path.to_path_buf();
    scheduler.enqueue(Operation::ReadMetadata, path, move || {
        Ok(backend.metadata(&path_owned)?)
    })
}

pub(crate) fn digest_job(
    scheduler: &Scheduler,
    hasher: &Arc<dyn ContentHasher>,
    path: &Path,
) -> Result<JobFuture<String>, DeriveError> {
    let hasher = Arc::clone(hasher);
    let path_owned = path.to_path_buf();
    scheduler.enqueue(Operation::FileDigest, path, move || {
        hasher
            .file_digest(&path_owned)
            .map_err(|e| DeriveError::io(&path_owned, e))
    })
}

/// Reject sources whose dimensions came back empty.
pub(crate) fn require_dimensions(
    info: ImageInfo,
    source: &Path,
) -> Result<ImageInfo, DeriveError> {
    if info.width == 0 || info.height == 0 {
        return Err(DeriveError::MetadataUnavailable(source.to_path_buf()));
    }
    Ok(info)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Image derivative pipeline. Cheap to clone; clones share the scheduler,
/// codec, hasher and stats.
#[derive(Clone)]
pub struct DerivativePipeline {
    inner: Arc<Inner>,
}

struct Inner {
    scheduler: Arc<Scheduler>,
    backend: Arc<dyn ImageBackend>,
    hasher: Arc<dyn ContentHasher>,
    stats: Arc<DeriveStats>,
}

impl DerivativePipeline {
    pub fn new(
        scheduler: Arc<Scheduler>,
        backend: Arc<dyn ImageBackend>,
        hasher: Arc<dyn ContentHasher>,
        stats: Arc<DeriveStats>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                scheduler,
                backend,
                hasher,
                stats,
            }),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn hasher(&self) -> &dyn ContentHasher {
        self.inner.hasher.as_ref()
    }

    pub fn stats(&self) -> &DeriveStats {
        &self.inner.stats
    }

    /// Produce (or reuse) every derivative for `request`.
    pub async fn generate(&self, request: ImageRequest) -> Result<DerivativeResult, DeriveError> {
        request.validate()?;
        let inner = &self.inner;
        let source = request.input_file.as_path();
        let skip = request.options.skip_generation;

        let ensure_dir = if skip {
            None
        } else {
            Some(ensure_dir_job(&inner.scheduler, &request.output_dir)?)
        };
        let metadata = metadata_job(&inner.scheduler, &inner.backend, source)?;
        let digest = digest_job(&inner.scheduler, &inner.hasher, source)?;

        let (info, fingerprint, _) = futures::try_join!(metadata, digest, async {
            match ensure_dir {
                Some(job) => job.await,
                None => Ok(()),
            }
        })?;
        let info = require_dimensions(info, source)?;

        let options = request.options.normalize(info.width);
        let base = base_name(source)?;
        debug!(
            source = %source.display(),
            widths = ?options.widths,
            formats = ?options.formats,
            "derivative plan"
        );

        let plan = SetPlan {
            source,
            source_info: info,
            output_dir: &request.output_dir,
            base: &base,
            fingerprint: &fingerprint,
            widths: &options.widths,
            quality: options.quality,
            skip_generation: skip,
        };

        let original = self.derivative_set(&plan, info.format)?;
        let alternate_formats: Vec<Format> = options
            .formats
            .iter()
            .copied()
            .filter(|&format| format != info.format)
            .collect();
        let alternates = alternate_formats
            .iter()
            .map(|&format| self.derivative_set(&plan, format))
            .collect::<Result<Vec<_>, _>>()?;

        let (original, alternates) =
            futures::try_join!(original, try_join_all(alternates))?;

        let result = DerivativeResult {
            original,
            alternates: alternates
                .into_iter()
                .map(|set| (set.format, set))
                .collect::<BTreeMap<_, _>>(),
            aspect_ratio: info.aspect_ratio(),
        };
        info!(
            source = %source.display(),
            sets = result.alternates.len() + 1,
            widths = result.original.derivatives.len(),
            "derivatives ready"
        );
        Ok(result)
    }

    /// Schedule every width of one format. Jobs are enqueued immediately; the
    /// returned future collects them in width order.
    fn derivative_set(
        &self,
        plan: &SetPlan<'_>,
        format: Format,
    ) -> Result<BoxFuture<'static, Result<DerivativeSet, DeriveError>>, DeriveError> {
        let jobs = plan
            .widths
            .iter()
            .map(|&width| self.resize_job(plan, format, width))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(async move {
            let derivatives = try_join_all(jobs).await?;
            Ok(DerivativeSet {
                format,
                derivatives,
            })
        }
        .boxed())
    }

    fn resize_job(
        &self,
        plan: &SetPlan<'_>,
        format: Format,
        width: u32,
    ) -> Result<JobFuture<Derivative>, DeriveError> {
        let width_hash = digest_record(
            self.hasher(),
            &WidthKey {
                width,
                quality: plan.quality.value(),
            },
            Some(WIDTH_HASH_LEN),
        )?;
        let filename =
            derivative_filename(plan.base, &width_hash, plan.fingerprint, format.extension())
                .ok_or_else(|| DeriveError::EmptyFilename {
                    source_path: plan.source.to_path_buf(),
                    width,
                })?;

        let source_dims = (plan.source_info.width, plan.source_info.height);
        let job = ResizeJob {
            params: ResizeParams {
                source: plan.source.to_path_buf(),
                width,
                height: Some(scaled_height(source_dims, width)),
                quality: plan.quality,
                format: Some(format),
            },
            output: plan.output_dir.join(filename),
            skip_generation: plan.skip_generation,
        };

        let args = serde_json::to_value(&job)?;
        let inner = Arc::clone(&self.inner);
        self.inner
            .scheduler
            .enqueue(Operation::Resize, &args, move || inner.run_resize(job))
    }
}

impl Inner {
    /// Body of a resize job: reuse the output if it is already on disk,
    /// otherwise encode it.
    fn run_resize(&self, job: ResizeJob) -> Result<Derivative, DeriveError> {
        let ResizeJob {
            params,
            output,
            skip_generation,
        } = job;
        let height = params.height.unwrap_or(1);

        if skip_generation {
            return Ok(Derivative {
                path: output,
                width: params.width,
                height,
            });
        }

        if output.exists() {
            match self.backend.metadata(&output) {
                Ok(existing) => {
                    debug!(output = %output.display(), "reusing derivative");
                    self.stats.reuse();
                    return Ok(Derivative {
                        path: output,
                        width: existing.width,
                        height: existing.height,
                    });
                }
                Err(e) => {
                    warn!(
                        output = %output.display(),
                        error = %e,
                        "unreadable derivative, re-encoding"
                    );
                }
            }
        }

        debug!(output = %output.display(), width = params.width, "encoding derivative");
        let dir = output.parent().unwrap_or_else(|| Path::new("."));
        let partial = NamedTempFile::new_in(dir).map_err(|e| DeriveError::io(dir, e))?;
        let encoded = self.backend.resize_to_file(&params, partial.path())?;
        // Only a complete encode ever appears under the content-addressed name.
        partial
            .persist(&output)
            .map_err(|e| DeriveError::io(&output, e.error))?;
        self.stats.encode();
        Ok(Derivative {
            path: output,
            width: encoded.width,
            height: encoded.height,
        })
    }
}

/// Everything one format's resize jobs share.
struct SetPlan<'a> {
    source: &'a Path,
    source_info: ImageInfo,
    output_dir: &'a Path,
    base: &'a str,
    fingerprint: &'a str,
    widths: &'a [u32],
    quality: Quality,
    skip_generation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::Sha256Hasher;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use futures::executor::block_on;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        backend: Arc<MockBackend>,
        source: PathBuf,
    }

    impl Fixture {
        /// A source file on disk whose dimensions the mock reports.
        fn new(width: u32, height: u32) -> Self {
            let tmp = TempDir::new().unwrap();
            let source = tmp.path().join("dawn.jpg");
            std::fs::write(&source, b"source bytes v1").unwrap();
            let backend = Arc::new(MockBackend::with_source(
                &source,
                width,
                height,
                Format::Jpeg,
            ));
            Self {
                tmp,
                backend,
                source,
            }
        }

        fn output_dir(&self) -> PathBuf {
            self.tmp.path().join("out")
        }

        fn pipeline(&self) -> DerivativePipeline {
            pipeline_with(Arc::clone(&self.backend) as Arc<dyn ImageBackend>)
        }

        fn request(&self, options: ProcessingOptions) -> ImageRequest {
            ImageRequest::new(&self.source, self.output_dir(), options)
        }
    }

    fn pipeline_with(backend: Arc<dyn ImageBackend>) -> DerivativePipeline {
        DerivativePipeline::new(
            Arc::new(Scheduler::new(2).unwrap()),
            backend,
            Arc::new(Sha256Hasher),
            Arc::new(DeriveStats::default()),
        )
    }

    fn all_paths(result: &DerivativeResult) -> Vec<PathBuf> {
        result
            .sets()
            .flat_map(|set| set.derivatives.iter().map(|d| d.path.clone()))
            .collect()
    }

    #[test]
    fn scenario_1920_source_with_defaults() {
        let fx = Fixture::new(1920, 1080);
        let result = block_on(
            fx.pipeline()
                .generate(fx.request(ProcessingOptions::default().with_quality(75))),
        )
        .unwrap();

        assert_eq!(result.original.format, Format::Jpeg);
        assert_eq!(result.original.widths(), vec![480, 1024, 1920]);
        let alternates: Vec<Format> = result.alternates.keys().copied().collect();
        assert_eq!(alternates, vec![Format::Webp, Format::Avif]);
        for set in result.alternates.values() {
            assert_eq!(set.widths(), vec![480, 1024, 1920]);
        }
        assert_eq!(result.aspect_ratio, 1920.0 / 1080.0);
        assert_eq!(fx.backend.resize_count(), 9);
    }

    #[test]
    fn filenames_follow_convention() {
        let fx = Fixture::new(800, 600);
        let options = ProcessingOptions::default()
            .with_widths([400])
            .with_formats([Format::Webp]);
        let result = block_on(fx.pipeline().generate(fx.request(options))).unwrap();

        let fingerprint = crate::hashing::hash_file(&fx.source).unwrap();
        let webp = &result.alternates[&Format::Webp].derivatives[0];
        let name = webp.path.file_name().unwrap().to_string_lossy().into_owned();
        let parts: Vec<&str> = name.split('.').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "dawn");
        assert_eq!(parts[1].len(), WIDTH_HASH_LEN);
        assert_eq!(parts[2], fingerprint);
        assert_eq!(parts[3], "webp");
        assert_eq!(webp.path.parent().unwrap(), fx.output_dir());
    }

    #[test]
    fn second_build_reuses_files_without_encoding() {
        let fx = Fixture::new(1920, 1080);
        let first = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())))
            .unwrap();
        assert_eq!(fx.backend.resize_count(), 9);

        // A fresh pipeline has empty memo maps, like a new build process.
        let second_pipeline = fx.pipeline();
        let second =
            block_on(second_pipeline.generate(fx.request(ProcessingOptions::default()))).unwrap();

        assert_eq!(fx.backend.resize_count(), 9);
        assert_eq!(second_pipeline.stats().reused(), 9);
        assert_eq!(second_pipeline.stats().encoded(), 0);
        assert_eq!(first, second);
    }

    #[test]
    fn repeated_request_in_one_process_runs_jobs_once() {
        let fx = Fixture::new(1024, 768);
        let pipeline = fx.pipeline();
        let options = ProcessingOptions::default().with_formats([Format::Webp]);

        let (a, b) = block_on(async {
            futures::join!(
                pipeline.generate(fx.request(options.clone())),
                pipeline.generate(fx.request(options.clone()))
            )
        });
        assert_eq!(a.unwrap(), b.unwrap());
        // 480 and 1024, in jpeg and webp
        assert_eq!(fx.backend.resize_count(), 4);
        let metadata_reads = fx
            .backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Metadata(p) if Path::new(p) == fx.source))
            .count();
        assert_eq!(metadata_reads, 1);
    }

    #[test]
    fn changed_source_bytes_rename_every_output() {
        let fx = Fixture::new(1200, 800);
        let before = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())))
            .unwrap();

        std::fs::write(&fx.source, b"source bytes v2").unwrap();
        let after = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())))
            .unwrap();

        let before_paths = all_paths(&before);
        for path in all_paths(&after) {
            assert!(!before_paths.contains(&path), "{} was reused", path.display());
        }
    }

    #[test]
    fn quality_changes_filenames() {
        let fx = Fixture::new(1200, 800);
        let pipeline = fx.pipeline();
        let q75 = block_on(pipeline.generate(fx.request(ProcessingOptions::default()))).unwrap();
        let q90 = block_on(
            pipeline.generate(fx.request(ProcessingOptions::default().with_quality(90))),
        )
        .unwrap();
        assert_ne!(all_paths(&q75), all_paths(&q90));
    }

    #[test]
    fn widths_are_ordered_and_capped_by_source() {
        let fx = Fixture::new(2000, 1000);
        let options = ProcessingOptions::default()
            .with_widths([3000, 1024, 480, 1920])
            .with_formats([]);
        let result = block_on(fx.pipeline().generate(fx.request(options))).unwrap();

        assert_eq!(result.original.widths(), vec![480, 1024, 1920, 2000]);
        assert!(result.alternates.is_empty());
        let heights: Vec<u32> = result.original.derivatives.iter().map(|d| d.height).collect();
        assert_eq!(heights, vec![240, 512, 960, 1000]);
    }

    #[test]
    fn aspect_ratio_from_source() {
        let fx = Fixture::new(300, 200);
        let result = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())))
            .unwrap();
        assert_eq!(result.aspect_ratio, 1.5);
        assert_eq!(result.original.widths(), vec![300]);
    }

    #[test]
    fn source_format_is_not_duplicated_as_alternate() {
        let fx = Fixture::new(600, 400);
        fx.backend.add_source(&fx.source, 600, 400, Format::Webp);
        let result = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())))
            .unwrap();
        assert_eq!(result.original.format, Format::Webp);
        let alternates: Vec<Format> = result.alternates.keys().copied().collect();
        assert_eq!(alternates, vec![Format::Avif]);
    }

    #[test]
    fn skip_generation_touches_nothing() {
        let fx = Fixture::new(1920, 1080);
        let options = ProcessingOptions::default().skip_generation(true);
        let result = block_on(fx.pipeline().generate(fx.request(options))).unwrap();

        assert!(!fx.output_dir().exists());
        assert_eq!(fx.backend.resize_count(), 0);
        assert_eq!(result.original.widths(), vec![480, 1024, 1920]);
        assert_eq!(result.original.derivatives[0].height, 270);
    }

    #[test]
    fn empty_input_fails_before_any_job() {
        let fx = Fixture::new(800, 600);
        let pipeline = fx.pipeline();
        let request = ImageRequest::new("", fx.output_dir(), ProcessingOptions::default());

        let result = block_on(pipeline.generate(request));
        assert!(matches!(result, Err(DeriveError::InvalidInput(_))));
        assert_eq!(pipeline.scheduler().jobs_started(), 0);
        assert_eq!(fx.backend.total_calls(), 0);
    }

    #[test]
    fn empty_output_dir_is_invalid() {
        let fx = Fixture::new(800, 600);
        let request = ImageRequest::new(&fx.source, "", ProcessingOptions::default());
        assert!(matches!(
            block_on(fx.pipeline().generate(request)),
            Err(DeriveError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_dimensions_are_metadata_unavailable() {
        let fx = Fixture::new(0, 0);
        let result = block_on(fx.pipeline().generate(fx.request(ProcessingOptions::default())));
        assert!(matches!(result, Err(DeriveError::MetadataUnavailable(_))));
        assert_eq!(fx.backend.resize_count(), 0);
    }

    #[test]
    fn resize_failure_fails_the_request() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"bytes").unwrap();
        let backend = MockBackend {
            fail_resizes: true,
            ..MockBackend::default()
        };
        backend.add_source(&source, 640, 480, Format::Png);

        let pipeline = pipeline_with(Arc::new(backend));
        let request =
            ImageRequest::new(&source, tmp.path().join("out"), ProcessingOptions::default());
        let result = block_on(pipeline.generate(request));
        assert!(matches!(result, Err(DeriveError::Backend(_))));
    }

    #[test]
    fn failed_encode_leaves_nothing_under_the_final_name() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("broken.png");
        std::fs::write(&source, b"bytes").unwrap();
        let out = tmp.path().join("out");
        let options = ProcessingOptions::default()
            .with_widths([640])
            .with_formats([]);

        let failing = MockBackend {
            fail_resizes: true,
            ..MockBackend::default()
        };
        failing.add_source(&source, 640, 480, Format::Png);
        let result = block_on(
            pipeline_with(Arc::new(failing))
                .generate(ImageRequest::new(&source, &out, options.clone())),
        );
        assert!(matches!(result, Err(DeriveError::Backend(_))));
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);

        // The next build encodes again instead of reusing a truncated file.
        let working = Arc::new(MockBackend::with_source(&source, 640, 480, Format::Png));
        let pipeline = pipeline_with(Arc::clone(&working) as Arc<dyn ImageBackend>);
        let result =
            block_on(pipeline.generate(ImageRequest::new(&source, &out, options))).unwrap();
        assert_eq!(working.resize_count(), 1);
        assert_eq!(pipeline.stats().reused(), 0);
        let path = &result.original.derivatives[0].path;
        assert_eq!(path.parent().unwrap(), out);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "mock:640x480:png");
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("missing.jpg");
        let backend = MockBackend::with_source(&source, 640, 480, Format::Jpeg);
        let pipeline = pipeline_with(Arc::new(backend));

        let request =
            ImageRequest::new(&source, tmp.path().join("out"), ProcessingOptions::default());
        assert!(matches!(
            block_on(pipeline.generate(request)),
            Err(DeriveError::Io { .. })
        ));
    }

    #[test]
    fn request_key_is_semantic() {
        let hasher = Sha256Hasher;
        let a = ImageRequest::new(
            "/src/a.jpg",
            "/out",
            ProcessingOptions::default().with_widths([1024, 480]),
        );
        let b = ImageRequest::new(
            "/src/a.jpg",
            "/out",
            ProcessingOptions::default().with_widths([480, 1024]),
        );
        let c = ImageRequest::new(
            "/src/a.jpg",
            "/elsewhere",
            ProcessingOptions::default().with_widths([480, 1024]),
        );
        let fewer_widths = ImageRequest::new(
            "/src/a.jpg",
            "/out",
            ProcessingOptions::default().with_widths([480]),
        );
        let key = |r: &ImageRequest| image_request_key(&hasher, r).unwrap();
        assert_eq!(key(&a), key(&b));
        assert_ne!(key(&b), key(&c));
        assert_ne!(key(&b), key(&fewer_widths));
    }
}
