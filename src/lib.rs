//! # Simple Srcset
//!
//! Responsive image derivatives and blurred placeholders for static site
//! builds. Hand it a source image and it writes resized copies at several
//! widths, in the source's own encoding plus alternate encodings, and returns
//! the `srcset`, aspect ratio and placeholder attributes a page needs.
//!
//! # Architecture: Requests, Jobs, Codec
//!
//! ```text
//! Generator::generate_attributes(src)
//!   ├─ RequestCache ─→ DerivativePipeline ──┐
//!   └─ RequestCache ─→ PlaceholderPipeline ─┴─→ Scheduler ─→ ImageBackend
//!                           ↓
//!                     attributes::assemble
//! ```
//!
//! Work is deduplicated at two levels:
//!
//! - **Requests**: overlapping calls for the same image and options share one
//!   in-flight computation, keyed by a digest of the normalized request. Unset
//!   options and options spelled out at their default value hash the same.
//! - **Jobs**: every filesystem or codec operation goes through the
//!   [`scheduler::Scheduler`], memoized by operation and canonical arguments.
//!   Both pipelines read a source's metadata through the same job.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generate`] | Request surface: attributes for one `src` |
//! | [`derivatives`] | Width/format plan, resize jobs, reuse of existing files |
//! | [`placeholder`] | Inline blurred SVG data URIs and materialized previews |
//! | [`attributes`] | Pure assembly of srcsets and placeholder attributes |
//! | [`request_cache`] | Request-level memoization of in-flight results |
//! | [`scheduler`] | Bounded worker pool with job memoization |
//! | [`options`] | Option defaults, cache-key normalization, width policy |
//! | [`naming`] | Derivative filename convention |
//! | [`hashing`] | Content fingerprints, option digests, reuse statistics |
//! | [`imaging`] | Codec seam and the pure Rust backend |
//! | [`config`] | `simple-srcset.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//! | [`types`] | Values shared between stages |
//!
//! # Design Decisions
//!
//! ## Content-Addressed Filenames
//!
//! A derivative is named `<base>.<width hash>.<source fingerprint>.<ext>`.
//! The width hash covers width and quality, the fingerprint is a SHA-256 of
//! the source bytes. A file that already exists under its name is therefore
//! the right file, and is reused without re-encoding. Editing a source
//! renames all of its derivatives, which makes them safe to serve with
//! far-future cache headers.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for decoding, Lanczos3
//! resampling and encoding. No system libraries are needed; the codec sits
//! behind the [`imaging::ImageBackend`] trait so tests run against a mock.

pub mod attributes;
pub mod config;
pub mod derivatives;
pub mod error;
pub mod generate;
pub mod hashing;
pub mod imaging;
pub mod naming;
pub mod options;
pub mod output;
pub mod placeholder;
pub mod request_cache;
pub mod scheduler;
pub mod types;
