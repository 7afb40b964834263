//! Codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: read metadata, resize into a file, and resize into memory.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked into the binary.

use super::params::{EncodedImage, ResizeParams};
use crate::types::{Derivative, ImageInfo};
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Codec failure. Cloneable so a memoized failure can be handed to every
/// waiter of the same job.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(Arc<io::Error>),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<io::Error> for BackendError {
    fn from(err: io::Error) -> Self {
        BackendError::Io(Arc::new(err))
    }
}

/// Trait for codec backends.
///
/// Implementations are called from scheduler worker threads, hence
/// `Send + Sync`. Each call owns its own file handles; no pixel buffers are
/// shared between calls.
pub trait ImageBackend: Send + Sync {
    /// Read width, height and encoding of an image file.
    fn metadata(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Resize and encode `params.source` into `output`.
    fn resize_to_file(
        &self,
        params: &ResizeParams,
        output: &Path,
    ) -> Result<Derivative, BackendError>;

    /// Resize and encode `params.source` into memory.
    fn resize_to_buffer(&self, params: &ResizeParams) -> Result<EncodedImage, BackendError>;
}
