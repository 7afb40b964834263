//! Error taxonomy shared by the scheduler, the request cache and both
//! pipelines.
//!
//! Memoized results are handed to every waiter of a key, so errors must be
//! `Clone`. I/O errors are kept behind an `Arc` for that reason.

use crate::imaging::BackendError;
use crate::scheduler::Operation;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DeriveError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Could not determine dimensions of {0}")]
    MetadataUnavailable(PathBuf),
    #[error("Empty derivative filename for {source_path} at {width}px")]
    EmptyFilename { source_path: PathBuf, width: u32 },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Could not canonicalize arguments: {0}")]
    Canonicalize(String),
    #[error("Job {0} ended without a result")]
    JobAborted(Operation),
    #[error("Job {0} was already registered with a different result type")]
    JobTypeMismatch(Operation),
    #[error("URL rewrite returned an empty URL for {0}")]
    EmptyUrl(PathBuf),
    #[error("Scheduler setup failed: {0}")]
    Scheduler(String),
}

impl DeriveError {
    pub fn io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        DeriveError::Io {
            path: path.into(),
            source: Arc::new(err),
        }
    }
}

impl From<serde_json::Error> for DeriveError {
    fn from(err: serde_json::Error) -> Self {
        DeriveError::Canonicalize(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_is_cloneable_and_keeps_path() {
        let err = DeriveError::io(
            "/out/dir",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let cloned = err.clone();
        assert_eq!(cloned.to_string(), "IO error on /out/dir: denied");
    }

    #[test]
    fn job_errors_name_the_operation() {
        let err = DeriveError::JobAborted(Operation::Resize);
        assert_eq!(err.to_string(), "Job resize ended without a result");
    }
}
