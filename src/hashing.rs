//! Content hashing for cache keys and derivative filenames.
//!
//! Two kinds of digest drive incremental builds:
//!
//! - **File digest** (content fingerprint): SHA-256 of the source file bytes.
//!   Content-based rather than mtime-based so it survives `git checkout`
//!   (which resets modification times). It goes into every derivative
//!   filename, so changing a source's bytes renames all of its outputs.
//!
//! - **Options digest**: SHA-256 of a canonical JSON rendering of an options
//!   record. `serde_json::Value` keeps object keys sorted, so two records with
//!   the same fields hash the same regardless of construction order. Used for
//!   request cache keys and, truncated, for the per-width filename segment.
//!
//! [`DeriveStats`] counts how many derivatives a process reused from disk
//! versus encoded from scratch.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Computes stable digests of files and option records.
pub trait ContentHasher: Send + Sync {
    /// Digest of a file's bytes, as lowercase hex.
    fn file_digest(&self, path: &Path) -> io::Result<String>;

    /// Digest of an options record, as lowercase hex, optionally truncated to
    /// `truncate` characters.
    fn options_digest(&self, record: &serde_json::Value, truncate: Option<usize>) -> String;
}

/// SHA-256 implementation of [`ContentHasher`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn file_digest(&self, path: &Path) -> io::Result<String> {
        hash_file(path)
    }

    fn options_digest(&self, record: &serde_json::Value, truncate: Option<usize>) -> String {
        let digest = format!("{:x}", Sha256::digest(record.to_string().as_bytes()));
        match truncate {
            Some(len) if len < digest.len() => digest[..len].to_string(),
            _ => digest,
        }
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Digest any serializable record through `hasher`.
pub fn digest_record<T: Serialize>(
    hasher: &dyn ContentHasher,
    record: &T,
    truncate: Option<usize>,
) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(record)?;
    Ok(hasher.options_digest(&value, truncate))
}

/// Summary of derivative reuse for a process lifetime.
///
/// Updated from scheduler worker threads, hence the atomics.
#[derive(Debug, Default)]
pub struct DeriveStats {
    reused: AtomicU32,
    encoded: AtomicU32,
}

impl DeriveStats {
    pub fn reuse(&self) {
        self.reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn encode(&self) {
        self.encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reused(&self) -> u32 {
        self.reused.load(Ordering::Relaxed)
    }

    pub fn encoded(&self) -> u32 {
        self.encoded.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.reused() + self.encoded()
    }
}

impl fmt::Display for DeriveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reused() > 0 {
            write!(
                f,
                "{} reused, {} encoded ({} total)",
                self.reused(),
                self.encoded(),
                self.total()
            )
        } else {
            write!(f, "{} encoded", self.encoded())
        }
    }
}
