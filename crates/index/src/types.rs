use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fingerprint::Fingerprint;

/// Position of a file in the index's append-only store. Stable for the
/// lifetime of the index; never reused.
pub type FileId = usize;

/// An indexed file and its fingerprint.
///
/// Entries are immutable once stored, so handles to them can outlive any
/// lock on the store itself.
#[derive(Debug)]
pub struct FileEntry {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

/// One occurrence of a 16-bit hash: which file, and where in its
/// fingerprint sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub file_id: FileId,
    pub position: usize,
}

/// A set of mutually duplicate files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Members, sorted ascending. Always at least two.
    pub file_ids: Vec<FileId>,
    /// Mean similarity over all member pairs.
    pub avg_similarity: f64,
}

/// Size counters for an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub file_count: usize,
    /// Distinct 16-bit hashes with at least one posting.
    pub hash_buckets: usize,
    /// Total postings across all buckets.
    pub postings: usize,
}

/// Errors produced by index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The fingerprint fails the record invariants (typically: empty).
    #[error("invalid fingerprint for {path}: {reason}")]
    InvalidFingerprint { path: PathBuf, reason: String },
}
