//! Inverted fingerprint index and duplicate-group discovery.
//!
//! Files are stored append-only; each gets a stable [`FileId`]. Every
//! sub-fingerprint's low 16 bits become a posting `(file_id, position)` in
//! an inverted map, so candidate duplicates can be found by counting shared
//! hashes instead of comparing against the whole collection.
//!
//! ## Concurrency
//!
//! The postings map sits behind a `RwLock`: writers (`add_file`,
//! `add_files_batch`) are exclusive, candidate searches share the read
//! side. The file store has its own `RwLock` and boxes entries in `Arc`, so
//! a handle obtained under the read lock stays valid while the store grows.
//! Threshold setters take `&mut self` and are meant for configuration
//! before the index is shared.
//!
//! ## Group discovery
//!
//! [`FingerprintIndex::find_all_duplicates`] walks files in id order,
//! pulling candidates from the postings and confirming them with the full
//! comparator; [`FingerprintIndex::find_all_duplicates_parallel`] runs the
//! same procedure across a rayon pool.

mod groups;
mod types;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;

use fingerprint::Fingerprint;
use matcher::FingerprintComparator;

pub use crate::types::{DuplicateGroup, FileEntry, FileId, IndexError, IndexStats, Posting};

/// Shared 16-bit hashes with a candidate required before the comparator is
/// consulted.
pub const DEFAULT_HASH_THRESHOLD: usize = 5;

/// Hash-indexed fingerprint collection.
pub struct FingerprintIndex {
    files: RwLock<Vec<Arc<FileEntry>>>,
    hash_index: RwLock<HashMap<u16, Vec<Posting>>>,
    comparator: FingerprintComparator,
    hash_threshold: usize,
}

impl Default for FingerprintIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            hash_index: RwLock::new(HashMap::new()),
            comparator: FingerprintComparator::new(),
            hash_threshold: DEFAULT_HASH_THRESHOLD,
        }
    }

    /// Add one file. Returns its id; ids are assigned in call order.
    pub fn add_file(
        &self,
        path: impl Into<PathBuf>,
        fingerprint: Fingerprint,
    ) -> Result<FileId, IndexError> {
        let path = path.into();
        validate_fingerprint(&path, &fingerprint)?;

        let mut files = self.files.write().unwrap();
        let mut hash_index = self.hash_index.write().unwrap();

        let file_id = files.len();
        insert_postings(&mut hash_index, file_id, &fingerprint);
        files.push(Arc::new(FileEntry { path, fingerprint }));

        Ok(file_id)
    }

    /// Add many files under one lock acquisition. Ids follow input order.
    ///
    /// The whole batch is validated up front; an invalid fingerprint leaves
    /// the index untouched.
    pub fn add_files_batch(
        &self,
        entries: Vec<(PathBuf, Fingerprint)>,
    ) -> Result<Vec<FileId>, IndexError> {
        for (path, fingerprint) in &entries {
            validate_fingerprint(path, fingerprint)?;
        }

        let mut files = self.files.write().unwrap();
        let mut hash_index = self.hash_index.write().unwrap();

        let mut file_ids = Vec::with_capacity(entries.len());
        for (path, fingerprint) in entries {
            let file_id = files.len();
            insert_postings(&mut hash_index, file_id, &fingerprint);
            files.push(Arc::new(FileEntry { path, fingerprint }));
            file_ids.push(file_id);
        }

        Ok(file_ids)
    }

    /// Files sharing at least `hash_threshold` 16-bit hashes with the
    /// query, ordered by shared-hash count descending.
    ///
    /// The query file itself is not filtered out; callers comparing a file
    /// against the index skip its own id.
    pub fn find_candidates(&self, fingerprint: &Fingerprint) -> Vec<FileId> {
        let hash_index = self.hash_index.read().unwrap();

        let mut counts: HashMap<FileId, usize> = HashMap::new();
        for hash in fingerprint.hashes() {
            if let Some(postings) = hash_index.get(&hash) {
                for posting in postings {
                    *counts.entry(posting.file_id).or_insert(0) += 1;
                }
            }
        }

        let mut candidates: Vec<FileId> = counts
            .iter()
            .filter(|&(_, &count)| count >= self.hash_threshold)
            .map(|(&file_id, _)| file_id)
            .collect();
        candidates.sort_unstable_by(|a, b| counts[b].cmp(&counts[a]).then(a.cmp(b)));
        candidates
    }

    /// Candidate lookup for an already-indexed file. Unknown ids yield an
    /// empty list.
    pub fn find_candidates_by_id(&self, file_id: FileId) -> Vec<FileId> {
        let entry = match self.get_file(file_id) {
            Some(entry) => entry,
            None => return Vec::new(),
        };
        self.find_candidates(&entry.fingerprint)
    }

    /// Fetch a stable handle to an indexed file.
    pub fn get_file(&self, file_id: FileId) -> Option<Arc<FileEntry>> {
        self.files.read().unwrap().get(file_id).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.read().unwrap().len()
    }

    pub fn stats(&self) -> IndexStats {
        let files = self.files.read().unwrap();
        let hash_index = self.hash_index.read().unwrap();
        IndexStats {
            file_count: files.len(),
            hash_buckets: hash_index.len(),
            postings: hash_index.values().map(Vec::len).sum(),
        }
    }

    /// Drop every file and posting.
    pub fn clear(&self) {
        let mut files = self.files.write().unwrap();
        let mut hash_index = self.hash_index.write().unwrap();
        files.clear();
        hash_index.clear();
    }

    pub fn comparator(&self) -> &FingerprintComparator {
        &self.comparator
    }

    pub fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    pub fn set_hash_threshold(&mut self, threshold: usize) {
        self.hash_threshold = threshold;
    }

    pub fn set_similarity_threshold(&mut self, threshold: f64) {
        self.comparator.set_similarity_threshold(threshold);
    }

    pub fn set_bit_error_threshold(&mut self, threshold: f64) {
        self.comparator.set_bit_error_threshold(threshold);
    }

    pub fn set_max_alignment_offset(&mut self, max_offset: i32) {
        self.comparator.set_max_alignment_offset(max_offset);
    }

    pub fn set_alignment_step(&mut self, step: i32) {
        self.comparator.set_alignment_step(step);
    }

    /// Snapshot of the file store for lock-free iteration.
    pub(crate) fn snapshot(&self) -> Vec<Arc<FileEntry>> {
        self.files.read().unwrap().clone()
    }
}

fn validate_fingerprint(path: &Path, fingerprint: &Fingerprint) -> Result<(), IndexError> {
    if fingerprint.is_empty() {
        return Err(IndexError::InvalidFingerprint {
            path: path.to_path_buf(),
            reason: "empty fingerprint".into(),
        });
    }
    Ok(())
}

fn insert_postings(
    hash_index: &mut HashMap<u16, Vec<Posting>>,
    file_id: FileId,
    fingerprint: &Fingerprint,
) {
    for (position, hash) in fingerprint.hashes().into_iter().enumerate() {
        hash_index
            .entry(hash)
            .or_default()
            .push(Posting { file_id, position });
    }
}
