//! Workspace umbrella crate for audiodup.
//!
//! The `audiodup` crate re-exports the audio, fingerprint, matcher, and
//! index layers so applications can drive the full duplicate-detection
//! pipeline through a single dependency, and adds the whole-collection
//! [`scan_paths`] helper on top.
//!
//! ## Quick start
//!
//! Supply implementations of the two external seams (a [`Decoder`] over
//! your codec library and a [`FingerprinterFactory`] over your acoustic
//! fingerprinter), then stream a collection into an index and ask it for
//! duplicate groups:
//!
//! ```ignore
//! use std::sync::Arc;
//! use audiodup::{scan_paths, FingerprintIndex, ScanConfig, StreamingLoader};
//!
//! let config = ScanConfig::default();
//! config.validate()?;
//!
//! let loader = config.build_loader(Arc::new(MyDecoder), Arc::new(MyFingerprinters));
//! let index = config.build_index();
//!
//! let outcome = scan_paths(&loader, &index, &paths)?;
//! for failure in &outcome.failures {
//!     eprintln!("skipped {}: {}", failure.path.display(), failure.error);
//! }
//!
//! for group in index.find_all_duplicates_parallel(config.discovery_threads) {
//!     println!("{:?} ({:.2})", group.file_ids, group.avg_similarity);
//! }
//! ```
//!
//! ## Errors
//!
//! Per-file fingerprinting failures never abort a scan; they are collected
//! in [`ScanOutcome::failures`]. Failures that invalidate the whole
//! operation (an index rejection) converge on [`ScanError`].

pub use audio::{
    double_in_place, downmix_mono, resample_linear, should_double, AudioError, AudioFrames,
    AudioPreprocessor, AudioStream, Decoder, PreprocessConfig, StreamInfo,
};
pub use fingerprint::{
    generate_with_preprocessing, hash_of, Fingerprint, FingerprintError, Fingerprinter,
    FingerprinterFactory, IngestStats, ProgressCallback, StreamingLoader, DEFAULT_CHUNK_BYTES,
    FINGERPRINT_SAMPLE_RATE, MAX_FINGERPRINT_LEN, MIN_FINGERPRINT_DURATION_SECS,
};
pub use index::{
    DuplicateGroup, FileEntry, FileId, FingerprintIndex, IndexError, IndexStats, Posting,
    DEFAULT_HASH_THRESHOLD,
};
pub use matcher::{
    FingerprintComparator, MatchResult, SegmentMatch, DEFAULT_ALIGNMENT_STEP,
    DEFAULT_BIT_ERROR_THRESHOLD, DEFAULT_MAX_ALIGNMENT_OFFSET, DEFAULT_MINIMUM_OVERLAP,
    DEFAULT_SIMILARITY_THRESHOLD,
};

pub mod config;

pub use crate::config::{ConfigError, ScanConfig};

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors that can abort a whole-collection scan.
#[derive(Debug)]
pub enum ScanError {
    Fingerprint(FingerprintError),
    Index(IndexError),
    Config(ConfigError),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Fingerprint(err) => write!(f, "fingerprint generation failed: {err}"),
            ScanError::Index(err) => write!(f, "index rejected a file: {err}"),
            ScanError::Config(err) => write!(f, "invalid scan config: {err}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScanError::Fingerprint(err) => Some(err),
            ScanError::Index(err) => Some(err),
            ScanError::Config(err) => Some(err),
        }
    }
}

impl From<FingerprintError> for ScanError {
    fn from(value: FingerprintError) -> Self {
        ScanError::Fingerprint(value)
    }
}

impl From<IndexError> for ScanError {
    fn from(value: IndexError) -> Self {
        ScanError::Index(value)
    }
}

impl From<ConfigError> for ScanError {
    fn from(value: ConfigError) -> Self {
        ScanError::Config(value)
    }
}

/// One file that failed to fingerprint during a scan.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: FingerprintError,
}

/// Result of scanning a collection into an index.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Successfully indexed files with their assigned ids, in input order.
    pub added: Vec<(FileId, PathBuf)>,
    /// Files skipped because fingerprinting failed.
    pub failures: Vec<ScanFailure>,
}

/// Serializable summary of a scan, for logging or reporting layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub indexed: usize,
    pub failed: usize,
}

impl ScanOutcome {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            indexed: self.added.len(),
            failed: self.failures.len(),
        }
    }
}

/// Fingerprint every path in parallel and index the successes.
///
/// Individual files that cannot be decoded or fingerprinted are reported in
/// the outcome rather than failing the scan. File ids are assigned in input
/// order over the successful subset.
pub fn scan_paths(
    loader: &StreamingLoader,
    index: &FingerprintIndex,
    paths: &[PathBuf],
) -> Result<ScanOutcome, ScanError> {
    let results = loader.generate_batch(paths, None);

    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(fingerprint) => successes.push((path.clone(), fingerprint)),
            Err(error) => failures.push(ScanFailure {
                path: path.clone(),
                error,
            }),
        }
    }

    let paths_added: Vec<PathBuf> = successes.iter().map(|(path, _)| path.clone()).collect();
    let file_ids = index.add_files_batch(successes)?;

    let outcome = ScanOutcome {
        added: file_ids.into_iter().zip(paths_added).collect(),
        failures,
    };
    info!(
        indexed = outcome.added.len(),
        failed = outcome.failures.len(),
        "scan_complete"
    );
    Ok(outcome)
}
