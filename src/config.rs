//! Aggregated configuration for a duplicate-detection run.
//!
//! [`ScanConfig`] bundles every stage's knobs into one serde-friendly
//! struct so deployments can load a single config file, validate it at
//! startup, and build the loader and index from it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::sync::Arc;

use audio::{Decoder, PreprocessConfig};
use fingerprint::{FingerprinterFactory, StreamingLoader, DEFAULT_CHUNK_BYTES};
use index::{FingerprintIndex, DEFAULT_HASH_THRESHOLD};
use matcher::{
    FingerprintComparator, DEFAULT_ALIGNMENT_STEP, DEFAULT_BIT_ERROR_THRESHOLD,
    DEFAULT_MAX_ALIGNMENT_OFFSET, DEFAULT_MINIMUM_OVERLAP, DEFAULT_SIMILARITY_THRESHOLD,
};

/// Errors raised by [`ScanConfig::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("similarity_threshold must be within [0, 1], got {0}")]
    SimilarityThreshold(f64),
    #[error("bit_error_threshold must be within [0, 1], got {0}")]
    BitErrorThreshold(f64),
    #[error("minimum_overlap must be at least 1")]
    MinimumOverlap,
    #[error("max_alignment_offset must be non-negative, got {0}")]
    MaxAlignmentOffset(i32),
    #[error("alignment_step must be at least 1, got {0}")]
    AlignmentStep(i32),
    #[error("hash_threshold must be at least 1")]
    HashThreshold,
    #[error("max_duration_secs must be positive, got {0}")]
    MaxDuration(f64),
}

/// Every knob for one scan, in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Streaming PCM chunk size in bytes; clamped by the loader.
    pub chunk_bytes: usize,
    /// Optional per-file duration cap in seconds.
    pub max_duration_secs: Option<f64>,
    /// Preprocessing applied by the full-buffer generation path.
    pub preprocess: PreprocessConfig,

    pub similarity_threshold: f64,
    pub bit_error_threshold: f64,
    pub minimum_overlap: usize,
    pub max_alignment_offset: i32,
    pub alignment_step: i32,
    pub hash_threshold: usize,

    /// Worker count for parallel group discovery; zero means the rayon
    /// default.
    pub discovery_threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            max_duration_secs: None,
            preprocess: PreprocessConfig::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            bit_error_threshold: DEFAULT_BIT_ERROR_THRESHOLD,
            minimum_overlap: DEFAULT_MINIMUM_OVERLAP,
            max_alignment_offset: DEFAULT_MAX_ALIGNMENT_OFFSET,
            alignment_step: DEFAULT_ALIGNMENT_STEP,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            discovery_threads: 0,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes;
        self
    }

    pub fn with_max_duration_secs(mut self, secs: f64) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }

    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_hash_threshold(mut self, threshold: usize) -> Self {
        self.hash_threshold = threshold;
        self
    }

    /// Check every field against its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::SimilarityThreshold(self.similarity_threshold));
        }
        if !(0.0..=1.0).contains(&self.bit_error_threshold) {
            return Err(ConfigError::BitErrorThreshold(self.bit_error_threshold));
        }
        if self.minimum_overlap == 0 {
            return Err(ConfigError::MinimumOverlap);
        }
        if self.max_alignment_offset < 0 {
            return Err(ConfigError::MaxAlignmentOffset(self.max_alignment_offset));
        }
        if self.alignment_step < 1 {
            return Err(ConfigError::AlignmentStep(self.alignment_step));
        }
        if self.hash_threshold == 0 {
            return Err(ConfigError::HashThreshold);
        }
        if let Some(secs) = self.max_duration_secs {
            if !(secs > 0.0) {
                return Err(ConfigError::MaxDuration(secs));
            }
        }
        Ok(())
    }

    /// Build a streaming loader over the given seams.
    pub fn build_loader(
        &self,
        decoder: Arc<dyn Decoder>,
        fingerprinters: Arc<dyn FingerprinterFactory>,
    ) -> StreamingLoader {
        StreamingLoader::new(decoder, fingerprinters).with_chunk_bytes(self.chunk_bytes)
    }

    /// Build a comparator with this config's thresholds.
    pub fn build_comparator(&self) -> FingerprintComparator {
        let mut comparator = FingerprintComparator::new();
        comparator.set_similarity_threshold(self.similarity_threshold);
        comparator.set_bit_error_threshold(self.bit_error_threshold);
        comparator.set_minimum_overlap(self.minimum_overlap);
        comparator.set_max_alignment_offset(self.max_alignment_offset);
        comparator.set_alignment_step(self.alignment_step);
        comparator
    }

    /// Build an index with this config's thresholds.
    pub fn build_index(&self) -> FingerprintIndex {
        let mut index = FingerprintIndex::new();
        index.set_similarity_threshold(self.similarity_threshold);
        index.set_bit_error_threshold(self.bit_error_threshold);
        index.set_max_alignment_offset(self.max_alignment_offset);
        index.set_alignment_step(self.alignment_step);
        index.set_hash_threshold(self.hash_threshold);
        index
    }
}
