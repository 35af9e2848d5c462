//! Fingerprint records and generation for the audiodup pipeline.
//!
//! A fingerprint is a sequence of 32-bit sub-fingerprints emitted by an
//! external acoustic fingerprinter fed with mono int16 PCM at
//! [`FINGERPRINT_SAMPLE_RATE`]. This crate owns the record type, the
//! capability traits for the fingerprinter, and the two generation paths:
//!
//! - [`StreamingLoader`] decodes in bounded-memory chunks and feeds the
//!   fingerprinter incrementally; peak memory stays flat no matter how long
//!   the file is.
//! - [`generate_with_preprocessing`] decodes the whole file, runs the
//!   preprocessing pipeline, applies the doubling policy for short tracks,
//!   and fingerprints the result.
//!
//! Batch workloads go through [`StreamingLoader::generate_batch`], which
//! fans out across a rayon pool and reports per-file failures alongside
//! successes.

mod error;
mod fingerprinter;
mod generate;
mod streaming;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::error::FingerprintError;
pub use crate::fingerprinter::{Fingerprinter, FingerprinterFactory};
pub use crate::generate::{generate_with_preprocessing, load_audio};
pub use crate::streaming::{IngestStats, ProgressCallback, StreamingLoader, DEFAULT_CHUNK_BYTES};

/// Sample rate the fingerprinter consumes, in Hz.
pub const FINGERPRINT_SAMPLE_RATE: u32 = 11025;

/// Tracks shorter than this (seconds) are doubled before fingerprinting.
pub const MIN_FINGERPRINT_DURATION_SECS: f64 = 3.0;

/// Upper bound on sub-fingerprint count for a fingerprint to be valid.
pub const MAX_FINGERPRINT_LEN: usize = 100_000;

/// Low 16 bits of a sub-fingerprint, the key used by the hash index and the
/// comparator's quick filter.
#[inline]
pub fn hash_of(sub_fingerprint: u32) -> u16 {
    (sub_fingerprint & 0xFFFF) as u16
}

/// A perceptual fingerprint of one audio file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Raw 32-bit sub-fingerprints, one per ~0.12 s of audio.
    pub data: Vec<u32>,
    /// Sample rate the fingerprinter ran at; always
    /// [`FINGERPRINT_SAMPLE_RATE`] for fingerprints produced here.
    pub sample_rate: u32,
    /// Effective audio duration in seconds. For doubled tracks this is the
    /// pre-doubling processed duration.
    pub duration: f64,
    /// File the fingerprint was computed from.
    pub file_path: PathBuf,
}

impl Fingerprint {
    /// Whether the record satisfies the structural invariants: non-empty,
    /// bounded size, positive rate and duration.
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
            && self.data.len() <= MAX_FINGERPRINT_LEN
            && self.sample_rate > 0
            && self.duration > 0.0
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 16-bit hashes of every sub-fingerprint, in sequence order.
    ///
    /// Duplicates are kept; positions matter to the index and repeats carry
    /// weight in candidate counting.
    pub fn hashes(&self) -> Vec<u16> {
        self.data.iter().map(|&v| hash_of(v)).collect()
    }
}
