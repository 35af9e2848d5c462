//! Fingerprint comparison for audiodup.
//!
//! Two fingerprints of the same recording rarely line up sample-for-sample:
//! re-encodes shift the start, silence padding slides everything over, and
//! lossy codecs flip individual bits. The comparator handles all three by
//! searching for the best alignment offset, then measuring bitwise agreement
//! there.
//!
//! ## The comparison paths
//!
//! - [`FingerprintComparator::compare`] aligns globally (offset histogram +
//!   correlation sweep, then fine-tuning) and reports similarity and bit
//!   error rate at the winning offset.
//! - [`FingerprintComparator::compare_sliding_window`] matches fixed-size
//!   windows independently, for recordings that only partially overlap; it
//!   additionally reports how much of the longer fingerprint the matched
//!   segments cover.
//!
//! Both paths share a cheap Jaccard pre-filter over the 16-bit hash sets so
//! obviously unrelated fingerprints never pay for alignment.

mod alignment;
mod engine;
mod types;

pub use crate::engine::FingerprintComparator;
pub use crate::types::{
    MatchResult, SegmentMatch, DEFAULT_ALIGNMENT_STEP, DEFAULT_BIT_ERROR_THRESHOLD,
    DEFAULT_MAX_ALIGNMENT_OFFSET, DEFAULT_MINIMUM_OVERLAP, DEFAULT_SIMILARITY_THRESHOLD,
};
