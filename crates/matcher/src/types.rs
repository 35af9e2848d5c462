use serde::{Deserialize, Serialize};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_BIT_ERROR_THRESHOLD: f64 = 0.15;
pub const DEFAULT_MINIMUM_OVERLAP: usize = 10;
pub const DEFAULT_MAX_ALIGNMENT_OFFSET: i32 = 360;
pub const DEFAULT_ALIGNMENT_STEP: i32 = 6;

/// One accepted sliding-window match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMatch {
    /// Offset of the window in fp2 relative to its position in fp1.
    pub offset: i32,
    /// Window-local bit similarity.
    pub similarity: f64,
}

/// Outcome of comparing two fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Fraction of matching bits at `best_offset`, in `[0, 1]`.
    pub similarity: f64,
    /// Winning alignment offset in sub-fingerprint units.
    pub best_offset: i32,
    /// Global path: overlapping positions at `best_offset`. Sliding-window
    /// path: number of accepted window matches.
    pub matched_segments: usize,
    /// Fraction of differing bits at `best_offset`, in `[0, 1]`.
    pub bit_error_rate: f64,
    pub is_duplicate: bool,
    /// Sliding-window path only: fraction of the longer fingerprint covered
    /// by accepted matches.
    pub coverage_ratio: f64,
    /// Sliding-window path only: the accepted matches, best first.
    pub segment_matches: Vec<SegmentMatch>,
}

impl MatchResult {
    /// The result reported when fingerprints are too short, the quick
    /// filter rejects, or no overlap exists.
    pub fn no_match() -> Self {
        Self {
            similarity: 0.0,
            best_offset: 0,
            matched_segments: 0,
            bit_error_rate: 1.0,
            is_duplicate: false,
            coverage_ratio: 0.0,
            segment_matches: Vec::new(),
        }
    }
}

impl Default for MatchResult {
    fn default() -> Self {
        Self::no_match()
    }
}
