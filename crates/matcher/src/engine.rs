//! The comparison engine: global alignment compare and sliding-window
//! compare, gated by a hash-set quick filter.

use std::collections::HashSet;

use fingerprint::{hash_of, Fingerprint};

use crate::alignment::{
    bit_error_rate_at_offset, find_best_alignment, overlap_count, similarity_at_offset,
};
use crate::types::{
    MatchResult, SegmentMatch, DEFAULT_ALIGNMENT_STEP, DEFAULT_BIT_ERROR_THRESHOLD,
    DEFAULT_MAX_ALIGNMENT_OFFSET, DEFAULT_MINIMUM_OVERLAP, DEFAULT_SIMILARITY_THRESHOLD,
};

/// Sub-fingerprints per sliding window (~5 s at the fingerprinter's rate).
const WINDOW_SIZE: usize = 60;
/// Position stride when sweeping a window across the other fingerprint.
const WINDOW_SWEEP_STEP: usize = 6;

/// Compares fingerprints and decides duplicate status against configurable
/// thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintComparator {
    similarity_threshold: f64,
    bit_error_threshold: f64,
    minimum_overlap: usize,
    max_alignment_offset: i32,
    alignment_step: i32,
}

impl Default for FingerprintComparator {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            bit_error_threshold: DEFAULT_BIT_ERROR_THRESHOLD,
            minimum_overlap: DEFAULT_MINIMUM_OVERLAP,
            max_alignment_offset: DEFAULT_MAX_ALIGNMENT_OFFSET,
            alignment_step: DEFAULT_ALIGNMENT_STEP,
        }
    }
}

impl FingerprintComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn bit_error_threshold(&self) -> f64 {
        self.bit_error_threshold
    }

    pub fn set_similarity_threshold(&mut self, threshold: f64) {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_bit_error_threshold(&mut self, threshold: f64) {
        self.bit_error_threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn set_minimum_overlap(&mut self, minimum_overlap: usize) {
        self.minimum_overlap = minimum_overlap;
    }

    pub fn set_max_alignment_offset(&mut self, max_offset: i32) {
        self.max_alignment_offset = max_offset.max(0);
    }

    pub fn set_alignment_step(&mut self, step: i32) {
        self.alignment_step = step.max(1);
    }

    /// Global comparison: find the best alignment, measure agreement there.
    pub fn compare(&self, fp1: &Fingerprint, fp2: &Fingerprint) -> MatchResult {
        if fp1.len() < self.minimum_overlap || fp2.len() < self.minimum_overlap {
            return MatchResult::no_match();
        }
        if !self.quick_filter(&fp1.data, &fp2.data) {
            return MatchResult::no_match();
        }

        let best_offset = find_best_alignment(
            &fp1.data,
            &fp2.data,
            self.max_alignment_offset,
            self.alignment_step,
        );

        let similarity = similarity_at_offset(&fp1.data, &fp2.data, best_offset);
        let bit_error_rate = bit_error_rate_at_offset(&fp1.data, &fp2.data, best_offset);
        let matched_segments = overlap_count(fp1.len(), fp2.len(), best_offset);

        let is_duplicate = similarity >= self.similarity_threshold
            && bit_error_rate <= self.bit_error_threshold
            && matched_segments >= self.minimum_overlap;

        MatchResult {
            similarity,
            best_offset,
            matched_segments,
            bit_error_rate,
            is_duplicate,
            coverage_ratio: 0.0,
            segment_matches: Vec::new(),
        }
    }

    /// Segment-wise comparison for partially overlapping recordings.
    ///
    /// Windows are matched independently at distinct alignment offsets;
    /// duplicate status additionally requires at least three accepted
    /// segments covering half of the longer fingerprint.
    pub fn compare_sliding_window(&self, fp1: &Fingerprint, fp2: &Fingerprint) -> MatchResult {
        if fp1.len() < self.minimum_overlap || fp2.len() < self.minimum_overlap {
            return MatchResult::no_match();
        }
        if !self.quick_filter(&fp1.data, &fp2.data) {
            return MatchResult::no_match();
        }

        let segment_matches = self.find_segment_matches(&fp1.data, &fp2.data, WINDOW_SIZE);
        if segment_matches.is_empty() {
            return MatchResult::no_match();
        }

        // Weighted mean with the similarity itself as the weight, so strong
        // segments dominate.
        let mut total_similarity = 0.0;
        let mut total_weight = 0.0;
        for segment in &segment_matches {
            total_similarity += segment.similarity * segment.similarity;
            total_weight += segment.similarity;
        }
        let similarity = if total_weight > 0.0 {
            total_similarity / total_weight
        } else {
            0.0
        };

        let best_offset = segment_matches[0].offset;
        let bit_error_rate = bit_error_rate_at_offset(&fp1.data, &fp2.data, best_offset);

        let max_length = fp1.len().max(fp2.len());
        let covered = (segment_matches.len() * WINDOW_SIZE).min(max_length);
        let coverage_ratio = covered as f64 / max_length as f64;

        let matched_segments = segment_matches.len();
        let is_duplicate = similarity >= self.similarity_threshold
            && bit_error_rate <= self.bit_error_threshold
            && coverage_ratio >= 0.5
            && matched_segments >= 3;

        MatchResult {
            similarity,
            best_offset,
            matched_segments,
            bit_error_rate,
            is_duplicate,
            coverage_ratio,
            segment_matches,
        }
    }

    /// Jaccard similarity of the deduplicated 16-bit hash sets must reach
    /// 60% of the similarity threshold before alignment is attempted.
    fn quick_filter(&self, fp1: &[u32], fp2: &[u32]) -> bool {
        if fp1.is_empty() || fp2.is_empty() {
            return false;
        }

        let set1: HashSet<u16> = fp1.iter().map(|&v| hash_of(v)).collect();
        let set2: HashSet<u16> = fp2.iter().map(|&v| hash_of(v)).collect();

        let intersection = set1.intersection(&set2).count();
        let union = set1.len() + set2.len() - intersection;
        let jaccard = if union > 0 {
            intersection as f64 / union as f64
        } else {
            0.0
        };

        jaccard >= self.similarity_threshold * 0.6
    }

    fn find_segment_matches(
        &self,
        fp1: &[u32],
        fp2: &[u32],
        window_size: usize,
    ) -> Vec<SegmentMatch> {
        if fp1.len() < window_size || fp2.len() < window_size {
            return Vec::new();
        }

        let acceptance_floor = self.similarity_threshold * 0.8;
        let mut matches = Vec::new();

        let mut i = 0;
        while i + window_size <= fp1.len() {
            let window1 = &fp1[i..i + window_size];
            let mut best_similarity = 0.0;
            let mut best_offset = 0i32;

            let mut j = 0;
            while j + window_size <= fp2.len() {
                let window2 = &fp2[j..j + window_size];
                let similarity = similarity_at_offset(window1, window2, 0);
                if similarity > best_similarity && similarity >= acceptance_floor {
                    best_similarity = similarity;
                    best_offset = j as i32 - i as i32;
                }
                j += WINDOW_SWEEP_STEP;
            }

            if best_similarity >= acceptance_floor {
                matches.push(SegmentMatch {
                    offset: best_offset,
                    similarity: best_similarity,
                });
            }
            i += window_size / 2;
        }

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Greedy suppression: keep the strongest match at each distinct
        // alignment, dropping anything within half a window of a kept one.
        let mut filtered: Vec<SegmentMatch> = Vec::new();
        for candidate in matches {
            let overlaps = filtered
                .iter()
                .any(|kept| (candidate.offset - kept.offset).abs() < (window_size / 2) as i32);
            if !overlaps {
                filtered.push(candidate);
            }
        }

        filtered
    }
}
