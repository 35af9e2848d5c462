//! Trim-aware doubling policy for short tracks.
//!
//! Fingerprinters need a few seconds of audio to emit a stable fingerprint;
//! tracks below that floor are concatenated with themselves once. When
//! silence trimming removed most of a track, doubling the leftover fragment
//! would fingerprint a loop of noise instead of music, so the policy can
//! require the *original* recording to have been long enough.

use crate::preprocess::PreprocessConfig;

/// Decide whether a track that fell below the fingerprinter's minimum
/// duration should be doubled.
///
/// Callers apply the minimum-duration gate first; this function only weighs
/// the trimming evidence:
///
/// - with `disable_doubling_after_trim` off, always double;
/// - otherwise, if `processed / original` is at or above
///   `doubling_threshold_ratio` the trim was mild and doubling is safe;
/// - a heavily trimmed track is doubled only when its original duration
///   reaches `min_duration_for_doubling`.
pub fn should_double(
    processed_duration: f64,
    original_duration: f64,
    config: &PreprocessConfig,
) -> bool {
    if !config.disable_doubling_after_trim {
        return true;
    }
    if original_duration <= 0.0 {
        return false;
    }

    let ratio = processed_duration / original_duration;
    if ratio < config.doubling_threshold_ratio {
        original_duration >= config.min_duration_for_doubling
    } else {
        true
    }
}

/// Concatenate the sample sequence with itself once.
pub fn double_in_place(samples: &mut Vec<f32>) {
    let len = samples.len();
    samples.reserve(len);
    samples.extend_from_within(..len);
}
