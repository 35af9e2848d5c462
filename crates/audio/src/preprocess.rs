//! Best-effort PCM preprocessing: silence trim, sample-rate normalization,
//! volume normalization.
//!
//! The pipeline runs the three stages in a fixed order and each stage
//! replaces the working audio. A stage that fails is logged and skipped, so
//! [`AudioPreprocessor::process`] always hands something usable back to the
//! caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::frames::AudioFrames;
use crate::resample::resample_linear;

/// Configuration for the preprocessing pipeline and the doubling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Remove leading and trailing silence.
    pub trim_silence: bool,
    /// Energy (dB) below which a 10 ms chunk counts as silent.
    pub silence_threshold_db: f32,
    /// Silence retained on each side of the non-silent region, in ms.
    pub preserve_padding_ms: u32,

    /// Resample to `target_sample_rate` when the input rate differs.
    pub normalize_sample_rate: bool,
    pub target_sample_rate: u32,

    /// Scale samples toward a target level.
    pub normalize_volume: bool,
    pub target_peak_db: f32,
    /// Normalize by RMS instead of peak.
    pub use_rms_normalization: bool,
    pub target_rms_db: f32,
    /// Below this level the signal is considered too quiet to amplify.
    pub noise_floor_db: f32,

    /// Skip doubling when trimming removed most of the track. See
    /// [`crate::doubling::should_double`].
    pub disable_doubling_after_trim: bool,
    /// Trimmed/original ratio under which a track counts as heavily trimmed.
    pub doubling_threshold_ratio: f64,
    /// Minimum original duration (seconds) a heavily trimmed track must have
    /// for doubling to still apply.
    pub min_duration_for_doubling: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            trim_silence: true,
            silence_threshold_db: -55.0,
            preserve_padding_ms: 100,
            normalize_sample_rate: true,
            target_sample_rate: 44100,
            normalize_volume: true,
            target_peak_db: -3.0,
            use_rms_normalization: true,
            target_rms_db: -20.0,
            noise_floor_db: -60.0,
            disable_doubling_after_trim: true,
            doubling_threshold_ratio: 0.5,
            min_duration_for_doubling: 1.5,
        }
    }
}

#[derive(Debug, Error)]
enum StageError {
    #[error("sample rate must be positive")]
    InvalidRate,
    #[error("target sample rate must be positive")]
    InvalidTargetRate,
}

/// Runs the trim → resample → volume pipeline over decoded audio.
pub struct AudioPreprocessor {
    config: PreprocessConfig,
}

impl AudioPreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Apply every enabled stage in order.
    ///
    /// Stage failures are logged with `warn!` and the prior stage's output
    /// carries forward unchanged; this function never fails.
    pub fn process(&self, input: &AudioFrames) -> AudioFrames {
        let mut current = input.clone();

        if self.config.trim_silence {
            match self.trim_silence(&current) {
                Ok(trimmed) => current = trimmed,
                Err(err) => warn!(stage = "trim_silence", error = %err, "preprocess_stage_failed"),
            }
        }

        if self.config.normalize_sample_rate && current.sample_rate != self.config.target_sample_rate
        {
            match self.normalize_sample_rate(&current) {
                Ok(resampled) => current = resampled,
                Err(err) => {
                    warn!(stage = "normalize_sample_rate", error = %err, "preprocess_stage_failed")
                }
            }
        }

        if self.config.normalize_volume {
            match self.normalize_volume(&current) {
                Ok(normalized) => current = normalized,
                Err(err) => {
                    warn!(stage = "normalize_volume", error = %err, "preprocess_stage_failed")
                }
            }
        }

        current
    }

    /// Remove leading and trailing silence, keeping `preserve_padding_ms` of
    /// quiet on each side. Pure silence collapses to padding worth of zeros.
    fn trim_silence(&self, input: &AudioFrames) -> Result<AudioFrames, StageError> {
        if input.is_empty() {
            return Ok(input.clone());
        }
        if input.sample_rate == 0 {
            return Err(StageError::InvalidRate);
        }

        let first = self.find_first_non_silent(&input.samples, input.sample_rate);
        let last = self.find_last_non_silent(&input.samples, input.sample_rate);

        let padding =
            (self.config.preserve_padding_ms as u64 * input.sample_rate as u64 / 1000) as usize;

        let (first, last) = match (first, last) {
            (Some(first), Some(last)) => (first, last),
            // Entirely silent: keep a padding-sized stretch of zeros.
            _ => {
                let keep = padding.min(input.samples.len());
                return Ok(AudioFrames {
                    samples: vec![0.0; keep],
                    sample_rate: input.sample_rate,
                    channels: input.channels,
                    original_duration: input.original_duration,
                });
            }
        };

        let start = first.saturating_sub(padding);
        let end = (last + padding).min(input.samples.len() - 1);

        Ok(AudioFrames {
            samples: input.samples[start..=end].to_vec(),
            sample_rate: input.sample_rate,
            channels: input.channels,
            original_duration: input.original_duration,
        })
    }

    fn normalize_sample_rate(&self, input: &AudioFrames) -> Result<AudioFrames, StageError> {
        if self.config.target_sample_rate == 0 {
            return Err(StageError::InvalidTargetRate);
        }
        if input.sample_rate == self.config.target_sample_rate {
            return Ok(input.clone());
        }

        let samples = resample_linear(
            &input.samples,
            input.sample_rate,
            self.config.target_sample_rate,
        );
        Ok(AudioFrames {
            samples,
            sample_rate: self.config.target_sample_rate,
            channels: input.channels,
            original_duration: input.original_duration,
        })
    }

    /// Scale toward the configured RMS or peak target, clamping the gain to
    /// `[0.1, 10.0]` and clipping the result to `[-1, 1]`.
    fn normalize_volume(&self, input: &AudioFrames) -> Result<AudioFrames, StageError> {
        if input.is_empty() {
            return Ok(input.clone());
        }

        let (current_level, target_level) = if self.config.use_rms_normalization {
            (rms(&input.samples), db_to_linear(self.config.target_rms_db))
        } else {
            (peak(&input.samples), db_to_linear(self.config.target_peak_db))
        };

        let gain = if current_level < db_to_linear(self.config.noise_floor_db) {
            // Too quiet to be signal; a tiny gain avoids amplifying noise.
            db_to_linear(-20.0)
        } else {
            (target_level / current_level).clamp(0.1, 10.0)
        };

        let samples = input
            .samples
            .iter()
            .map(|&s| (s * gain).clamp(-1.0, 1.0))
            .collect();

        Ok(AudioFrames {
            samples,
            sample_rate: input.sample_rate,
            channels: input.channels,
            original_duration: input.original_duration,
        })
    }

    fn is_silent(&self, chunk: &[f32]) -> bool {
        linear_to_db(mean_square(chunk)) < self.config.silence_threshold_db
    }

    fn find_first_non_silent(&self, samples: &[f32], sample_rate: u32) -> Option<usize> {
        let chunk = chunk_size(sample_rate);
        let mut i = 0;
        while i < samples.len() {
            let count = chunk.min(samples.len() - i);
            if !self.is_silent(&samples[i..i + count]) {
                return Some(i);
            }
            i += chunk;
        }
        None
    }

    fn find_last_non_silent(&self, samples: &[f32], sample_rate: u32) -> Option<usize> {
        let chunk = chunk_size(sample_rate);
        if samples.len() < chunk {
            return None;
        }
        let mut i = samples.len() - chunk;
        loop {
            let count = chunk.min(samples.len() - i);
            if !self.is_silent(&samples[i..i + count]) {
                return Some(i + count - 1);
            }
            if i < chunk {
                break;
            }
            i -= chunk;
        }
        None
    }
}

/// 10 ms worth of samples, never less than one.
fn chunk_size(sample_rate: u32) -> usize {
    ((sample_rate / 100) as usize).max(1)
}

fn mean_square(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32
}

fn rms(samples: &[f32]) -> f32 {
    mean_square(samples).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

pub(crate) fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

pub(crate) fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -100.0
    } else {
        20.0 * linear.log10()
    }
}
