use serde::{Deserialize, Serialize};

/// A block of decoded PCM audio.
///
/// Samples are interleaved floats in `[-1, 1]`. `original_duration` is the
/// duration of the audio as it came out of the decoder, before any trimming
/// or resampling; the doubling policy compares it against the current
/// duration to tell how aggressively silence was removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFrames {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub original_duration: f64,
}

impl AudioFrames {
    /// Build a mono frame block, recording the given duration as original.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        let original_duration = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            channels: 1,
            original_duration,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Current duration in seconds, derived from the sample count.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
