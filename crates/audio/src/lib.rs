//! Audio layer for the audiodup pipeline.
//!
//! This crate owns everything that happens to PCM before fingerprinting:
//! the decoder seam, mono downmix and linear resampling, best-effort
//! preprocessing (silence trim, sample-rate normalization, volume
//! normalization), and the trim-aware doubling policy for short tracks.
//!
//! ## What you need to know
//!
//! - Decoding itself is external. Implement [`Decoder`] and [`AudioStream`]
//!   over whatever codec library you use; the rest of the pipeline only sees
//!   interleaved `f32` frames.
//! - Preprocessing is best-effort: a failing stage is logged and skipped,
//!   it never fails the caller. See [`AudioPreprocessor::process`].
//! - All transforms are pure functions of their input. Same samples in,
//!   same samples out.

mod decoder;
mod doubling;
mod frames;
mod preprocess;
mod resample;

pub use crate::decoder::{AudioError, AudioStream, Decoder, StreamInfo};
pub use crate::doubling::{double_in_place, should_double};
pub use crate::frames::AudioFrames;
pub use crate::preprocess::{AudioPreprocessor, PreprocessConfig};
pub use crate::resample::{downmix_mono, resample_linear};
