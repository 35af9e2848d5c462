//! Capability traits for the external audio decoder.
//!
//! Decoding is a black box to this workspace. A [`Decoder`] opens a file and
//! hands back an [`AudioStream`] that yields interleaved `f32` frames in
//! `[-1, 1]`. Dropping the stream closes it.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by decoder implementations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The file could not be opened or is not a recognized audio format.
    #[error("failed to open audio file {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    /// A read from an open stream failed.
    #[error("failed to read audio data: {0}")]
    Read(String),
    /// The stream reported parameters the pipeline cannot work with.
    #[error("unsupported audio parameters: {0}")]
    Unsupported(String),
}

/// Static properties of an opened audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    /// Native sample rate in Hz. Always positive.
    pub sample_rate: u32,
    /// Interleaved channel count. Always at least 1.
    pub channels: u16,
    /// Total frames in the file, as reported by the container.
    pub total_frames: u64,
}

impl StreamInfo {
    /// Duration of the full stream in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 / self.sample_rate as f64
    }
}

/// Opens audio files. Implementations wrap a concrete codec library.
pub trait Decoder: Send + Sync {
    /// Open `path` for decoding.
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>, AudioError>;
}

/// A single open decode session.
///
/// `read` fills `buf` with up to `buf.len() / channels` interleaved frames
/// and returns the number of whole frames written. A return of zero frames
/// signals end of stream.
pub trait AudioStream: Send {
    fn info(&self) -> StreamInfo;

    fn read(&mut self, buf: &mut [f32]) -> Result<usize, AudioError>;
}
