use audio::AudioError;
use thiserror::Error;

/// Errors produced by the fingerprint generation entry points.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The decoder could not open or read the file. No fingerprint is
    /// produced.
    #[error(transparent)]
    Decoder(#[from] AudioError),
    /// Decoding or preprocessing left no samples to fingerprint.
    #[error("audio contained no samples")]
    EmptyAudio,
    /// The external fingerprinter rejected a start/feed/finish/get call.
    /// Any partial fingerprint is discarded.
    #[error("fingerprinter failure: {0}")]
    Fingerprinter(String),
    /// The fingerprinter produced output that violates the record
    /// invariants (empty, oversized, or inconsistent).
    #[error("generated fingerprint failed validation: {0}")]
    Invalid(String),
    /// A duration cap must be positive.
    #[error("max duration must be positive, got {0}")]
    InvalidDuration(f64),
}
