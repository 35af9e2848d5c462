//! Capability traits for the external acoustic fingerprinter.
//!
//! The fingerprinter is a black box with a start/feed/finish lifecycle.
//! Contexts are cheap to create and single-use per file; dropping one frees
//! whatever the underlying library allocated.

use crate::error::FingerprintError;

/// One fingerprinting session.
///
/// Calls must follow the lifecycle: `start`, any number of `feed`s,
/// `finish`, then `raw_fingerprint`. Implementations may reject calls made
/// out of order.
pub trait Fingerprinter: Send {
    /// Begin a session for mono int16 PCM at the given rate.
    fn start(&mut self, sample_rate: u32, channels: u16) -> Result<(), FingerprintError>;

    /// Feed a block of samples.
    fn feed(&mut self, samples: &[i16]) -> Result<(), FingerprintError>;

    /// Flush internal buffers; no more samples may be fed afterwards.
    fn finish(&mut self) -> Result<(), FingerprintError>;

    /// Read out the raw 32-bit sub-fingerprint sequence.
    fn raw_fingerprint(&self) -> Result<Vec<u32>, FingerprintError>;
}

/// Creates fingerprinter contexts, one per file.
///
/// Factories are shared across worker threads during batch generation, so
/// they must be `Send + Sync`; the contexts they create are used from a
/// single thread each.
pub trait FingerprinterFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Fingerprinter>, FingerprintError>;
}
