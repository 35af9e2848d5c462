//! Full-buffer fingerprint generation with preprocessing and doubling.
//!
//! Unlike the streaming path, this loads the whole file so the preprocessor
//! can see the complete waveform (silence trimming needs both ends). Short
//! results are doubled according to the trim-aware policy before being fed
//! to the fingerprinter.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use audio::{
    double_in_place, downmix_mono, resample_linear, should_double, AudioFrames, AudioPreprocessor,
    Decoder, PreprocessConfig,
};

use crate::error::FingerprintError;
use crate::fingerprinter::FingerprinterFactory;
use crate::streaming::DEFAULT_CHUNK_BYTES;
use crate::{Fingerprint, FINGERPRINT_SAMPLE_RATE, MIN_FINGERPRINT_DURATION_SECS};

/// Decode a whole file to mono PCM at its native rate.
pub fn load_audio(decoder: &dyn Decoder, path: &Path) -> Result<AudioFrames, FingerprintError> {
    let mut stream = decoder.open(path)?;
    let info = stream.info();
    let channels = info.channels.max(1) as usize;

    let chunk_frames = (DEFAULT_CHUNK_BYTES / (channels * std::mem::size_of::<f32>())).max(1);
    let mut chunk = vec![0.0f32; chunk_frames * channels];
    let mut interleaved = Vec::new();

    loop {
        let frames_read = stream.read(&mut chunk)?;
        if frames_read == 0 {
            break;
        }
        interleaved.extend_from_slice(&chunk[..frames_read * channels]);
    }

    let samples = downmix_mono(&interleaved, info.channels);
    Ok(AudioFrames::mono(samples, info.sample_rate))
}

/// Decode, preprocess, apply the doubling policy, and fingerprint one file.
///
/// The returned fingerprint's `duration` is the processed, pre-doubling
/// duration.
pub fn generate_with_preprocessing(
    decoder: &dyn Decoder,
    fingerprinters: &dyn FingerprinterFactory,
    path: &Path,
    config: &PreprocessConfig,
) -> Result<Fingerprint, FingerprintError> {
    let start = Instant::now();
    match generate_inner(decoder, fingerprinters, path, config) {
        Ok(fp) => {
            info!(
                path = %path.display(),
                fingerprint_len = fp.len(),
                duration_secs = fp.duration,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "fingerprint_success"
            );
            Ok(fp)
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "fingerprint_failure"
            );
            Err(err)
        }
    }
}

fn generate_inner(
    decoder: &dyn Decoder,
    fingerprinters: &dyn FingerprinterFactory,
    path: &Path,
    config: &PreprocessConfig,
) -> Result<Fingerprint, FingerprintError> {
    let frames = load_audio(decoder, path)?;
    if frames.is_empty() {
        return Err(FingerprintError::EmptyAudio);
    }

    let processed = AudioPreprocessor::new(config.clone()).process(&frames);

    let mut samples = if processed.sample_rate != FINGERPRINT_SAMPLE_RATE {
        resample_linear(
            &processed.samples,
            processed.sample_rate,
            FINGERPRINT_SAMPLE_RATE,
        )
    } else {
        processed.samples
    };
    if samples.is_empty() {
        return Err(FingerprintError::EmptyAudio);
    }

    let processed_duration = samples.len() as f64 / FINGERPRINT_SAMPLE_RATE as f64;

    if processed_duration < MIN_FINGERPRINT_DURATION_SECS
        && should_double(processed_duration, processed.original_duration, config)
    {
        double_in_place(&mut samples);
    }

    let int16: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect();

    let mut fingerprinter = fingerprinters.create()?;
    fingerprinter.start(FINGERPRINT_SAMPLE_RATE, 1)?;
    fingerprinter.feed(&int16)?;
    fingerprinter.finish()?;
    let data = fingerprinter.raw_fingerprint()?;

    let fingerprint = Fingerprint {
        data,
        sample_rate: FINGERPRINT_SAMPLE_RATE,
        duration: processed_duration,
        file_path: path.to_path_buf(),
    };
    if !fingerprint.is_valid() {
        return Err(FingerprintError::Invalid(format!(
            "{} sub-fingerprints from {:.2}s of audio",
            fingerprint.len(),
            fingerprint.duration
        )));
    }

    Ok(fingerprint)
}
