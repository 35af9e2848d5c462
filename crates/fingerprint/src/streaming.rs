//! Bounded-memory streaming fingerprint generation.
//!
//! The loader reads one PCM chunk at a time, downmixes and resamples it,
//! and feeds the fingerprinter incrementally. Peak memory is one chunk plus
//! the transient per-chunk scratch buffers, independent of file length.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use audio::{downmix_mono, resample_linear, Decoder};

use crate::error::FingerprintError;
use crate::fingerprinter::FingerprinterFactory;
use crate::{Fingerprint, FINGERPRINT_SAMPLE_RATE};

/// Default PCM chunk size: 1 MiB.
pub const DEFAULT_CHUNK_BYTES: usize = 1024 * 1024;

const MIN_CHUNK_BYTES: usize = 4 * 1024;
const MAX_CHUNK_BYTES: usize = 16 * 1024 * 1024;

/// Observed stats for the most recent streaming run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Raw PCM bytes pulled from the decoder.
    pub total_bytes_processed: u64,
    /// Largest combined size of the chunk buffer and per-chunk scratch.
    pub peak_buffer_bytes: usize,
    /// Wall time for the run, in seconds.
    pub processing_time_secs: f64,
}

/// Per-chunk progress hook: `(bytes_processed, bytes_expected, fraction)`.
pub type ProgressCallback<'a> = &'a (dyn Fn(u64, u64, f64) + Send + Sync);

/// Streams files through the decoder into the fingerprinter.
///
/// The loader is shared across threads during batch generation; decoder and
/// fingerprinter factory are held behind `Arc` and each file gets its own
/// fingerprinter context.
pub struct StreamingLoader {
    decoder: Arc<dyn Decoder>,
    fingerprinters: Arc<dyn FingerprinterFactory>,
    chunk_bytes: usize,
    last_stats: Mutex<IngestStats>,
}

impl StreamingLoader {
    pub fn new(decoder: Arc<dyn Decoder>, fingerprinters: Arc<dyn FingerprinterFactory>) -> Self {
        Self {
            decoder,
            fingerprinters,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            last_stats: Mutex::new(IngestStats::default()),
        }
    }

    /// Override the chunk size. Values are clamped to `[4 KiB, 16 MiB]` and
    /// rounded up to a 4 KiB multiple.
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = clamp_chunk_bytes(chunk_bytes);
        self
    }

    pub fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    /// Stats recorded by the most recent successful run.
    pub fn last_stats(&self) -> IngestStats {
        self.last_stats.lock().unwrap().clone()
    }

    /// Fingerprint a whole file.
    pub fn generate(&self, path: impl Into<PathBuf>) -> Result<Fingerprint, FingerprintError> {
        self.generate_with_progress(path, None, None)
    }

    /// Fingerprint at most the first `max_duration_secs` of a file.
    pub fn generate_limited(
        &self,
        path: impl Into<PathBuf>,
        max_duration_secs: f64,
    ) -> Result<Fingerprint, FingerprintError> {
        if !(max_duration_secs > 0.0) {
            return Err(FingerprintError::InvalidDuration(max_duration_secs));
        }
        self.generate_with_progress(path, Some(max_duration_secs), None)
    }

    /// Full-control entry point with an optional duration cap and progress
    /// callback.
    pub fn generate_with_progress(
        &self,
        path: impl Into<PathBuf>,
        max_duration_secs: Option<f64>,
        progress: Option<ProgressCallback<'_>>,
    ) -> Result<Fingerprint, FingerprintError> {
        let path = path.into();
        let start = Instant::now();
        match self.process_stream(&path, max_duration_secs, progress, start) {
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

    /// Fingerprint many files across the rayon pool.
    ///
    /// Each file fails or succeeds on its own; one bad file never aborts the
    /// batch. Results are in input order.
    pub fn generate_batch(
        &self,
        paths: &[PathBuf],
        max_duration_secs: Option<f64>,
    ) -> Vec<Result<Fingerprint, FingerprintError>> {
        paths
            .par_iter()
            .map(|path| self.generate_with_progress(path.clone(), max_duration_secs, None))
            .collect()
    }

    fn process_stream(
        &self,
        path: &Path,
        max_duration_secs: Option<f64>,
        progress: Option<ProgressCallback<'_>>,
        start: Instant,
    ) -> Result<Fingerprint, FingerprintError> {
        let mut stream = self.decoder.open(path)?;
        let stream_info = stream.info();
        let sample_rate = stream_info.sample_rate;
        let channels = stream_info.channels.max(1) as usize;

        let max_frames = match max_duration_secs {
            Some(secs) => stream_info
                .total_frames
                .min((secs * sample_rate as f64) as u64),
            None => stream_info.total_frames,
        };

        let mut fingerprinter = self.fingerprinters.create()?;
        fingerprinter.start(FINGERPRINT_SAMPLE_RATE, 1)?;

        let chunk_frames = (self.chunk_bytes / (channels * std::mem::size_of::<f32>())).max(1);
        let mut pcm = vec![0.0f32; chunk_frames * channels];

        let mut frames_processed: u64 = 0;
        let mut total_bytes: u64 = 0;
        let mut peak_buffer = pcm.len() * std::mem::size_of::<f32>();
        let expected_bytes = max_frames * channels as u64 * std::mem::size_of::<f32>() as u64;

        while frames_processed < max_frames {
            let frames_to_read = chunk_frames.min((max_frames - frames_processed) as usize);
            let frames_read = stream.read(&mut pcm[..frames_to_read * channels])?;
            if frames_read == 0 {
                break;
            }

            let interleaved = &pcm[..frames_read * channels];
            let mono = downmix_mono(interleaved, channels as u16);
            let mut scratch_bytes = mono.len() * std::mem::size_of::<f32>();

            let resampled = if sample_rate != FINGERPRINT_SAMPLE_RATE {
                let resampled = resample_linear(&mono, sample_rate, FINGERPRINT_SAMPLE_RATE);
                scratch_bytes += resampled.len() * std::mem::size_of::<f32>();
                resampled
            } else {
                mono
            };

            let int16: Vec<i16> = resampled
                .iter()
                .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                .collect();
            scratch_bytes += int16.len() * std::mem::size_of::<i16>();

            fingerprinter.feed(&int16)?;

            frames_processed += frames_read as u64;
            total_bytes += (frames_read * channels * std::mem::size_of::<f32>()) as u64;
            peak_buffer = peak_buffer.max(pcm.len() * std::mem::size_of::<f32>() + scratch_bytes);

            if let Some(callback) = progress {
                let fraction = if max_frames > 0 {
                    frames_processed as f64 / max_frames as f64
                } else {
                    1.0
                };
                callback(total_bytes, expected_bytes, fraction);
            }
        }

        if frames_processed == 0 {
            return Err(FingerprintError::EmptyAudio);
        }

        fingerprinter.finish()?;
        let data = fingerprinter.raw_fingerprint()?;

        let fingerprint = Fingerprint {
            data,
            sample_rate: FINGERPRINT_SAMPLE_RATE,
            duration: frames_processed as f64 / sample_rate as f64,
            file_path: path.to_path_buf(),
        };
        if !fingerprint.is_valid() {
            return Err(FingerprintError::Invalid(format!(
                "{} sub-fingerprints from {:.2}s of audio",
                fingerprint.len(),
                fingerprint.duration
            )));
        }

        *self.last_stats.lock().unwrap() = IngestStats {
            total_bytes_processed: total_bytes,
            peak_buffer_bytes: peak_buffer,
            processing_time_secs: start.elapsed().as_secs_f64(),
        };

        Ok(fingerprint)
    }
}

fn clamp_chunk_bytes(bytes: usize) -> usize {
    let clamped = bytes.clamp(MIN_CHUNK_BYTES, MAX_CHUNK_BYTES);
    (clamped + 4095) & !4095
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use audio::{AudioError, AudioStream, StreamInfo};

    use crate::fingerprinter::Fingerprinter;

    struct TestDecoder {
        sample_rate: u32,
        channels: u16,
        samples: Vec<f32>,
    }

    impl Decoder for TestDecoder {
        fn open(&self, _path: &Path) -> Result<Box<dyn AudioStream>, AudioError> {
            Ok(Box::new(TestStream {
                info: StreamInfo {
                    sample_rate: self.sample_rate,
                    channels: self.channels,
                    total_frames: (self.samples.len() / self.channels as usize) as u64,
                },
                samples: self.samples.clone(),
                cursor: 0,
            }))
        }
    }

    struct TestStream {
        info: StreamInfo,
        samples: Vec<f32>,
        cursor: usize,
    }

    impl AudioStream for TestStream {
        fn info(&self) -> StreamInfo {
            self.info
        }

        fn read(&mut self, buf: &mut [f32]) -> Result<usize, AudioError> {
            let channels = self.info.channels as usize;
            let want = buf.len() / channels * channels;
            let available = self.samples.len() - self.cursor;
            let take = want.min(available) / channels * channels;
            buf[..take].copy_from_slice(&self.samples[self.cursor..self.cursor + take]);
            self.cursor += take;
            Ok(take / channels)
        }
    }

    /// Deterministic stand-in fingerprinter: one sub-fingerprint per block
    /// of 256 samples, derived from the block contents.
    #[derive(Default)]
    struct BlockFingerprinter {
        samples: Vec<i16>,
        finished: bool,
    }

    impl Fingerprinter for BlockFingerprinter {
        fn start(&mut self, _sample_rate: u32, _channels: u16) -> Result<(), FingerprintError> {
            self.samples.clear();
            self.finished = false;
            Ok(())
        }

        fn feed(&mut self, samples: &[i16]) -> Result<(), FingerprintError> {
            if self.finished {
                return Err(FingerprintError::Fingerprinter("feed after finish".into()));
            }
            self.samples.extend_from_slice(samples);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), FingerprintError> {
            self.finished = true;
            Ok(())
        }

        fn raw_fingerprint(&self) -> Result<Vec<u32>, FingerprintError> {
            Ok(self
                .samples
                .chunks(256)
                .map(|block| {
                    block.iter().fold(0x811c_9dc5u32, |h, &s| {
                        h.wrapping_mul(31).wrapping_add(s as u16 as u32)
                    })
                })
                .collect())
        }
    }

    struct BlockFactory;

    impl FingerprinterFactory for BlockFactory {
        fn create(&self) -> Result<Box<dyn Fingerprinter>, FingerprintError> {
            Ok(Box::<BlockFingerprinter>::default())
        }
    }

    fn tone(frames: usize, channels: usize) -> Vec<f32> {
        (0..frames * channels)
            .map(|i| ((i / channels) as f32 * 0.05).sin() * 0.5)
            .collect()
    }

    fn loader(sample_rate: u32, channels: u16, samples: Vec<f32>) -> StreamingLoader {
        StreamingLoader::new(
            Arc::new(TestDecoder {
                sample_rate,
                channels,
                samples,
            }),
            Arc::new(BlockFactory),
        )
    }

    #[test]
    fn chunk_bytes_are_clamped_and_rounded() {
        let decoder = Arc::new(TestDecoder {
            sample_rate: 11025,
            channels: 1,
            samples: vec![],
        });
        let tiny = StreamingLoader::new(decoder.clone(), Arc::new(BlockFactory)).with_chunk_bytes(1);
        assert_eq!(tiny.chunk_bytes(), 4096);

        let huge = StreamingLoader::new(decoder.clone(), Arc::new(BlockFactory))
            .with_chunk_bytes(64 * 1024 * 1024);
        assert_eq!(huge.chunk_bytes(), 16 * 1024 * 1024);

        let odd = StreamingLoader::new(decoder, Arc::new(BlockFactory)).with_chunk_bytes(5000);
        assert_eq!(odd.chunk_bytes(), 8192);
    }

    #[test]
    fn chunking_does_not_change_the_fingerprint() {
        let samples = tone(44100, 1);
        let small = loader(11025, 1, samples.clone()).with_chunk_bytes(4096);
        let large = loader(11025, 1, samples).with_chunk_bytes(MAX_CHUNK_BYTES);

        let fp_small = small.generate("/a.wav").unwrap();
        let fp_large = large.generate("/a.wav").unwrap();
        assert_eq!(fp_small.data, fp_large.data);
    }

    #[test]
    fn duration_reflects_processed_frames() {
        let fp = loader(11025, 1, tone(22050, 1)).generate("/two-secs.wav").unwrap();
        assert!((fp.duration - 2.0).abs() < 1e-9);
        assert_eq!(fp.sample_rate, FINGERPRINT_SAMPLE_RATE);
        assert_eq!(fp.file_path, PathBuf::from("/two-secs.wav"));
    }

    #[test]
    fn duration_cap_limits_processing() {
        let loader = loader(11025, 1, tone(110250, 1));
        let fp = loader.generate_limited("/ten-secs.wav", 2.0).unwrap();
        assert!((fp.duration - 2.0).abs() < 0.01);

        let stats = loader.last_stats();
        assert_eq!(stats.total_bytes_processed, 2 * 11025 * 4);
    }

    #[test]
    fn non_positive_duration_cap_is_rejected() {
        let loader = loader(11025, 1, tone(11025, 1));
        assert!(matches!(
            loader.generate_limited("/a.wav", 0.0),
            Err(FingerprintError::InvalidDuration(_))
        ));
        assert!(matches!(
            loader.generate_limited("/a.wav", -1.0),
            Err(FingerprintError::InvalidDuration(_))
        ));
    }

    #[test]
    fn empty_stream_is_an_error() {
        let loader = loader(44100, 2, vec![]);
        assert!(matches!(
            loader.generate("/empty.wav"),
            Err(FingerprintError::EmptyAudio)
        ));
    }

    #[test]
    fn stereo_input_matches_predownmixed_mono() {
        let mono = tone(22050, 1);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();

        let fp_mono = loader(11025, 1, mono).generate("/m.wav").unwrap();
        let fp_stereo = loader(11025, 2, stereo).generate("/s.wav").unwrap();
        assert_eq!(fp_mono.data, fp_stereo.data);
    }

    #[test]
    fn stats_are_recorded_on_success() {
        let loader = loader(44100, 2, tone(44100, 2));
        loader.generate("/stats.wav").unwrap();

        let stats = loader.last_stats();
        assert_eq!(stats.total_bytes_processed, 44100 * 2 * 4);
        assert!(stats.peak_buffer_bytes >= loader.chunk_bytes());
        assert!(stats.processing_time_secs >= 0.0);
    }

    #[test]
    fn progress_callback_sees_monotonic_fractions() {
        let loader = loader(11025, 1, tone(44100, 1)).with_chunk_bytes(4096);
        let calls = AtomicUsize::new(0);
        let last_fraction = Mutex::new(0.0f64);

        let callback = |_bytes: u64, _expected: u64, fraction: f64| {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut last = last_fraction.lock().unwrap();
            assert!(fraction >= *last);
            *last = fraction;
        };
        loader
            .generate_with_progress("/p.wav", None, Some(&callback))
            .unwrap();

        assert!(calls.load(Ordering::SeqCst) > 1);
        assert!((*last_fraction.lock().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn batch_reports_per_file_results_in_order() {
        struct HalfFailingDecoder;

        impl Decoder for HalfFailingDecoder {
            fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>, AudioError> {
                if path.to_string_lossy().contains("bad") {
                    return Err(AudioError::Open {
                        path: path.to_path_buf(),
                        reason: "no such file".into(),
                    });
                }
                TestDecoder {
                    sample_rate: 11025,
                    channels: 1,
                    samples: tone(22050, 1),
                }
                .open(path)
            }
        }

        let loader = StreamingLoader::new(Arc::new(HalfFailingDecoder), Arc::new(BlockFactory));
        let paths = vec![
            PathBuf::from("/ok-1.wav"),
            PathBuf::from("/bad.wav"),
            PathBuf::from("/ok-2.wav"),
        ];
        let results = loader.generate_batch(&paths, None);

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(FingerprintError::Decoder(AudioError::Open { .. }))
        ));
        assert!(results[2].is_ok());
    }
}
