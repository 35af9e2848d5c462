//! Shared fakes for the integration suites: an in-memory decoder and a
//! deterministic block-hash fingerprinter standing in for the external
//! collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use audiodup::{
    AudioError, AudioStream, Decoder, Fingerprint, FingerprintError, Fingerprinter,
    FingerprinterFactory, StreamInfo, StreamingLoader, FINGERPRINT_SAMPLE_RATE,
};

/// One decodable "file" held in memory.
#[derive(Clone)]
pub struct Track {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

/// Decoder over a fixed map of paths.
#[derive(Default)]
pub struct MemoryDecoder {
    tracks: HashMap<PathBuf, Track>,
}

impl MemoryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, track: Track) {
        self.tracks.insert(path.into(), track);
    }
}

impl Decoder for MemoryDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioStream>, AudioError> {
        let track = self.tracks.get(path).ok_or_else(|| AudioError::Open {
            path: path.to_path_buf(),
            reason: "no such track".into(),
        })?;
        Ok(Box::new(MemoryStream {
            info: StreamInfo {
                sample_rate: track.sample_rate,
                channels: track.channels,
                total_frames: (track.samples.len() / track.channels as usize) as u64,
            },
            samples: track.samples.clone(),
            cursor: 0,
        }))
    }
}

struct MemoryStream {
    info: StreamInfo,
    samples: Vec<f32>,
    cursor: usize,
}

impl AudioStream for MemoryStream {
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

/// Content-hashing fingerprinter: one sub-fingerprint per 256-sample block.
/// Same PCM in, same fingerprint out.
#[derive(Default)]
pub struct BlockFingerprinter {
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

pub struct BlockFactory;

impl FingerprinterFactory for BlockFactory {
    fn create(&self) -> Result<Box<dyn Fingerprinter>, FingerprintError> {
        Ok(Box::<BlockFingerprinter>::default())
    }
}

/// A deterministic mono tone at the fingerprinter's native rate.
pub fn tone(secs: f64, amplitude: f32, phase_step: f32) -> Track {
    let n = (secs * FINGERPRINT_SAMPLE_RATE as f64) as usize;
    Track {
        sample_rate: FINGERPRINT_SAMPLE_RATE,
        channels: 1,
        samples: (0..n)
            .map(|i| amplitude * (i as f32 * phase_step).sin())
            .collect(),
    }
}

pub fn loader_for(decoder: MemoryDecoder) -> StreamingLoader {
    StreamingLoader::new(Arc::new(decoder), Arc::new(BlockFactory))
}

/// Synthetic fingerprint for index-level tests.
pub fn synthetic_fingerprint(data: Vec<u32>, path: &str) -> Fingerprint {
    Fingerprint {
        data,
        sample_rate: FINGERPRINT_SAMPLE_RATE,
        duration: 10.0,
        file_path: path.into(),
    }
}

/// Deterministic pseudo-random sub-fingerprints with well-spread hashes.
pub fn patterned(len: usize, seed: u32) -> Vec<u32> {
    (0..len as u32)
        .map(|i| {
            let x = i
                .wrapping_add(seed.wrapping_mul(0x0101_0101))
                .wrapping_mul(0x9E37_79B9);
            x ^ (x >> 15)
        })
        .collect()
}
