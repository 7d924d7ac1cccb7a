use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::AnechoicSource;
use crate::error::{Error, Result};

/// Uniform white noise in [-gain, gain). Seeded, so runs are repeatable.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: ChaCha8Rng,
    gain: f32,
}

impl NoiseSource {
    pub fn new(seed: u64, gain: f32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            gain,
        }
    }
}

impl AnechoicSource for NoiseSource {
    fn tick(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.gain * self.rng.random_range(-1.0_f32..1.0);
        }
    }
}

/// Plays a mono buffer over and over.
#[derive(Debug, Clone)]
pub struct LoopSource {
    samples: Vec<f32>,
    pos: usize,
    gain: f32,
}

impl LoopSource {
    pub fn new(samples: Vec<f32>, gain: f32) -> Self {
        Self {
            samples,
            pos: 0,
            gain,
        }
    }

    /// Decode a WAV file and mix it down to mono.
    ///
    /// The file's sample rate is not converted; a mismatch is logged.
    pub fn from_wav(path: &Path, gain: f32, sample_rate: u32) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        if mono.is_empty() {
            return Err(Error::InvalidBlock("wave file has no samples"));
        }
        if spec.sample_rate != sample_rate {
            log::warn!(
                "{}: recorded at {} Hz, playing at {} Hz",
                path.display(),
                spec.sample_rate,
                sample_rate
            );
        }
        log::info!(
            "loop source: {} samples ({} ch) from {}",
            mono.len(),
            spec.channels,
            path.display()
        );
        Ok(Self::new(mono, gain))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl AnechoicSource for LoopSource {
    fn tick(&mut self, block: &mut [f32]) {
        if self.samples.is_empty() {
            block.fill(0.0);
            return;
        }
        for sample in block.iter_mut() {
            *sample = self.gain * self.samples[self.pos];
            self.pos += 1;
            if self.pos == self.samples.len() {
                self.pos = 0;
            }
        }
    }
}
