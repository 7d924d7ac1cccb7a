use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::output::QueueReader;
use crate::error::{Error, Result};
use crate::units::{db_to_linear, linear_to_db};

/// Frames converted per pass inside the device callback.
const CALLBACK_FRAMES: usize = 4096;

/// Playback of the output queue on the default audio device.
///
/// The device callback pulls interleaved stereo frames, applies the master
/// gain and spreads them over the device's channels. An empty queue plays
/// silence and is counted. Must stay on the thread that created it.
pub struct Player {
    stream: cpal::Stream,
    gain: Arc<AtomicU32>,
    unmuted_gain: f32,
    muted: bool,
    empty_callbacks: Arc<AtomicU64>,
    channels: usize,
}

impl Player {
    pub fn start(mut reader: QueueReader, gain_db: f32, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no default output device available".into()))?;
        let default = device
            .default_output_config()
            .map_err(|e| Error::Audio(e.to_string()))?;
        let channels = usize::from(default.channels().max(1));
        let config = cpal::StreamConfig {
            channels: default.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let initial = db_to_linear(gain_db);
        let gain = Arc::new(AtomicU32::new(initial.to_bits()));
        let empty_callbacks = Arc::new(AtomicU64::new(0));

        let gain_cb = Arc::clone(&gain);
        let empty_cb = Arc::clone(&empty_callbacks);
        let mut stereo = vec![0.0f32; CALLBACK_FRAMES * 2];

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !reader.is_open() {
                        reader.discard();
                        data.fill(0.0);
                        return;
                    }
                    let gain = f32::from_bits(gain_cb.load(Ordering::Relaxed));
                    let mut short = false;
                    for out in data.chunks_mut(channels * CALLBACK_FRAMES) {
                        let frames = out.len() / channels;
                        let lr = &mut stereo[..frames * 2];
                        if reader.pull(lr) < lr.len() {
                            short = true;
                        }
                        for (frame, pair) in out.chunks_mut(channels).zip(lr.chunks(2)) {
                            if channels == 1 {
                                frame[0] = 0.5 * (pair[0] + pair[1]) * gain;
                            } else {
                                frame[0] = pair[0] * gain;
                                frame[1] = pair[1] * gain;
                                frame[2..].fill(0.0);
                            }
                        }
                    }
                    if short {
                        empty_cb.fetch_add(1, Ordering::Relaxed);
                    }
                },
                |err| log::error!("audio stream: {err}"),
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;
        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        log::info!(
            "playback: {} Hz, {} channel(s), gain {:.1} dB",
            sample_rate,
            channels,
            gain_db
        );
        Ok(Self {
            stream,
            gain,
            unmuted_gain: initial,
            muted: false,
            empty_callbacks,
            channels,
        })
    }

    /// Current linear gain factor.
    pub fn gain_factor(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn gain_db(&self) -> f32 {
        linear_to_db(self.unmuted_gain)
    }

    pub fn set_gain_db(&mut self, db: f32) {
        self.unmuted_gain = db_to_linear(db);
        if !self.muted {
            self.gain.store(self.unmuted_gain.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn mute(&mut self) {
        self.muted = true;
        self.gain.store(0.0f32.to_bits(), Ordering::Relaxed);
    }

    pub fn unmute(&mut self) {
        self.muted = false;
        self.gain.store(self.unmuted_gain.to_bits(), Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Device callbacks that found the queue short.
    pub fn empty_callbacks(&self) -> u64 {
        self.empty_callbacks.load(Ordering::Relaxed)
    }

    /// Pause the device and release the stream.
    pub fn stop(self) {
        if let Err(err) = self.stream.pause() {
            log::warn!("audio stream did not pause: {err}");
        }
        log::debug!("playback stopped, {} empty callbacks", self.empty_callbacks());
    }
}
