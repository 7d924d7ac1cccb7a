pub mod bir;
pub mod config;
pub mod dsp; // FDN reverberator and convolution primitives
pub mod error;
pub mod io; // Collaborator capabilities: sources, renderer, output
pub mod pose;
pub mod runtime; // Deadline loop, command thread, system lifecycle
pub mod units;

pub use error::{Error, Result};

/// Default sample rate of the whole system.
pub const SAMPLE_RATE: u32 = 44_100;
/// Samples per processing block (one render period).
pub const BUFFER_SAMPLES: usize = 512;
/// Output channels (binaural pair).
pub const N_CHANNELS: usize = 2;
/// Precision threshold for decay and comparison checks.
pub const PRECISION: f64 = 1e-6;
/// Minimum output-queue capacity, in blocks.
pub const MIN_QUEUE_BLOCKS: usize = 4;
