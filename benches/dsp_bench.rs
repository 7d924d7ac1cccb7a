//! Benchmarks for the DSP primitives and one full render period.
//!
//! Run with: cargo bench
//!
//! Every period must finish well inside its deadline. At 44.1kHz:
//!   - 64 samples  = 1.45ms
//!   - 128 samples = 2.90ms
//!   - 256 samples = 5.80ms
//!   - 512 samples = 11.61ms
//!
//! Benchmark groups:
//!   - dsp/*        FDN tick, absorption models, partitioned convolution
//!   - scenarios/*  A complete render period as the system assembles it

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Block sizes the render loop is run with.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_fdn,
    dsp::bench_convolver,
    scenarios::bench_period,
);
criterion_main!(benches);
