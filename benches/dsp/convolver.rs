//! Benchmarks for partitioned convolution and kernel replacement.

use std::hint::black_box;

use auralize::dsp::{Convolution, PartitionedConvolver};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_convolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolver");

    // Half a second at 44.1kHz
    let taps = 22_050;
    let kernel: Vec<f32> = (0..taps)
        .map(|i| (-(i as f32) / 4000.0).exp() * if i % 2 == 0 { 1.0 } else { -1.0 })
        .collect();

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.01).sin()).collect();
        let mut output = vec![0.0f32; size];

        let mut conv = PartitionedConvolver::new(size, taps).unwrap();
        conv.set_filter(&kernel);
        group.bench_with_input(BenchmarkId::new("convolve_500ms", size), &size, |b, _| {
            b.iter(|| {
                conv.convolve(black_box(&input), &mut output);
                output[0]
            })
        });

        let mut conv = PartitionedConvolver::new(size, taps).unwrap();
        group.bench_with_input(BenchmarkId::new("set_filter_500ms", size), &size, |b, _| {
            b.iter(|| conv.set_filter(black_box(&kernel)))
        });
    }

    group.finish();
}
