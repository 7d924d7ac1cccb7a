//! Benchmarks for the feedback delay network.

use std::hint::black_box;

use auralize::dsp::{AbsorptionModel, AbsorptionTables, FdnParams, FeedbackDelayNetwork};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

fn eight_lines() -> FdnParams {
    FdnParams {
        order: 8,
        input_gains: vec![1.0; 8],
        output_gains: vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
        delays: vec![601, 691, 773, 839, 997, 1153, 1327, 1559],
        ..FdnParams::default()
    }
}

pub fn bench_fdn(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/fdn");

    let four = FdnParams::default();
    let eight = eight_lines();

    for &size in BLOCK_SIZES {
        let input: Vec<f64> = (0..size)
            .map(|i| if i == 0 { 1.0 } else { (i as f64 * 0.05).sin() * 0.1 })
            .collect();
        let mut block = vec![0.0; size];

        // Table-driven absorption, four lines
        let mut fdn =
            FeedbackDelayNetwork::new(&four, &AbsorptionModel::Iir(AbsorptionTables::flat(&four)))
                .unwrap();
        group.bench_with_input(BenchmarkId::new("iir_n4", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                fdn.render(black_box(&mut block));
                block[size - 1]
            })
        });

        // One-pole absorption, four lines
        let mut fdn = FeedbackDelayNetwork::new(&four, &AbsorptionModel::OnePole).unwrap();
        group.bench_with_input(BenchmarkId::new("one_pole_n4", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                fdn.render(black_box(&mut block));
                block[size - 1]
            })
        });

        // Eight lines
        let mut fdn = FeedbackDelayNetwork::new(&eight, &AbsorptionModel::OnePole).unwrap();
        group.bench_with_input(BenchmarkId::new("one_pole_n8", size), &size, |b, _| {
            b.iter(|| {
                block.copy_from_slice(&input);
                fdn.render(black_box(&mut block));
                block[size - 1]
            })
        });
    }

    group.finish();
}
