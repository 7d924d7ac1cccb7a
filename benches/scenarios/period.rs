//! One render period as `System` builds it: noise source, tracker read,
//! renderer, kernel swap when due, stereo convolution, output push.

use auralize::{
    config::{SystemConfig, TrackerMode},
    io::DiscardSink,
    runtime::System,
};
use criterion::{BenchmarkId, Criterion};

use crate::BLOCK_SIZES;

pub fn bench_period(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/period");

    for &size in BLOCK_SIZES {
        let mut config = SystemConfig::default();
        config.general.block_samples = size;
        config.renderer.bir_length_sec = 0.5;

        // Static head: a kernel swap only on the first period.
        let system = System::new(config.clone()).unwrap();
        let mut cycle = system.build_cycle(DiscardSink::new()).unwrap();
        cycle.start().unwrap();
        group.bench_with_input(BenchmarkId::new("static_head", size), &size, |b, _| {
            b.iter(|| cycle.run_period())
        });

        // Turning head: a new response every period.
        config.tracker.mode = TrackerMode::Trajectory;
        config.tracker.frames = (0..360).map(|az| [az as f32 * 5.0, 0.0, 0.0]).collect();
        config.tracker.read_interval_ms = 1.0;
        let system = System::new(config).unwrap();
        let mut cycle = system.build_cycle(DiscardSink::new()).unwrap();
        cycle.start().unwrap();
        group.bench_with_input(BenchmarkId::new("turning_head", size), &size, |b, _| {
            b.iter(|| cycle.run_period())
        });
    }

    group.finish();
}
