//! Benchmarks for complete render periods.

mod period;

pub use period::bench_period;
