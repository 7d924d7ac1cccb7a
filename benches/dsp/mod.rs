//! Benchmarks for low-level DSP primitives.

mod convolver;
mod fdn;

pub use convolver::bench_convolver;
pub use fdn::bench_fdn;
