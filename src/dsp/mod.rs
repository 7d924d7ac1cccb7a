//! Signal-processing primitives behind the renderer and the render loop.
//!
//! Everything here allocates at construction only. `tick`, `render` and
//! `convolve` are realtime-safe and can run inside the periodic loop.

/// Block convolution with replaceable kernels.
pub mod convolver;
/// Fixed-length integer delay line.
pub mod delay;
/// Feedback delay network reverberator.
pub mod fdn;
/// Absorption and tone-correction filters.
pub mod filter;
/// Householder feedback matrix.
pub mod matrix;

pub use convolver::{Convolution, PartitionedConvolver};
pub use fdn::{AbsorptionModel, AbsorptionTables, FdnParams, FeedbackDelayNetwork};
