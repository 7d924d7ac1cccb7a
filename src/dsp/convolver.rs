use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{Error, Result};

/*
Uniformly Partitioned Convolution
=================================

The kernel (one ear of a BIR) is cut into P partitions of B samples, B being
the processing block. Each partition is zero-padded to 2B and transformed once,
when the kernel is installed. Every block:

  1. slide the 2B input window by B and append the new block
  2. FFT the window into the frequency-domain delay line (FDL)
  3. accumulate  Y = Σ_p  X[now - p] · H[p]
  4. inverse FFT, keep the last B samples (overlap-save)

Kernel replacement only rewrites the H spectra. The FDL keeps the input
history, so a new kernel applies to past input immediately and a swap can only
be heard at a block edge.

All buffers are sized for the longest kernel at construction; neither
`set_filter` nor `convolve` allocates.
*/

/// Block convolution with an atomically replaceable kernel.
pub trait Convolution {
    /// Replace the whole kernel. Returns the number of taps installed, which is
    /// smaller than `kernel.len()` only when the kernel exceeds capacity.
    fn set_filter(&mut self, kernel: &[f32]) -> usize;

    /// Convolve one block; `output` has the same length as `input`.
    fn convolve(&mut self, input: &[f32], output: &mut [f32]);

    /// Forget the input history.
    fn reset(&mut self);
}

pub struct PartitionedConvolver {
    block: usize,
    fft_len: usize,
    max_partitions: usize,
    partitions: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    kernel_spectra: Vec<Complex<f32>>,
    history: Vec<Complex<f32>>,
    head: usize,
    window: Vec<f32>,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PartitionedConvolver {
    /// Create a convolver for `block`-sample blocks and kernels of up to
    /// `max_kernel_len` taps. Starts with an all-zero kernel.
    pub fn new(block: usize, max_kernel_len: usize) -> Result<Self> {
        if block == 0 {
            return Err(Error::InvalidBlock("convolution block size is zero"));
        }
        let fft_len = 2 * block;
        let max_partitions = max_kernel_len.div_ceil(block).max(1);

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        let zero = Complex::new(0.0, 0.0);
        Ok(Self {
            block,
            fft_len,
            max_partitions,
            partitions: 1,
            forward,
            inverse,
            kernel_spectra: vec![zero; max_partitions * fft_len],
            history: vec![zero; max_partitions * fft_len],
            head: 0,
            window: vec![0.0; fft_len],
            work: vec![zero; fft_len],
            scratch: vec![zero; scratch_len],
        })
    }

    pub fn block_size(&self) -> usize {
        self.block
    }

    /// Longest kernel accepted without truncation.
    pub fn capacity(&self) -> usize {
        self.max_partitions * self.block
    }
}

impl Convolution for PartitionedConvolver {
    fn set_filter(&mut self, kernel: &[f32]) -> usize {
        let taps = kernel.len().min(self.capacity());
        let kernel = &kernel[..taps];
        self.partitions = taps.div_ceil(self.block).max(1);

        let n = self.fft_len;
        for p in 0..self.partitions {
            let start = (p * self.block).min(taps);
            let end = ((p + 1) * self.block).min(taps);
            for (slot, k) in self.work.iter_mut().enumerate() {
                let idx = start + slot;
                *k = if idx < end {
                    Complex::new(kernel[idx], 0.0)
                } else {
                    Complex::new(0.0, 0.0)
                };
            }
            self.forward
                .process_with_scratch(&mut self.work, &mut self.scratch);
            self.kernel_spectra[p * n..(p + 1) * n].copy_from_slice(&self.work);
        }
        taps
    }

    fn convolve(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.block);
        debug_assert_eq!(output.len(), self.block);
        let b = self.block;
        let n = self.fft_len;

        self.window.copy_within(b..n, 0);
        self.window[b..].copy_from_slice(&input[..b]);
        for (w, &x) in self.work.iter_mut().zip(&self.window) {
            *w = Complex::new(x, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.work, &mut self.scratch);

        self.head = (self.head + 1) % self.max_partitions;
        self.history[self.head * n..(self.head + 1) * n].copy_from_slice(&self.work);

        self.work.fill(Complex::new(0.0, 0.0));
        for p in 0..self.partitions {
            let slot = (self.head + self.max_partitions - p) % self.max_partitions;
            let x = &self.history[slot * n..(slot + 1) * n];
            let h = &self.kernel_spectra[p * n..(p + 1) * n];
            for ((acc, xk), hk) in self.work.iter_mut().zip(x).zip(h) {
                *acc += xk * hk;
            }
        }
        self.inverse
            .process_with_scratch(&mut self.work, &mut self.scratch);

        let scale = 1.0 / n as f32;
        for (out, y) in output.iter_mut().zip(&self.work[b..]) {
            *out = y.re * scale;
        }
    }

    fn reset(&mut self) {
        self.history.fill(Complex::new(0.0, 0.0));
        self.window.fill(0.0);
        self.head = 0;
    }
}
