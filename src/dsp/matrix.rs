//! Scaled Householder feedback matrix.
//!
//! `A = gA · (I - (2/N) · u · uᵀ)` with `u = ones(N)`. The reflection is
//! orthogonal, so the spectral radius of `A` is exactly `|gA|`. For `N = 1`
//! it degenerates to the scalar `-gA`.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FeedbackMatrix {
    order: usize,
    gain: f64,
}

impl FeedbackMatrix {
    /// Build an `order × order` matrix scaled by `gain`, |gain| < 1.
    pub fn householder(order: usize, gain: f64) -> Result<Self> {
        if order == 0 {
            return Err(Error::InvalidOrder(order));
        }
        if !(gain.abs() < 1.0) {
            return Err(Error::UnstableFeedback(gain));
        }
        Ok(Self { order, gain })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Entry `(row, col)` of the dense matrix.
    pub fn coefficient(&self, row: usize, col: usize) -> f64 {
        let identity = if row == col { 1.0 } else { 0.0 };
        self.gain * (identity - 2.0 / self.order as f64)
    }

    /// Dense row-major copy, for inspection.
    pub fn to_dense(&self) -> Vec<f64> {
        let n = self.order;
        let mut m = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                m.push(self.coefficient(row, col));
            }
        }
        m
    }

    /// `out = A · input` in O(N): `gA · (x_i - (2/N) · Σx)`.
    ///
    /// Both slices must have `order()` entries.
    #[inline]
    pub fn apply(&self, input: &[f64], out: &mut [f64]) {
        let sum: f64 = input.iter().sum();
        let shared = sum * 2.0 / self.order as f64;
        for (o, &x) in out.iter_mut().zip(input) {
            *o = self.gain * (x - shared);
        }
    }
}
