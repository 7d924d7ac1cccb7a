//! Binaural impulse responses.

use crate::error::{Error, Result};

/// A left/right impulse-response pair of equal length.
///
/// `generation` increases every time the renderer publishes a new response,
/// so consumers can tell two snapshots apart without comparing samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bir {
    left: Vec<f32>,
    right: Vec<f32>,
    generation: u64,
}

impl Bir {
    /// A silent response of `len` samples per ear.
    pub fn silent(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
            generation: 0,
        }
    }

    pub fn from_pair(left: Vec<f32>, right: Vec<f32>) -> Result<Self> {
        if left.len() != right.len() {
            return Err(Error::LengthMismatch {
                what: "right impulse response",
                expected: left.len(),
                got: right.len(),
            });
        }
        Ok(Self {
            left,
            right,
            generation: 0,
        })
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Both ears at once, for in-place synthesis.
    pub fn ears_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.left, &mut self.right)
    }

    /// Samples per ear.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Sample index and value of the strongest tap in either ear.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(l, r)| l.abs().max(r.abs()))
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}
