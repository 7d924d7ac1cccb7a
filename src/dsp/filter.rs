use crate::error::{Error, Result};

/*
| filter   | role in the network                     | transfer function               |
| -------- | --------------------------------------- | ------------------------------- |
| OnePole  | per-line absorption (low-shelf tilt)    | g(1-a) / (1 - a z^-1)           |
| Iir      | per-line absorption from table rows     | B(z) / A(z), any order          |
| OneZero  | tone correction at the network output   | k (b0 + b1 z^-1), b1 = -beta·b0 |

Absorption filters sit inside the feedback loops, so their denominators must
keep every pole strictly inside the unit circle. Rows are checked once, at
construction; `tick` never validates.
*/

/// One-pole absorption filter for a delay line of a given length.
///
/// DC gain equals the per-pass attenuation `g`; the pole `a` tilts the
/// response so high frequencies decay faster when RT(pi) < RT(0).
#[derive(Debug, Clone)]
pub struct OnePole {
    b0: f64,
    a1: f64,
    y1: f64,
}

impl OnePole {
    /// Build from per-pass attenuation `g` and tilt coefficient `a`.
    pub fn new(g: f64, a: f64) -> Self {
        Self {
            b0: g * (1.0 - a),
            a1: a,
            y1: 0.0,
        }
    }

    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        let y = self.b0 * sample + self.a1 * self.y1;
        self.y1 = y;
        y
    }

    pub fn clear(&mut self) {
        self.y1 = 0.0;
    }
}

/// Arbitrary-order direct-form-I IIR filter.
///
/// Coefficients are normalised so that `a[0] == 1`.
#[derive(Debug, Clone)]
pub struct Iir {
    b: Vec<f64>,
    a: Vec<f64>,
    inputs: Vec<f64>,  // x[n], x[n-1], ...
    outputs: Vec<f64>, // y[n-1], y[n-2], ...
}

impl Iir {
    /// Build a filter from numerator `b` and denominator `a`.
    ///
    /// `line` only labels errors. Rejects empty rows, non-finite values, a zero
    /// leading denominator coefficient and denominators with poles on or
    /// outside the unit circle.
    pub fn new(b: &[f64], a: &[f64], line: usize) -> Result<Self> {
        if b.is_empty() || a.is_empty() {
            return Err(Error::MalformedCoefficients {
                line,
                reason: "empty coefficient row",
            });
        }
        if b.iter().chain(a).any(|c| !c.is_finite()) {
            return Err(Error::MalformedCoefficients {
                line,
                reason: "non-finite coefficient",
            });
        }
        if a[0] == 0.0 {
            return Err(Error::MalformedCoefficients {
                line,
                reason: "leading denominator coefficient is zero",
            });
        }

        let a0 = a[0];
        let b: Vec<f64> = b.iter().map(|c| c / a0).collect();
        let a: Vec<f64> = a.iter().map(|c| c / a0).collect();

        if !denominator_is_stable(&a) {
            return Err(Error::UnstableFilter { line });
        }

        Ok(Self {
            inputs: vec![0.0; b.len()],
            outputs: vec![0.0; a.len() - 1],
            b,
            a,
        })
    }

    /// Unity passthrough (`b = [1]`, `a = [1]`).
    pub fn identity() -> Self {
        Self {
            b: vec![1.0],
            a: vec![1.0],
            inputs: vec![0.0],
            outputs: Vec::new(),
        }
    }

    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        let last = self.inputs.len() - 1;
        self.inputs.copy_within(0..last, 1);
        self.inputs[0] = sample;

        let mut y = 0.0;
        for (b, x) in self.b.iter().zip(&self.inputs) {
            y += b * x;
        }
        for (a, y_prev) in self.a[1..].iter().zip(&self.outputs) {
            y -= a * y_prev;
        }

        if !self.outputs.is_empty() {
            let last = self.outputs.len() - 1;
            self.outputs.copy_within(0..last, 1);
            self.outputs[0] = y;
        }
        y
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    pub fn clear(&mut self) {
        self.inputs.fill(0.0);
        self.outputs.fill(0.0);
    }
}

/// One-zero tone-correction filter applied once at the network output.
#[derive(Debug, Clone)]
pub struct OneZero {
    b0: f64,
    b1: f64,
    gain: f64,
    x1: f64,
}

impl OneZero {
    /// Place the zero at `zero` on the real axis, normalised for unity peak
    /// gain, then scaled by `gain`.
    pub fn new(zero: f64, gain: f64) -> Self {
        let b0 = if zero > 0.0 {
            1.0 / (1.0 + zero)
        } else {
            1.0 / (1.0 - zero)
        };
        Self {
            b0,
            b1: -zero * b0,
            gain,
            x1: 0.0,
        }
    }

    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        let x = self.gain * sample;
        let y = self.b0 * x + self.b1 * self.x1;
        self.x1 = x;
        y
    }

    pub fn clear(&mut self) {
        self.x1 = 0.0;
    }
}

/// Per-line absorption model: the table-driven IIR or the one-pole fallback.
#[derive(Debug, Clone)]
pub enum AbsorptionFilter {
    OnePole(OnePole),
    Iir(Iir),
}

impl AbsorptionFilter {
    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        match self {
            AbsorptionFilter::OnePole(f) => f.tick(sample),
            AbsorptionFilter::Iir(f) => f.tick(sample),
        }
    }

    pub fn clear(&mut self) {
        match self {
            AbsorptionFilter::OnePole(f) => f.clear(),
            AbsorptionFilter::Iir(f) => f.clear(),
        }
    }
}

/// Schur-Cohn step-down test: true when every root of `a` (with `a[0] == 1`)
/// lies strictly inside the unit circle.
pub fn denominator_is_stable(a: &[f64]) -> bool {
    let mut poly = a.to_vec();
    while poly.len() > 1 {
        let order = poly.len() - 1;
        let k = poly[order];
        if k.abs() >= 1.0 || !k.is_finite() {
            return false;
        }
        let denom = 1.0 - k * k;
        poly = (0..order)
            .map(|i| (poly[i] - k * poly[order - i]) / denom)
            .collect();
    }
    true
}
