use crate::{
    dsp::{
        delay::DelayLine,
        filter::{AbsorptionFilter, Iir, OnePole, OneZero},
        matrix::FeedbackMatrix,
    },
    error::{Error, Result},
    units::rt60_attenuation,
    SAMPLE_RATE,
};

/*
Feedback Delay Network
======================

Synthesizes the late-reverberation tail of a room from a handful of physical
parameters: two reverberation times and per-line absorption filters.

Vocabulary
----------

  line          One feedback loop: a delay line of m[i] samples followed by
                its absorption filter.

  per-pass      The gain a loop applies on each round trip. A loop of m
  attenuation   samples needs g = 10^(-3·m·T / RT0) to lose 60 dB after RT0
                seconds, whatever its length.

  tone          A single one-zero filter at the output that restores the
  correction    low/high decay-time ratio alpha = RTpi / RT0 for the whole
                network, instead of per line.

  warm-up       2·max(m) ticks run before first use, absorption bypassed and
                driven by the constant injection vector b, so the first real
                tick does not start from silent lines.


Signal Flow
-----------

              ┌────────────────────── A (N×N) ◄──────────────────────┐
              │                                                      │
  x ──► b ──►(+)──► z^-m[i] ──► H_i(z) ──┬──────────────────────────┘
  │                                      │
  │                                      └──► c · ──► tone ──►(+)──► y
  └────────────────────────────── d ─────────────────────────────┘

Per sample:

  filtered[i] = H_i(delayed[i])
  state       = x·b + A·filtered
  y           = tone(c · filtered) + d·x
  delay[i]   ◄= state[i]

The feedback matrix is a Householder reflection scaled by gA, so its spectral
radius is exactly |gA|; with stable absorption filters the whole loop is
stable for any |gA| < 1.
*/

/// Static configuration of the reverberator.
#[derive(Debug, Clone)]
pub struct FdnParams {
    /// Number of delay lines, N.
    pub order: usize,
    /// Feedback matrix scale gA, |gA| < 1.
    pub feedback_gain: f64,
    /// Injection gains b, length N.
    pub input_gains: Vec<f64>,
    /// Read-out gains c, length N.
    pub output_gains: Vec<f64>,
    /// Direct-path gain d.
    pub direct_gain: f64,
    /// Delay lengths m in samples, positive and pairwise distinct.
    pub delays: Vec<usize>,
    /// Target RT60 at DC, seconds.
    pub rt_dc: f64,
    /// Target RT60 at Nyquist, seconds.
    pub rt_pi: f64,
    pub sample_rate: u32,
}

impl Default for FdnParams {
    fn default() -> Self {
        Self {
            order: 4,
            feedback_gain: 0.95,
            input_gains: vec![1.0; 4],
            output_gains: vec![1.0, -1.0, 1.0, -1.0],
            direct_gain: 0.0,
            delays: vec![997, 1153, 1327, 1559],
            rt_dc: 1.2,
            rt_pi: 0.5,
            sample_rate: SAMPLE_RATE,
        }
    }
}

impl FdnParams {
    /// Decay ratio alpha = RTpi / RT0, or 1 when RT0 is zero.
    pub fn alpha(&self) -> f64 {
        if self.rt_dc == 0.0 {
            1.0
        } else {
            self.rt_pi / self.rt_dc
        }
    }

    /// Per-pass attenuation g[i] for every line.
    pub fn attenuations(&self) -> Vec<f64> {
        self.delays
            .iter()
            .map(|&m| rt60_attenuation(m, self.rt_dc, self.sample_rate))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let n = self.order;
        if n == 0 {
            return Err(Error::InvalidOrder(n));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidBlock("sample rate is zero"));
        }
        for (what, len) in [
            ("input gain vector", self.input_gains.len()),
            ("output gain vector", self.output_gains.len()),
            ("delay vector", self.delays.len()),
        ] {
            if len != n {
                return Err(Error::LengthMismatch {
                    what,
                    expected: n,
                    got: len,
                });
            }
        }
        for (i, &m) in self.delays.iter().enumerate() {
            if m == 0 {
                return Err(Error::ZeroDelay { line: i });
            }
            if let Some(j) = self.delays[..i].iter().position(|&other| other == m) {
                return Err(Error::DuplicateDelay {
                    first: j,
                    second: i,
                    length: m,
                });
            }
        }

        let decay_ok = self.rt_dc.is_finite()
            && self.rt_pi.is_finite()
            && self.rt_dc >= 0.0
            && self.rt_pi >= 0.0
            && (self.rt_dc == 0.0 || self.rt_pi > 0.0);
        if !decay_ok {
            return Err(Error::InvalidDecayTime {
                rt_dc: self.rt_dc,
                rt_pi: self.rt_pi,
            });
        }
        Ok(())
    }
}

/// Per-line IIR coefficient tables: row i holds line i's numerator/denominator.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsorptionTables {
    pub numerator: Vec<Vec<f64>>,
    pub denominator: Vec<Vec<f64>>,
}

impl AbsorptionTables {
    pub fn new(numerator: Vec<Vec<f64>>, denominator: Vec<Vec<f64>>) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Unity passthrough rows: the loops decay through `gA` alone.
    pub fn identity(order: usize) -> Self {
        Self {
            numerator: vec![vec![1.0]; order],
            denominator: vec![vec![1.0]; order],
        }
    }

    /// Frequency-flat rows carrying each line's per-pass attenuation.
    pub fn flat(params: &FdnParams) -> Self {
        Self {
            numerator: params.attenuations().into_iter().map(|g| vec![g]).collect(),
            denominator: vec![vec![1.0]; params.delays.len()],
        }
    }

    fn build(&self, order: usize) -> Result<Vec<AbsorptionFilter>> {
        for (table, rows) in [
            ("numerator", self.numerator.len()),
            ("denominator", self.denominator.len()),
        ] {
            if rows != order {
                return Err(Error::TableRows {
                    table,
                    expected: order,
                    got: rows,
                });
            }
        }
        self.numerator
            .iter()
            .zip(&self.denominator)
            .enumerate()
            .map(|(line, (b, a))| Iir::new(b, a, line).map(AbsorptionFilter::Iir))
            .collect()
    }
}

/// Which per-line absorption filter the network installs.
#[derive(Debug, Clone)]
pub enum AbsorptionModel {
    /// Table-driven IIR rows (primary model).
    Iir(AbsorptionTables),
    /// One-pole low-shelf derived from the decay times.
    OnePole,
}

/// N parallel delay+absorption loops cross-coupled by a feedback matrix.
#[derive(Debug, Clone)]
pub struct FeedbackDelayNetwork {
    params: FdnParams,
    lines: Vec<DelayLine>,
    filters: Vec<AbsorptionFilter>,
    matrix: FeedbackMatrix,
    tone: OneZero,
    attenuation: Vec<f64>,
    tilt: Vec<f64>,
    state: Vec<f64>,
    filtered: Vec<f64>,
}

impl FeedbackDelayNetwork {
    /// Build, clear and warm up a network.
    ///
    /// Fails on an invalid order, malformed gain or delay vectors, |gA| >= 1,
    /// invalid decay times, coefficient tables that do not have exactly N
    /// well-formed, stable rows, or (one-pole model) a tilt with |a| >= 1.
    pub fn new(params: &FdnParams, model: &AbsorptionModel) -> Result<Self> {
        params.validate()?;
        let n = params.order;
        let matrix = FeedbackMatrix::householder(n, params.feedback_gain)?;

        let alpha = params.alpha();
        let beta = (1.0 - alpha) / (1.0 + alpha);
        let tone = OneZero::new(beta, 1.0 / (1.0 - beta));

        let attenuation = params.attenuations();
        let tilt_scale = (std::f64::consts::LN_10 / 4.0) * (1.0 - 1.0 / (alpha * alpha));
        let tilt: Vec<f64> = attenuation
            .iter()
            .map(|&g| if g > 0.0 { g.log10() * tilt_scale } else { 0.0 })
            .collect();

        let filters = match model {
            AbsorptionModel::Iir(tables) => tables.build(n)?,
            // A low RT(pi)/RT(0) ratio pushes the tilt pole of long lines
            // onto or past the unit circle.
            AbsorptionModel::OnePole => attenuation
                .iter()
                .zip(&tilt)
                .enumerate()
                .map(|(line, (&g, &a))| {
                    if a.abs() < 1.0 {
                        Ok(AbsorptionFilter::OnePole(OnePole::new(g, a)))
                    } else {
                        Err(Error::UnstableFilter { line })
                    }
                })
                .collect::<Result<_>>()?,
        };

        let mut fdn = Self {
            lines: params.delays.iter().map(|&m| DelayLine::new(m)).collect(),
            params: params.clone(),
            filters,
            matrix,
            tone,
            attenuation,
            tilt,
            state: vec![0.0; n],
            filtered: vec![0.0; n],
        };
        fdn.clear();
        fdn.prime();

        log::debug!(
            "fdn: N={} gA={} alpha={:.4} warm-up {} samples",
            n,
            params.feedback_gain,
            alpha,
            fdn.warmup_len()
        );
        Ok(fdn)
    }

    /// Process one sample. Allocation-free.
    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        for ((line, filter), filtered) in self
            .lines
            .iter()
            .zip(self.filters.iter_mut())
            .zip(self.filtered.iter_mut())
        {
            *filtered = filter.tick(line.next_out());
        }

        self.matrix.apply(&self.filtered, &mut self.state);
        for (s, &b) in self.state.iter_mut().zip(&self.params.input_gains) {
            *s += sample * b;
        }

        let mut wet = 0.0;
        for (&c, &f) in self.params.output_gains.iter().zip(&self.filtered) {
            wet += c * f;
        }
        let out = self.tone.tick(wet) + self.params.direct_gain * sample;

        for (line, &s) in self.lines.iter_mut().zip(&self.state) {
            line.tick(s);
        }
        out
    }

    /// Process a block in place.
    pub fn render(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.tick(*sample);
        }
    }

    /// Zero every delay line, filter memory and the tone filter.
    ///
    /// The only state-reset operation; nothing clears implicitly mid-run.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for filter in &mut self.filters {
            filter.clear();
        }
        self.tone.clear();
        self.state.fill(0.0);
        self.filtered.fill(0.0);
    }

    /// Run the deterministic warm-up pass: `warmup_len()` ticks with the
    /// absorption filters bypassed, self-excited by the injection vector.
    pub fn prime(&mut self) {
        for _ in 0..self.warmup_len() {
            for (line, filtered) in self.lines.iter().zip(self.filtered.iter_mut()) {
                *filtered = line.next_out();
            }
            self.matrix.apply(&self.filtered, &mut self.state);
            for (s, &b) in self.state.iter_mut().zip(&self.params.input_gains) {
                *s += b;
            }
            for (line, &s) in self.lines.iter_mut().zip(&self.state) {
                line.tick(s);
            }
        }
    }

    /// Samples run by `prime`: twice the longest delay.
    pub fn warmup_len(&self) -> usize {
        2 * self.params.delays.iter().copied().max().unwrap_or(0)
    }

    pub fn params(&self) -> &FdnParams {
        &self.params
    }

    pub fn matrix(&self) -> &FeedbackMatrix {
        &self.matrix
    }

    /// Per-pass attenuation g[i].
    pub fn attenuation(&self) -> &[f64] {
        &self.attenuation
    }

    /// One-pole tilt coefficients a[i].
    pub fn tilt(&self) -> &[f64] {
        &self.tilt
    }

    /// Filtered line outputs of the last tick.
    pub fn line_outputs(&self) -> &[f64] {
        &self.filtered
    }
}
