/// Fixed-length delay line used as one feedback loop of the network.
///
/// The read cursor always lags the write cursor by exactly `len()` samples:
/// `tick(x)` returns the sample written `len()` ticks earlier.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f64>,
    pos: usize,
}

impl DelayLine {
    /// Create a zeroed delay line of `length` samples (clamped to at least 1).
    pub fn new(length: usize) -> Self {
        Self {
            buffer: vec![0.0; length.max(1)],
            pos: 0,
        }
    }

    /// Push one sample in, get the sample from `len()` ticks ago out.
    #[inline]
    pub fn tick(&mut self, sample: f64) -> f64 {
        let delayed = self.buffer[self.pos];
        self.buffer[self.pos] = sample;
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
        delayed
    }

    /// The sample the next `tick` will return.
    #[inline]
    pub fn next_out(&self) -> f64 {
        self.buffer[self.pos]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impulse_emerges_after_length() {
        let mut line = DelayLine::new(5);
        let mut out = Vec::new();
        out.push(line.tick(1.0));
        for _ in 0..7 {
            out.push(line.tick(0.0));
        }
        assert_eq!(out, vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_next_out_peeks_without_advancing() {
        let mut line = DelayLine::new(2);
        line.tick(0.25);
        line.tick(0.5);
        assert_eq!(line.next_out(), 0.25);
        assert_eq!(line.tick(0.0), 0.25);
        assert_eq!(line.next_out(), 0.5);
    }

    #[test]
    fn test_clear_zeroes_memory() {
        let mut line = DelayLine::new(3);
        for i in 0..3 {
            line.tick(i as f64 + 1.0);
        }
        line.clear();
        for _ in 0..3 {
            assert_eq!(line.tick(0.0), 0.0);
        }
    }

    #[test]
    fn test_zero_length_is_clamped() {
        let mut line = DelayLine::new(0);
        assert_eq!(line.len(), 1);
        line.tick(1.0);
        assert_eq!(line.tick(0.0), 1.0);
    }
}
