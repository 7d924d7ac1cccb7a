//! Gain and time conversions shared by the reverberator, renderer and loop.

use std::time::Duration;

/// Convert a level in decibels to a linear amplitude factor.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels, floored at -300 dB.
#[inline]
pub fn linear_to_db(gain: f32) -> f32 {
    20.0 * gain.abs().max(1e-15).log10()
}

/// Number of whole samples covering `seconds` at `sample_rate`.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    (seconds.max(0.0) * sample_rate as f64).round() as usize
}

#[inline]
pub fn samples_to_seconds(samples: usize, sample_rate: u32) -> f64 {
    samples as f64 / sample_rate as f64
}

/// Duration of one processing block; the render loop's deadline.
pub fn block_period(block_samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(samples_to_seconds(block_samples, sample_rate))
}

/// Gain a loop of `delay` samples needs per round trip so that its energy
/// falls by 60 dB after `rt60` seconds.
///
/// `g = 10^(-3 · delay · T / rt60)` with `T = 1 / sample_rate`. A zero decay
/// time means instant extinction.
pub fn rt60_attenuation(delay: usize, rt60: f64, sample_rate: u32) -> f64 {
    if rt60 <= 0.0 {
        return 0.0;
    }
    let period = 1.0 / sample_rate as f64;
    10.0_f64.powf(-3.0 * delay as f64 * period / rt60)
}

/// Speed of sound in air (m/s) at `celsius` degrees.
#[inline]
pub fn speed_of_sound(celsius: f32) -> f32 {
    331.4 + 0.6 * celsius
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_round_trip_reference_points() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-6.0206), 0.5, epsilon = 1e-4);
        assert_relative_eq!(linear_to_db(0.1), -20.0, epsilon = 1e-4);
        assert!(linear_to_db(0.0) <= -299.0);
    }

    #[test]
    fn test_block_period_matches_buffer() {
        let period = block_period(512, 44_100);
        assert_relative_eq!(period.as_secs_f64(), 512.0 / 44_100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rt60_attenuation_reaches_minus_60_db() {
        // After rt60 seconds worth of round trips the product of gains is 1e-3.
        let delay = 1000;
        let g = rt60_attenuation(delay, 1.2, 44_100);
        let trips = 1.2 * 44_100.0 / delay as f64;
        assert_relative_eq!(g.powf(trips), 1e-3, epsilon = 1e-9);
        assert_eq!(rt60_attenuation(delay, 0.0, 44_100), 0.0);
    }

    #[test]
    fn test_seconds_to_samples_clamps_negative() {
        assert_eq!(seconds_to_samples(0.5, 44_100), 22_050);
        assert_eq!(seconds_to_samples(-1.0, 44_100), 0);
    }
}
