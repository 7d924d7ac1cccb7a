use std::thread;
use std::time::{Duration, Instant};

/// Periodic deadline clock for the render loop.
///
/// Deadlines are absolute: the n-th wake-up is `start + n·period`, so time
/// spent in a period never accumulates as drift. The first deadline is placed
/// `offset_periods` in the future to absorb scheduler warm-up. A period that
/// finishes after its deadline is reported to the caller with its lateness,
/// and the next deadline stays where it was; nothing is skipped or compensated.
#[derive(Debug)]
pub struct PeriodicTimer {
    period: Duration,
    next: Instant,
}

impl PeriodicTimer {
    pub fn new(period: Duration, offset_periods: u32) -> Self {
        Self {
            period,
            next: Instant::now() + period * offset_periods,
        }
    }

    /// Sleep until the current deadline, then arm the next one.
    ///
    /// Returns how late the caller was when the deadline had already passed.
    pub fn wait(&mut self) -> Option<Duration> {
        let now = Instant::now();
        let late = if now < self.next {
            thread::sleep(self.next - now);
            None
        } else {
            Some(now - self.next)
        };
        self.next += self.period;
        late
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlines_do_not_drift() {
        let period = Duration::from_millis(2);
        let mut timer = PeriodicTimer::new(period, 0);
        let start = Instant::now();
        for _ in 0..10 {
            timer.wait();
        }
        // Ten deadlines at 0, 2, ..., 18 ms from arming.
        assert!(start.elapsed() >= Duration::from_millis(17));
    }

    #[test]
    fn test_start_offset_delays_first_period() {
        let period = Duration::from_millis(1);
        let mut timer = PeriodicTimer::new(period, 20);
        let start = Instant::now();
        assert_eq!(timer.wait(), None);
        assert!(start.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn test_overrun_reports_lateness_without_shifting() {
        let period = Duration::from_millis(1);
        let mut timer = PeriodicTimer::new(period, 0);
        thread::sleep(Duration::from_millis(5));
        let late = timer.wait().unwrap();
        assert!(late >= Duration::from_millis(4));
        // The schedule is still anchored at arming time, so the next
        // deadline (1 ms) has passed as well.
        assert!(timer.wait().is_some());
    }
}
