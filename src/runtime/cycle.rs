use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::control::{ControlFlags, ExitStatus};
use super::timer::PeriodicTimer;
use crate::bir::Bir;
use crate::dsp::Convolution;
use crate::error::{Error, Result};
use crate::io::{AcousticRenderer, AnechoicSource, OutputSink};
use crate::N_CHANNELS;

/*
Render Cycle
============

One period of the hard real-time loop, strictly in this order:

  source.tick ──► renderer.update_listener_orientation ──► renderer.render
       │                     │ (error: fatal)                    │
       │                     ▼                                   ▼
       │               Draining                      bir / is_new_bir
       │                                                         │
       │                                  new? set_filter(left), set_filter(right)
       ▼                                                         │
  left.convolve(input), right.convolve(input) ◄──────────────────┘
       │
       ▼
  interleave L R L R ──► output.push ──(short?)──► log, count, carry on
       │
       ▼
  timer.wait  (next absolute deadline)

Lifecycle:

  Uninitialized ──start──► Starting ──► Periodic ──stop flag / fatal──► Draining ──► Stopped

A kernel is only ever replaced between two `convolve` calls, and only with a
response the renderer has finished. The loop keeps its own reference to the
current response so the renderer cannot recycle it mid-period.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Starting,
    Periodic,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodReport {
    Continue,
    Fatal,
}

/// Counters and worst-case timings gathered by the loop.
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    pub periods: u64,
    pub bir_swaps: u64,
    pub short_transfers: u64,
    pub overruns: u64,
    pub max_render: Duration,
    pub max_convolve: Duration,
    pub max_period: Duration,
}

/// Owns every collaborator of the render thread and runs its periods.
pub struct RenderCycle<S, R, O, C> {
    source: S,
    renderer: R,
    output: O,
    left: C,
    right: C,
    input: Vec<f32>,
    out_left: Vec<f32>,
    out_right: Vec<f32>,
    frames: Vec<f32>,
    current: Option<Arc<Bir>>,
    state: LoopState,
    stats: CycleStats,
    exit: ExitStatus,
}

impl<S, R, O, C> RenderCycle<S, R, O, C>
where
    S: AnechoicSource,
    R: AcousticRenderer,
    O: OutputSink,
    C: Convolution,
{
    /// Wire the collaborators together. All per-period buffers are allocated
    /// here.
    pub fn new(source: S, renderer: R, output: O, left: C, right: C, block: usize) -> Result<Self> {
        if block == 0 {
            return Err(Error::InvalidBlock("block size is zero"));
        }
        Ok(Self {
            source,
            renderer,
            output,
            left,
            right,
            input: vec![0.0; block],
            out_left: vec![0.0; block],
            out_right: vec![0.0; block],
            frames: vec![0.0; block * N_CHANNELS],
            current: None,
            state: LoopState::Uninitialized,
            stats: CycleStats::default(),
            exit: ExitStatus::Normal,
        })
    }

    /// Open the output and start the renderer.
    pub fn start(&mut self) -> Result<()> {
        self.state = LoopState::Starting;
        if let Err(err) = self.output.start() {
            self.state = LoopState::Stopped;
            return Err(err);
        }
        self.renderer.start_simulation();
        self.state = LoopState::Periodic;
        info!("render loop running, {} samples per period", self.input.len());
        Ok(())
    }

    /// One period. Never blocks and never allocates.
    pub fn run_period(&mut self) -> PeriodReport {
        let started = Instant::now();
        self.source.tick(&mut self.input);

        if let Err(err) = self.renderer.update_listener_orientation() {
            error!("tracker failure, stopping: {err}");
            self.exit = ExitStatus::TrackerFailure;
            self.state = LoopState::Draining;
            return PeriodReport::Fatal;
        }

        self.renderer.render();
        let bir = self.renderer.bir();
        if self.renderer.is_new_bir() {
            self.left.set_filter(bir.left());
            self.right.set_filter(bir.right());
            debug!("kernel swap to generation {}", bir.generation());
            self.current = Some(bir);
            self.stats.bir_swaps += 1;
        }
        let rendered = Instant::now();

        self.left.convolve(&self.input, &mut self.out_left);
        self.right.convolve(&self.input, &mut self.out_right);
        let convolved = Instant::now();

        for ((frame, &l), &r) in self
            .frames
            .chunks_exact_mut(N_CHANNELS)
            .zip(&self.out_left)
            .zip(&self.out_right)
        {
            frame[0] = l;
            frame[1] = r;
        }
        let expected = self.frames.len() * std::mem::size_of::<f32>();
        let accepted = self.output.push(&self.frames);
        if accepted != expected {
            self.stats.short_transfers += 1;
            error!("short output transfer: {accepted} of {expected} bytes");
        }

        let stats = &mut self.stats;
        stats.periods += 1;
        stats.max_render = stats.max_render.max(rendered - started);
        stats.max_convolve = stats.max_convolve.max(convolved - rendered);
        stats.max_period = stats.max_period.max(started.elapsed());
        PeriodReport::Continue
    }

    /// Forward a calibration request to the renderer.
    pub fn calibrate(&mut self) {
        self.renderer.calibrate();
    }

    /// Run periods until `flags` asks to stop or a period is fatal, then drain.
    pub fn run(&mut self, flags: &ControlFlags, timer: &mut PeriodicTimer) -> Result<ExitStatus> {
        self.start()?;
        while !flags.should_stop() {
            if flags.take_calibration() {
                self.calibrate();
            }
            if self.run_period() == PeriodReport::Fatal {
                flags.request_stop();
                break;
            }
            if let Some(late) = timer.wait() {
                self.stats.overruns += 1;
                let n = self.stats.overruns;
                if n == 1 || n % 100 == 0 {
                    warn!("deadline overrun #{n}, {late:?} late");
                }
            }
        }
        self.drain();
        Ok(self.exit)
    }

    /// Close the output and stop the renderer.
    pub fn drain(&mut self) {
        self.state = LoopState::Draining;
        self.output.stop();
        self.renderer.stop_simulation();
        self.state = LoopState::Stopped;
        let s = &self.stats;
        info!(
            "render loop stopped: {} periods, {} kernel swaps, {} short transfers, {} overruns, worst period {:?}",
            s.periods, s.bir_swaps, s.short_transfers, s.overruns, s.max_period
        );
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn exit_status(&self) -> ExitStatus {
        self.exit
    }

    /// Response the convolvers currently use.
    pub fn current_bir(&self) -> Option<&Arc<Bir>> {
        self.current.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::TrackerError;

    struct Ramp(f32);

    impl AnechoicSource for Ramp {
        fn tick(&mut self, block: &mut [f32]) {
            for s in block.iter_mut() {
                self.0 += 1.0;
                *s = self.0;
            }
        }
    }

    /// Publishes a new two-tap response every `every` periods; fails after `fail_after` reads.
    struct Scripted {
        reads: usize,
        fail_after: usize,
        every: usize,
        front: Arc<Bir>,
        fresh: bool,
        calibrations: usize,
    }

    impl Scripted {
        fn new(every: usize, fail_after: usize) -> Self {
            Self {
                reads: 0,
                fail_after,
                every,
                front: Arc::new(Bir::silent(2)),
                fresh: false,
                calibrations: 0,
            }
        }
    }

    impl AcousticRenderer for Scripted {
        fn update_listener_orientation(&mut self) -> std::result::Result<(), TrackerError> {
            self.reads += 1;
            if self.reads > self.fail_after {
                return Err(TrackerError::Disconnected("scripted".into()));
            }
            Ok(())
        }

        fn render(&mut self) {
            if (self.reads - 1) % self.every == 0 {
                let gen = self.front.generation() + 1;
                let mut bir = Bir::from_pair(vec![gen as f32, 0.0], vec![0.0, 0.0]).unwrap();
                bir.set_generation(gen);
                self.front = Arc::new(bir);
                self.fresh = true;
            }
        }

        fn bir(&self) -> Arc<Bir> {
            Arc::clone(&self.front)
        }

        fn is_new_bir(&mut self) -> bool {
            std::mem::take(&mut self.fresh)
        }

        fn calibrate(&mut self) {
            self.calibrations += 1;
        }
    }

    /// Records every kernel and scales its input by the first tap.
    #[derive(Default)]
    struct Scale {
        gain: f32,
        swaps: usize,
    }

    impl Convolution for Scale {
        fn set_filter(&mut self, kernel: &[f32]) -> usize {
            self.gain = kernel[0];
            self.swaps += 1;
            kernel.len()
        }

        fn convolve(&mut self, input: &[f32], output: &mut [f32]) {
            for (o, i) in output.iter_mut().zip(input) {
                *o = i * self.gain;
            }
        }

        fn reset(&mut self) {}
    }

    #[derive(Default)]
    struct Capture {
        open: bool,
        frames: Vec<f32>,
        limit: Option<usize>,
    }

    impl OutputSink for Capture {
        fn start(&mut self) -> Result<()> {
            self.open = true;
            Ok(())
        }

        fn push(&mut self, frames: &[f32]) -> usize {
            let n = self.limit.map_or(frames.len(), |l| l.min(frames.len()));
            self.frames.extend_from_slice(&frames[..n]);
            n * 4
        }

        fn stop(&mut self) {
            self.open = false;
        }
    }

    fn cycle(every: usize, fail_after: usize) -> RenderCycle<Ramp, Scripted, Capture, Scale> {
        RenderCycle::new(
            Ramp(0.0),
            Scripted::new(every, fail_after),
            Capture::default(),
            Scale::default(),
            Scale::default(),
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_period_interleaves_convolved_block() {
        let mut c = cycle(100, usize::MAX);
        c.start().unwrap();
        assert_eq!(c.state(), LoopState::Periodic);
        assert_eq!(c.run_period(), PeriodReport::Continue);
        // Left kernel gain 1 (generation 1), right kernel silent.
        assert_eq!(c.output().frames, vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 0.0]);
        assert_eq!(c.current_bir().map(|b| b.generation()), Some(1));
    }

    #[test]
    fn test_kernel_swaps_only_on_new_response() {
        let mut c = cycle(3, usize::MAX);
        c.start().unwrap();
        for _ in 0..7 {
            c.run_period();
        }
        // New responses at reads 1, 4, 7.
        assert_eq!(c.stats().bir_swaps, 3);
        assert_eq!(c.left.swaps, 3);
        assert_eq!(c.right.swaps, 3);
        assert_eq!(c.left.gain, 3.0);
    }

    #[test]
    fn test_tracker_failure_is_fatal() {
        let mut c = cycle(1, 2);
        c.start().unwrap();
        assert_eq!(c.run_period(), PeriodReport::Continue);
        assert_eq!(c.run_period(), PeriodReport::Continue);
        assert_eq!(c.run_period(), PeriodReport::Fatal);
        assert_eq!(c.state(), LoopState::Draining);
        assert_eq!(c.exit_status(), ExitStatus::TrackerFailure);
        // The failed period emitted nothing.
        assert_eq!(c.output().frames.len(), 16);
    }

    #[test]
    fn test_short_transfer_is_counted_not_retried() {
        let mut c = cycle(1, usize::MAX);
        c.output.limit = Some(6);
        c.start().unwrap();
        assert_eq!(c.run_period(), PeriodReport::Continue);
        assert_eq!(c.stats().short_transfers, 1);
        assert_eq!(c.output().frames.len(), 6);
    }

    #[test]
    fn test_run_stops_on_flag() {
        let mut c = cycle(1, usize::MAX);
        let flags = ControlFlags::new();
        flags.request_stop();
        let mut timer = PeriodicTimer::new(Duration::from_millis(1), 0);
        assert_eq!(c.run(&flags, &mut timer).unwrap(), ExitStatus::Normal);
        assert_eq!(c.state(), LoopState::Stopped);
        assert_eq!(c.stats().periods, 0);
        assert!(!c.output().open);
    }

    #[test]
    fn test_run_drains_after_tracker_failure() {
        let mut c = cycle(1, 5);
        let flags = ControlFlags::new();
        flags.request_calibration();
        let mut timer = PeriodicTimer::new(Duration::from_micros(200), 0);
        assert_eq!(c.run(&flags, &mut timer).unwrap(), ExitStatus::TrackerFailure);
        assert!(flags.should_stop());
        assert_eq!(c.stats().periods, 5);
        assert_eq!(c.renderer().calibrations, 1);
        assert_eq!(c.state(), LoopState::Stopped);
    }

    #[test]
    fn test_late_periods_are_counted_as_overruns() {
        let mut c = cycle(1, 5);
        let flags = ControlFlags::new();
        let mut timer = PeriodicTimer::new(Duration::from_millis(1), 0);
        // Every deadline of the five good periods is already in the past.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(c.run(&flags, &mut timer).unwrap(), ExitStatus::TrackerFailure);
        assert_eq!(c.stats().periods, 5);
        assert_eq!(c.stats().overruns, 5);
    }
}
