use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use thread_priority::{get_current_thread_priority, set_current_thread_priority, ThreadPriority};

use super::command::{run_command_loop, CommandInput};
use super::control::{ControlFlags, ExitStatus};
use super::cycle::{CycleStats, RenderCycle};
use super::timer::PeriodicTimer;
use crate::config::{InputConfig, InputKind, SystemConfig, TrackerConfig, TrackerMode};
use crate::dsp::{Convolution, PartitionedConvolver};
use crate::error::{Error, Result};
use crate::io::{
    output_queue, AcousticRenderer, AnechoicSource, DiscardSink, LoopSource, NoiseSource,
    OutputSink, Player, VirtualEnvironment,
};
use crate::pose::{ConstantPose, Orientation, PoseSource, TrajectoryPose};

/// How often the command loop re-checks the stop flag while idle.
const COMMAND_POLL: Duration = Duration::from_millis(50);

/// The render cycle as `System` assembles it.
pub type SystemCycle<O> =
    RenderCycle<Box<dyn AnechoicSource>, VirtualEnvironment, O, PartitionedConvolver>;

/// Owns the configuration and the shared control flags, and runs the two
/// threads of a session: the render loop and the console.
///
/// Not a singleton: several systems can exist, each with its own flags.
pub struct System {
    config: SystemConfig,
    flags: Arc<ControlFlags>,
}

impl System {
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "{}: {} Hz, {} samples per period ({:?}), queue {} blocks",
            config.general.name,
            config.general.sample_rate,
            config.general.block_samples,
            config.period(),
            config.output.queue_blocks
        );
        Ok(Self {
            config,
            flags: Arc::new(ControlFlags::new()),
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn flags(&self) -> Arc<ControlFlags> {
        Arc::clone(&self.flags)
    }

    /// Route SIGINT/SIGTERM to the stop flag.
    pub fn install_signal_handler(&self) -> Result<()> {
        let flags = Arc::clone(&self.flags);
        ctrlc::set_handler(move || flags.request_stop())?;
        Ok(())
    }

    /// Build every collaborator of the render thread around `output`.
    pub fn build_cycle<O: OutputSink>(&self, output: O) -> Result<SystemCycle<O>> {
        let config = &self.config;
        let block = config.general.block_samples;

        let source = build_source(&config.input, config.general.sample_rate)?;
        let tracker = build_tracker(&config.tracker, config.period())?;
        let renderer = VirtualEnvironment::new(
            config.renderer_settings(),
            &config.fdn_params(),
            &config.absorption_model()?,
            tracker,
        )?;
        let taps = config.bir_length();
        let left = PartitionedConvolver::new(block, taps)?;
        let right = PartitionedConvolver::new(block, taps)?;
        RenderCycle::new(source, renderer, output, left, right, block)
    }

    /// Run a session on the audio device (or discarding output when playback
    /// is disabled) until quit, signal or tracker failure.
    pub fn run<I: CommandInput>(&self, input: I) -> Result<ExitStatus> {
        let out = &self.config.output;
        if !out.play {
            info!("playback disabled, discarding output");
            return self.run_with(DiscardSink::new(), input);
        }
        let (queue, reader) = output_queue(self.config.general.block_samples, out.queue_blocks)?;
        let player = Player::start(reader, out.master_gain_db, self.config.general.sample_rate)?;
        let result = self.run_with(queue, input);
        player.stop();
        result
    }

    /// Run a session into any output sink.
    pub fn run_with<O, I>(&self, output: O, mut input: I) -> Result<ExitStatus>
    where
        O: OutputSink + 'static,
        I: CommandInput,
    {
        let cycle = self.build_cycle(output)?;
        let handle = spawn_render_thread(
            cycle,
            Arc::clone(&self.flags),
            self.config.period(),
            self.config.output.start_offset_periods,
        )?;

        if let Err(err) = run_command_loop(&mut input, &self.flags, COMMAND_POLL) {
            warn!("console input failed, stopping: {err}");
            self.flags.request_stop();
        }

        let (status, stats) = handle.join().map_err(|_| Error::RenderThreadPanicked)??;
        debug!(
            "worst render {:?}, worst convolution {:?}",
            stats.max_render, stats.max_convolve
        );
        info!("session ended: {status:?}");
        Ok(status)
    }
}

/// Start the render loop on its own thread at the highest priority available.
///
/// The previous priority is restored before the thread returns. If the
/// priority cannot be raised the loop still runs, without hard deadlines.
pub fn spawn_render_thread<S, R, O, C>(
    mut cycle: RenderCycle<S, R, O, C>,
    flags: Arc<ControlFlags>,
    period: Duration,
    offset_periods: u32,
) -> Result<JoinHandle<Result<(ExitStatus, CycleStats)>>>
where
    S: AnechoicSource + 'static,
    R: AcousticRenderer + 'static,
    O: OutputSink + 'static,
    C: Convolution + Send + 'static,
{
    thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let previous = get_current_thread_priority().ok();
            match set_current_thread_priority(ThreadPriority::Max) {
                Ok(()) => info!("render thread at maximum priority"),
                Err(err) => warn!("cannot raise render thread priority ({err:?}), deadlines are best-effort"),
            }

            let mut timer = PeriodicTimer::new(period, offset_periods);
            let result = cycle.run(&flags, &mut timer);
            if result.is_err() {
                flags.request_stop();
            }

            if let Some(priority) = previous {
                if let Err(err) = set_current_thread_priority(priority) {
                    debug!("could not restore render thread priority: {err:?}");
                }
            }
            result.map(|status| (status, cycle.stats().clone()))
        })
        .map_err(Error::Thread)
}

fn build_source(input: &InputConfig, sample_rate: u32) -> Result<Box<dyn AnechoicSource>> {
    match input.kind {
        InputKind::Noise => Ok(Box::new(NoiseSource::new(input.seed, input.gain))),
        InputKind::WaveLoop => {
            let path = input
                .file
                .as_deref()
                .ok_or(Error::MissingSetting("input.file"))?;
            Ok(Box::new(LoopSource::from_wav(path, input.gain, sample_rate)?))
        }
    }
}

fn build_tracker(tracker: &TrackerConfig, step: Duration) -> Result<Box<dyn PoseSource>> {
    match tracker.mode {
        TrackerMode::Constant => Ok(Box::new(ConstantPose::new(tracker.initial_orientation()))),
        TrackerMode::Trajectory => {
            let interval = tracker.read_interval();
            if let Some(file) = &tracker.file {
                return Ok(Box::new(TrajectoryPose::load(file, interval, step, tracker.looping)?));
            }
            if tracker.frames.is_empty() {
                return Err(Error::MissingSetting("tracker.file"));
            }
            let frames = tracker
                .frames
                .iter()
                .map(|&[az, el, ro]| Orientation::new(az, el, ro))
                .collect();
            Ok(Box::new(TrajectoryPose::new(frames, interval, step, tracker.looping)))
        }
    }
}
