//! Collaborator capabilities of the render loop, and their implementations.
//!
//! The loop only talks to these traits; the concrete sources, renderer and
//! output sink live in the submodules.

use std::sync::Arc;

use crate::bir::Bir;
use crate::pose::TrackerError;

/// Anechoic input sources (noise, looping wave buffer).
pub mod source;
/// Bounded output queue between the render loop and playback.
pub mod output;
/// Audio device playback draining the output queue.
pub mod player;
/// Acoustic renderer producing binaural impulse responses.
pub mod renderer;

pub use output::{output_queue, DiscardSink, QueueOutput, QueueReader};
pub use player::Player;
pub use renderer::{RendererSettings, VirtualEnvironment};
pub use source::{LoopSource, NoiseSource};

/// Produces one dry (anechoic) block per period.
pub trait AnechoicSource: Send {
    /// Overwrite `block` with the next samples.
    fn tick(&mut self, block: &mut [f32]);
}

impl<S: AnechoicSource + ?Sized> AnechoicSource for Box<S> {
    fn tick(&mut self, block: &mut [f32]) {
        (**self).tick(block)
    }
}

/// Turns a listener pose into a binaural impulse response.
///
/// Called from the realtime thread once per period; none of these may block
/// or allocate once the simulation has started.
pub trait AcousticRenderer: Send {
    fn start_simulation(&mut self) {}

    fn stop_simulation(&mut self) {}

    /// Pull the latest pose from the tracker.
    fn update_listener_orientation(&mut self) -> Result<(), TrackerError>;

    /// Produce a new response if the pose warrants one.
    fn render(&mut self);

    /// Most recently completed response.
    fn bir(&self) -> Arc<Bir>;

    /// True once after each newly completed response.
    fn is_new_bir(&mut self) -> bool;

    /// Re-centre the pose reference.
    fn calibrate(&mut self);
}

/// Accepts interleaved stereo frames from the render loop.
pub trait OutputSink: Send {
    fn start(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Offer `frames` (interleaved L/R) without blocking. Returns the number of
    /// bytes accepted, always a whole number of frames.
    fn push(&mut self, frames: &[f32]) -> usize;

    /// Flush and close. Later pushes are refused.
    fn stop(&mut self) {}
}
