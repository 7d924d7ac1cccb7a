use std::sync::Arc;

use super::AcousticRenderer;
use crate::bir::Bir;
use crate::dsp::{AbsorptionModel, FdnParams, FeedbackDelayNetwork};
use crate::error::{Error, Result};
use crate::pose::{Orientation, PoseSource, Position, TrackerError};
use crate::units::{seconds_to_samples, speed_of_sound};
use crate::SAMPLE_RATE;

/*
Virtual Environment
===================

A BIR is the sum of two parts:

  direct path   one tap per ear. Arrival time is distance / c; the far ear
                is later by the Woodworth ITD  (r / c)(θ + sin θ)  and quieter
                by a head-shadow factor. θ is the interaural angle of the
                source relative to the head.

  late tail     the impulse response of the FDN, one network per ear. The
                right ear reads the lines with alternating signs so the ears
                are decorrelated. The tail does not depend on the pose and is
                computed once.

Double buffering
----------------

Two Arc<Bir> slots. `render` writes into the back slot and swaps; the render
loop holds a clone of the front one while it convolves. By the time the next
render happens the loop has dropped its older clone, so Arc::make_mut finds
the back slot unshared and writes in place, without allocating. A published
snapshot is never mutated while anyone else holds it.
*/

/// Minimum source distance in metres; keeps the 1/r gain bounded.
const MIN_DISTANCE: f32 = 0.1;
/// Level reduction at the far ear for a fully lateral source.
const HEAD_SHADOW: f32 = 0.4;

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub sample_rate: u32,
    /// BIR length per ear, samples.
    pub bir_length: usize,
    /// Re-render once the head turned by more than this many degrees.
    pub angle_threshold: f32,
    /// Source position; the listener sits at the origin.
    pub source: Position,
    /// Metres.
    pub head_radius: f32,
    /// Metres per second.
    pub speed_of_sound: f32,
    /// Late tail level relative to a direct path at 1 m.
    pub reverb_gain: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            bir_length: seconds_to_samples(1.0, SAMPLE_RATE),
            angle_threshold: 2.0,
            source: Position::from_spherical(30.0, 0.0, 2.0),
            head_radius: 0.0875,
            speed_of_sound: speed_of_sound(20.0),
            reverb_gain: 0.3,
        }
    }
}

/// Acoustic renderer driven by a pose source.
pub struct VirtualEnvironment {
    settings: RendererSettings,
    tracker: Box<dyn PoseSource>,
    orientation: Orientation,
    rendered: Option<Orientation>,
    tail_left: Vec<f32>,
    tail_right: Vec<f32>,
    front: Arc<Bir>,
    back: Arc<Bir>,
    fresh: bool,
    generation: u64,
    running: bool,
    force: bool,
}

impl VirtualEnvironment {
    pub fn new(
        settings: RendererSettings,
        fdn: &FdnParams,
        model: &AbsorptionModel,
        tracker: Box<dyn PoseSource>,
    ) -> Result<Self> {
        let len = settings.bir_length;
        if len == 0 {
            return Err(Error::InvalidBlock("BIR length is zero"));
        }

        let tail_left = late_tail(fdn, model, len)?;
        let mut right = fdn.clone();
        for (i, c) in right.output_gains.iter_mut().enumerate() {
            if i % 2 == 1 {
                *c = -*c;
            }
        }
        let tail_right = late_tail(&right, model, len)?;

        log::info!(
            "virtual environment: BIR {} samples, threshold {:.1} deg, source {:?}",
            len,
            settings.angle_threshold,
            settings.source.to_spherical()
        );
        Ok(Self {
            settings,
            tracker,
            orientation: Orientation::default(),
            rendered: None,
            tail_left,
            tail_right,
            front: Arc::new(Bir::silent(len)),
            back: Arc::new(Bir::silent(len)),
            fresh: false,
            generation: 0,
            running: false,
            force: false,
        })
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Orientation read by the last successful update.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn needs_render(&self) -> bool {
        match self.rendered {
            None => true,
            Some(last) => {
                self.force || last.max_delta(&self.orientation) > self.settings.angle_threshold
            }
        }
    }
}

/// Write the response heard with the head at `head` into `bir`.
fn synthesize(
    s: &RendererSettings,
    head: Orientation,
    tails: (&[f32], &[f32]),
    bir: &mut Bir,
) {
    let (left, right) = bir.ears_mut();
    for (dst, src) in left.iter_mut().zip(tails.0) {
        *dst = src * s.reverb_gain;
    }
    for (dst, src) in right.iter_mut().zip(tails.1) {
        *dst = src * s.reverb_gain;
    }

    let (azimuth, elevation, distance) = s.source.to_spherical();
    let relative = Orientation::new(
        azimuth - head.azimuth(),
        elevation - head.elevation(),
        0.0,
    );
    let theta = relative.azimuth().to_radians();
    let phi = relative.elevation().to_radians();
    // Angle off the median plane; positive to the right.
    let lateral = (theta.sin() * phi.cos()).clamp(-1.0, 1.0).asin();

    let c = s.speed_of_sound;
    let rate = s.sample_rate as f32;
    let arrival = distance / c * rate;
    let itd = s.head_radius / c * (lateral.abs() + lateral.abs().sin()) * rate;
    let near = 1.0 / distance.max(MIN_DISTANCE);
    let far = near * (1.0 - HEAD_SHADOW * lateral.sin().abs());

    let (left_delay, left_gain, right_delay, right_gain) = if lateral >= 0.0 {
        (arrival + itd, far, arrival, near)
    } else {
        (arrival, near, arrival + itd, far)
    };
    add_tap(left, left_delay, left_gain);
    add_tap(right, right_delay, right_gain);
}

/// Add `gain` at a fractional position, split over the two nearest samples.
fn add_tap(ear: &mut [f32], position: f32, gain: f32) {
    // Also rules out NaN and positions that would saturate the index cast.
    if !(0.0..ear.len() as f32).contains(&position) {
        return;
    }
    let index = position.floor();
    let frac = position - index;
    let index = index as usize;
    if let Some(s) = ear.get_mut(index) {
        *s += gain * (1.0 - frac);
    }
    if let Some(s) = ear.get_mut(index + 1) {
        *s += gain * frac;
    }
}

/// Late reverberation tail of `params`: the network's response to a unit
/// impulse, with the warm-up state's own free response removed.
pub fn late_tail(params: &FdnParams, model: &AbsorptionModel, len: usize) -> Result<Vec<f32>> {
    let mut excited = FeedbackDelayNetwork::new(params, model)?;
    let mut idle = excited.clone();
    Ok((0..len)
        .map(|n| {
            let x = if n == 0 { 1.0 } else { 0.0 };
            (excited.tick(x) - idle.tick(0.0)) as f32
        })
        .collect())
}

impl AcousticRenderer for VirtualEnvironment {
    fn start_simulation(&mut self) {
        self.running = true;
        log::debug!("simulation started");
    }

    fn stop_simulation(&mut self) {
        self.running = false;
        log::debug!("simulation stopped after {} renders", self.generation);
    }

    fn update_listener_orientation(&mut self) -> std::result::Result<(), TrackerError> {
        self.orientation = self.tracker.read()?;
        Ok(())
    }

    fn render(&mut self) {
        if !self.running || !self.needs_render() {
            return;
        }
        self.generation += 1;
        let bir = Arc::make_mut(&mut self.back);
        synthesize(
            &self.settings,
            self.orientation,
            (self.tail_left.as_slice(), self.tail_right.as_slice()),
            bir,
        );
        bir.set_generation(self.generation);
        std::mem::swap(&mut self.front, &mut self.back);
        self.rendered = Some(self.orientation);
        self.force = false;
        self.fresh = true;
    }

    fn bir(&self) -> Arc<Bir> {
        Arc::clone(&self.front)
    }

    fn is_new_bir(&mut self) -> bool {
        std::mem::take(&mut self.fresh)
    }

    fn calibrate(&mut self) {
        self.tracker.calibrate();
        self.force = true;
        log::info!("tracker recentred");
    }
}
