//! Listener pose: positions, orientations and the trackers that produce them.
//!
//! Angles are degrees. Azimuth is measured from straight ahead, positive to the
//! right, wrapped to (-180, 180]. Elevation is positive upwards and folded into
//! [-90, 90]. Positions are metres in a right-handed frame: x right, y ahead,
//! z up.

use std::ops::{Add, Sub};
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::config::load_table;
use crate::error::{Error, Result};

/// Failures of a pose provider. Any of these ends the render loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("trajectory exhausted after {frames} frames")]
    Exhausted { frames: usize },

    #[error("tracker disconnected: {0}")]
    Disconnected(String),
}

/// Point in the room frame, metres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Point at `distance` metres in the direction (`azimuth`, `elevation`).
    pub fn from_spherical(azimuth: f32, elevation: f32, distance: f32) -> Self {
        let (az, el) = (azimuth.to_radians(), elevation.to_radians());
        Self {
            x: distance * el.cos() * az.sin(),
            y: distance * el.cos() * az.cos(),
            z: distance * el.sin(),
        }
    }

    /// (azimuth, elevation, distance) of this point seen from the origin.
    pub fn to_spherical(self) -> (f32, f32, f32) {
        let horizontal = self.x.hypot(self.y);
        let distance = horizontal.hypot(self.z);
        let azimuth = self.x.atan2(self.y).to_degrees();
        let elevation = self.z.atan2(horizontal).to_degrees();
        (azimuth, elevation, distance)
    }

    pub fn distance_to(self, other: Position) -> f32 {
        (other - self).to_spherical().2
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Head orientation in degrees. Always normalised.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    azimuth: f32,
    elevation: f32,
    roll: f32,
}

impl Orientation {
    pub fn new(azimuth: f32, elevation: f32, roll: f32) -> Self {
        let (elevation, flipped) = fold_elevation(elevation);
        // Folding elevation over a pole turns the head around.
        let azimuth = if flipped { azimuth + 180.0 } else { azimuth };
        Self {
            azimuth: wrap_degrees(azimuth),
            elevation,
            roll: wrap_degrees(roll),
        }
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// Largest per-axis angular difference to `other`, degrees.
    pub fn max_delta(&self, other: &Orientation) -> f32 {
        let d = *self - *other;
        d.azimuth
            .abs()
            .max(d.elevation.abs())
            .max(d.roll.abs())
    }
}

impl Add for Orientation {
    type Output = Orientation;

    fn add(self, rhs: Orientation) -> Orientation {
        Orientation::new(
            self.azimuth + rhs.azimuth,
            self.elevation + rhs.elevation,
            self.roll + rhs.roll,
        )
    }
}

impl Sub for Orientation {
    type Output = Orientation;

    fn sub(self, rhs: Orientation) -> Orientation {
        Orientation::new(
            self.azimuth - rhs.azimuth,
            self.elevation - rhs.elevation,
            self.roll - rhs.roll,
        )
    }
}

/// Wrap an angle into (-180, 180].
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Fold an elevation into [-90, 90]. The flag is set when the fold crossed a
/// pole, which mirrors the azimuth.
fn fold_elevation(elevation: f32) -> (f32, bool) {
    let e = wrap_degrees(elevation);
    if e > 90.0 {
        (180.0 - e, true)
    } else if e < -90.0 {
        (-180.0 - e, true)
    } else {
        (e, false)
    }
}

/// Something that reports where the listener is looking.
///
/// `read` is called once per render period from the realtime thread and must
/// not block. Readings are relative to the calibration reference.
pub trait PoseSource: Send {
    fn read(&mut self) -> std::result::Result<Orientation, TrackerError>;

    /// Make the current raw reading the new zero.
    fn calibrate(&mut self);
}

/// A tracker that never moves.
#[derive(Debug, Clone)]
pub struct ConstantPose {
    raw: Orientation,
    reference: Orientation,
}

impl ConstantPose {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            raw: orientation,
            reference: Orientation::default(),
        }
    }
}

impl PoseSource for ConstantPose {
    fn read(&mut self) -> std::result::Result<Orientation, TrackerError> {
        Ok(self.raw - self.reference)
    }

    fn calibrate(&mut self) {
        self.reference = self.raw;
    }
}

/// Replays a recorded head trajectory.
///
/// The tracker samples its table every `interval`; the render loop reads it
/// every `step` (one block period), so frames are held or skipped as the two
/// rates dictate.
#[derive(Debug, Clone)]
pub struct TrajectoryPose {
    frames: Vec<Orientation>,
    interval: Duration,
    step: Duration,
    elapsed: Duration,
    looping: bool,
    last: Orientation,
    reference: Orientation,
}

impl TrajectoryPose {
    pub fn new(frames: Vec<Orientation>, interval: Duration, step: Duration, looping: bool) -> Self {
        Self {
            frames,
            interval: interval.max(Duration::from_micros(1)),
            step,
            elapsed: Duration::ZERO,
            looping,
            last: Orientation::default(),
            reference: Orientation::default(),
        }
    }

    /// Load an `az el ro` table, one frame per row.
    pub fn load(path: &Path, interval: Duration, step: Duration, looping: bool) -> Result<Self> {
        let rows = load_table(path)?;
        let mut frames = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != 3 {
                return Err(Error::TrajectoryRow {
                    path: path.to_path_buf(),
                    line: i + 1,
                    got: row.len(),
                });
            }
            frames.push(Orientation::new(row[0] as f32, row[1] as f32, row[2] as f32));
        }
        log::info!("trajectory: {} frames from {}", frames.len(), path.display());
        Ok(Self::new(frames, interval, step, looping))
    }

    pub fn frames(&self) -> usize {
        self.frames.len()
    }
}

impl PoseSource for TrajectoryPose {
    fn read(&mut self) -> std::result::Result<Orientation, TrackerError> {
        let count = self.frames.len();
        let mut index = (self.elapsed.as_nanos() / self.interval.as_nanos()) as usize;
        if index >= count {
            if !self.looping || count == 0 {
                return Err(TrackerError::Exhausted { frames: count });
            }
            index %= count;
        }
        self.elapsed += self.step;
        self.last = self.frames[index];
        Ok(self.last - self.reference)
    }

    fn calibrate(&mut self) {
        self.reference = self.last;
    }
}
