use std::sync::atomic::{AtomicBool, Ordering};

/// The only state shared between the render thread and everything else.
///
/// Both flags are written with `Release` and read with `Acquire`, so a request
/// made by the command thread or a signal handler is seen by the render loop at
/// its next period boundary. Neither side ever waits on the other.
#[derive(Debug, Default)]
pub struct ControlFlags {
    terminate: AtomicBool,
    calibrate: AtomicBool,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop to wind down.
    pub fn request_stop(&self) {
        self.terminate.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Ask the render loop to recentre the tracker.
    pub fn request_calibration(&self) {
        self.calibrate.store(true, Ordering::Release);
    }

    /// Consume a pending calibration request.
    pub fn take_calibration(&self) -> bool {
        self.calibrate.swap(false, Ordering::AcqRel)
    }
}

/// How the render loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Quit command or signal.
    Normal,
    /// The pose provider failed mid-run.
    TrackerFailure,
}

impl ExitStatus {
    /// Process exit code.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Normal => 0,
            ExitStatus::TrackerFailure => -1,
        }
    }
}
