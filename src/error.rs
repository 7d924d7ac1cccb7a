//! Error types for the auralization engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::pose::TrackerError;

/// Errors surfaced at construction time or while loading configuration.
///
/// Nothing on the per-period hot path returns one of these; the render loop
/// converts failures into a fatal shutdown trigger or a logged degradation.
#[derive(Error, Debug)]
pub enum Error {
    /// The network order must be at least one.
    #[error("invalid FDN order {0}: must be > 0")]
    InvalidOrder(usize),

    /// A per-line vector does not have exactly N entries.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which vector is malformed.
        what: &'static str,
        /// The network order.
        expected: usize,
        /// The actual length.
        got: usize,
    },

    /// A delay length is zero.
    #[error("delay line {line} has length 0")]
    ZeroDelay {
        /// Index of the offending line.
        line: usize,
    },

    /// Two delay lines share a length, which defeats decorrelation.
    #[error("delay lines {first} and {second} share the length {length}")]
    DuplicateDelay {
        /// First line with the length.
        first: usize,
        /// Second line with the length.
        second: usize,
        /// The shared length in samples.
        length: usize,
    },

    /// The feedback gain would make the network unstable.
    #[error("feedback gain {0} is outside (-1, 1)")]
    UnstableFeedback(f64),

    /// Decay times are negative, non-finite or give an unbounded tone filter.
    #[error("invalid decay times: RT at DC {rt_dc} s, RT at Nyquist {rt_pi} s")]
    InvalidDecayTime {
        /// Target RT60 at DC.
        rt_dc: f64,
        /// Target RT60 at Nyquist.
        rt_pi: f64,
    },

    /// A coefficient table does not have one row per delay line.
    #[error("{table} coefficient table has {got} rows, expected {expected}")]
    TableRows {
        /// "numerator" or "denominator".
        table: &'static str,
        /// The network order.
        expected: usize,
        /// Rows found.
        got: usize,
    },

    /// A coefficient row cannot define a filter.
    #[error("absorption filter {line}: {reason}")]
    MalformedCoefficients {
        /// Index of the offending line.
        line: usize,
        /// What is wrong with the row.
        reason: &'static str,
    },

    /// An absorption filter has a pole on or outside the unit circle.
    #[error("absorption filter {line} is unstable")]
    UnstableFilter {
        /// Index of the offending line.
        line: usize,
    },

    /// The output queue must hold at least four blocks.
    #[error("output queue of {blocks} blocks is below the minimum of {minimum}")]
    QueueCapacity {
        /// Requested capacity in blocks.
        blocks: usize,
        /// Required minimum.
        minimum: usize,
    },

    /// Block size or sample rate is zero.
    #[error("invalid block configuration: {0}")]
    InvalidBlock(&'static str),

    /// Only one of the two coefficient tables was given.
    #[error("{0} coefficient table is missing")]
    MissingTable(&'static str),

    /// A numeric table file has an unparsable entry.
    #[error("{path}:{line}: cannot parse {token:?} as a number")]
    ParseTable {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },

    /// A trajectory table row does not have three columns.
    #[error("{path}:{line}: expected 3 columns (az el ro), found {got}")]
    TrajectoryRow {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Columns found.
        got: usize,
    },

    /// File access failed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for this schema.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// WAV decoding failed.
    #[error(transparent)]
    Wav(#[from] hound::Error),

    /// The pose provider failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// The audio device could not be opened or started.
    #[error("audio device: {0}")]
    Audio(String),

    /// The termination signal handler could not be installed.
    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// The render thread could not be spawned.
    #[error("cannot spawn render thread: {0}")]
    Thread(#[source] std::io::Error),

    /// The render thread panicked instead of returning.
    #[error("render thread panicked")]
    RenderThreadPanicked,

    /// A configuration value is outside the range the engine can run with.
    #[error("configuration `{setting}` {reason}")]
    InvalidSetting {
        /// Dotted path of the setting.
        setting: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The selected mode needs a setting that was not given.
    #[error("configuration needs `{0}`")]
    MissingSetting(&'static str),
}

/// Convenience Result type for the engine.
pub type Result<T> = std::result::Result<T, Error>;
