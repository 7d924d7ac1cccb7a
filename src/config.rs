//! TOML configuration and raw ASCII tables.
//!
//! Every field has a default, so an empty file (or no file) is a runnable
//! setup. Coefficient and trajectory tables are plain text: whitespace or
//! comma separated numbers, one row per line, `#` starts a comment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dsp::{AbsorptionModel, AbsorptionTables, FdnParams};
use crate::error::{Error, Result};
use crate::io::RendererSettings;
use crate::pose::{Orientation, Position};
use crate::units::{block_period, seconds_to_samples, speed_of_sound};
use crate::{BUFFER_SAMPLES, MIN_QUEUE_BLOCKS, SAMPLE_RATE};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub fdn: FdnConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "GeneralConfig::default_name")]
    pub name: String,
    #[serde(default = "GeneralConfig::default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "GeneralConfig::default_block_samples")]
    pub block_samples: usize,
    /// Air temperature in °C; sets the speed of sound.
    #[serde(default = "GeneralConfig::default_temperature")]
    pub temperature: f32,
}

impl GeneralConfig {
    fn default_name() -> String {
        "auralize".to_string()
    }
    fn default_sample_rate() -> u32 {
        SAMPLE_RATE
    }
    fn default_block_samples() -> usize {
        BUFFER_SAMPLES
    }
    fn default_temperature() -> f32 {
        20.0
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            sample_rate: Self::default_sample_rate(),
            block_samples: Self::default_block_samples(),
            temperature: Self::default_temperature(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AbsorptionKind {
    #[default]
    Iir,
    OnePole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FdnConfig {
    #[serde(default = "FdnConfig::default_order")]
    pub order: usize,
    #[serde(default = "FdnConfig::default_feedback_gain")]
    pub feedback_gain: f64,
    #[serde(default = "FdnConfig::default_input_gains")]
    pub input_gains: Vec<f64>,
    #[serde(default = "FdnConfig::default_output_gains")]
    pub output_gains: Vec<f64>,
    #[serde(default)]
    pub direct_gain: f64,
    #[serde(default = "FdnConfig::default_delays")]
    pub delays: Vec<usize>,
    #[serde(default = "FdnConfig::default_rt_dc")]
    pub rt_dc: f64,
    #[serde(default = "FdnConfig::default_rt_pi")]
    pub rt_pi: f64,
    #[serde(default)]
    pub absorption: AbsorptionKind,
    /// Numerator table, one row per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_coeff_file: Option<PathBuf>,
    /// Denominator table, one row per line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_coeff_file: Option<PathBuf>,
}

impl FdnConfig {
    fn default_order() -> usize {
        FdnParams::default().order
    }
    fn default_feedback_gain() -> f64 {
        FdnParams::default().feedback_gain
    }
    fn default_input_gains() -> Vec<f64> {
        FdnParams::default().input_gains
    }
    fn default_output_gains() -> Vec<f64> {
        FdnParams::default().output_gains
    }
    fn default_delays() -> Vec<usize> {
        FdnParams::default().delays
    }
    fn default_rt_dc() -> f64 {
        FdnParams::default().rt_dc
    }
    fn default_rt_pi() -> f64 {
        FdnParams::default().rt_pi
    }
}

impl Default for FdnConfig {
    fn default() -> Self {
        Self {
            order: Self::default_order(),
            feedback_gain: Self::default_feedback_gain(),
            input_gains: Self::default_input_gains(),
            output_gains: Self::default_output_gains(),
            direct_gain: 0.0,
            delays: Self::default_delays(),
            rt_dc: Self::default_rt_dc(),
            rt_pi: Self::default_rt_pi(),
            absorption: AbsorptionKind::default(),
            b_coeff_file: None,
            a_coeff_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RendererConfig {
    #[serde(default = "RendererConfig::default_bir_length_sec")]
    pub bir_length_sec: f64,
    #[serde(default = "RendererConfig::default_angle_threshold")]
    pub angle_threshold: f32,
    #[serde(default = "RendererConfig::default_source_azimuth")]
    pub source_azimuth: f32,
    #[serde(default)]
    pub source_elevation: f32,
    #[serde(default = "RendererConfig::default_source_distance")]
    pub source_distance: f32,
    #[serde(default = "RendererConfig::default_head_radius")]
    pub head_radius: f32,
    #[serde(default = "RendererConfig::default_reverb_gain")]
    pub reverb_gain: f32,
}

impl RendererConfig {
    fn default_bir_length_sec() -> f64 {
        1.0
    }
    fn default_angle_threshold() -> f32 {
        2.0
    }
    fn default_source_azimuth() -> f32 {
        30.0
    }
    fn default_source_distance() -> f32 {
        2.0
    }
    fn default_head_radius() -> f32 {
        0.0875
    }
    fn default_reverb_gain() -> f32 {
        0.3
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            bir_length_sec: Self::default_bir_length_sec(),
            angle_threshold: Self::default_angle_threshold(),
            source_azimuth: Self::default_source_azimuth(),
            source_elevation: 0.0,
            source_distance: Self::default_source_distance(),
            head_radius: Self::default_head_radius(),
            reverb_gain: Self::default_reverb_gain(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerMode {
    #[default]
    Constant,
    Trajectory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(default)]
    pub mode: TrackerMode,
    /// `az el ro` table for the trajectory mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Inline trajectory, used when no file is given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<[f32; 3]>,
    #[serde(default = "TrackerConfig::default_read_interval_ms")]
    pub read_interval_ms: f32,
    #[serde(default = "TrackerConfig::default_looping")]
    pub looping: bool,
    /// Initial orientation, degrees.
    #[serde(default)]
    pub azimuth: f32,
    #[serde(default)]
    pub elevation: f32,
    #[serde(default)]
    pub roll: f32,
}

impl TrackerConfig {
    fn default_read_interval_ms() -> f32 {
        10.0
    }
    fn default_looping() -> bool {
        true
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_secs_f32(self.read_interval_ms.max(0.001) / 1000.0)
    }

    pub fn initial_orientation(&self) -> Orientation {
        Orientation::new(self.azimuth, self.elevation, self.roll)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: TrackerMode::default(),
            file: None,
            frames: Vec::new(),
            read_interval_ms: Self::default_read_interval_ms(),
            looping: Self::default_looping(),
            azimuth: 0.0,
            elevation: 0.0,
            roll: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    #[default]
    Noise,
    WaveLoop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default)]
    pub kind: InputKind,
    /// Anechoic recording for the wave-loop input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default = "InputConfig::default_seed")]
    pub seed: u64,
    #[serde(default = "InputConfig::default_gain")]
    pub gain: f32,
}

impl InputConfig {
    fn default_seed() -> u64 {
        1
    }
    fn default_gain() -> f32 {
        0.5
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            kind: InputKind::default(),
            file: None,
            seed: Self::default_seed(),
            gain: Self::default_gain(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default)]
    pub master_gain_db: f32,
    #[serde(default = "OutputConfig::default_queue_blocks")]
    pub queue_blocks: usize,
    #[serde(default = "OutputConfig::default_start_offset_periods")]
    pub start_offset_periods: u32,
    /// Play through the audio device; otherwise frames are discarded.
    #[serde(default = "OutputConfig::default_play")]
    pub play: bool,
}

impl OutputConfig {
    fn default_queue_blocks() -> usize {
        MIN_QUEUE_BLOCKS
    }
    fn default_start_offset_periods() -> u32 {
        50
    }
    fn default_play() -> bool {
        true
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            master_gain_db: 0.0,
            queue_blocks: Self::default_queue_blocks(),
            start_offset_periods: Self::default_start_offset_periods(),
            play: Self::default_play(),
        }
    }
}

impl SystemConfig {
    /// Parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SystemConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.sample_rate == 0 {
            return Err(Error::InvalidBlock("sample rate is zero"));
        }
        if self.general.block_samples == 0 {
            return Err(Error::InvalidBlock("block size is zero"));
        }
        if self.output.queue_blocks < MIN_QUEUE_BLOCKS {
            return Err(Error::QueueCapacity {
                blocks: self.output.queue_blocks,
                minimum: MIN_QUEUE_BLOCKS,
            });
        }
        if self.bir_length() == 0 {
            return Err(Error::InvalidBlock("BIR length is zero"));
        }
        if !self.tracker.read_interval_ms.is_finite() {
            return Err(Error::InvalidSetting {
                setting: "tracker.read_interval_ms",
                reason: "is not a finite number",
            });
        }
        let c = self.speed_of_sound();
        if !(c.is_finite() && c > 0.0) {
            return Err(Error::InvalidSetting {
                setting: "general.temperature",
                reason: "gives a non-positive speed of sound",
            });
        }
        Ok(())
    }

    /// Pretty TOML of the effective configuration.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Duration of one render period.
    pub fn period(&self) -> Duration {
        block_period(self.general.block_samples, self.general.sample_rate)
    }

    pub fn speed_of_sound(&self) -> f32 {
        speed_of_sound(self.general.temperature)
    }

    /// BIR length per ear, samples.
    pub fn bir_length(&self) -> usize {
        seconds_to_samples(self.renderer.bir_length_sec, self.general.sample_rate)
    }

    pub fn fdn_params(&self) -> FdnParams {
        let f = &self.fdn;
        FdnParams {
            order: f.order,
            feedback_gain: f.feedback_gain,
            input_gains: f.input_gains.clone(),
            output_gains: f.output_gains.clone(),
            direct_gain: f.direct_gain,
            delays: f.delays.clone(),
            rt_dc: f.rt_dc,
            rt_pi: f.rt_pi,
            sample_rate: self.general.sample_rate,
        }
    }

    /// Absorption model for the network.
    ///
    /// The IIR model reads both coefficient files when given; without them each
    /// line gets a flat row carrying its per-pass attenuation.
    pub fn absorption_model(&self) -> Result<AbsorptionModel> {
        match self.fdn.absorption {
            AbsorptionKind::OnePole => Ok(AbsorptionModel::OnePole),
            AbsorptionKind::Iir => match (&self.fdn.b_coeff_file, &self.fdn.a_coeff_file) {
                (Some(b), Some(a)) => Ok(AbsorptionModel::Iir(AbsorptionTables::new(
                    load_table(b)?,
                    load_table(a)?,
                ))),
                (None, None) => Ok(AbsorptionModel::Iir(AbsorptionTables::flat(&self.fdn_params()))),
                (Some(_), None) => Err(Error::MissingTable("denominator")),
                (None, Some(_)) => Err(Error::MissingTable("numerator")),
            },
        }
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        let r = &self.renderer;
        RendererSettings {
            sample_rate: self.general.sample_rate,
            bir_length: self.bir_length(),
            angle_threshold: r.angle_threshold,
            source: Position::from_spherical(r.source_azimuth, r.source_elevation, r.source_distance),
            head_radius: r.head_radius,
            speed_of_sound: self.speed_of_sound(),
            reverb_gain: r.reverb_gain,
        }
    }
}

/// Read a raw ASCII numeric table.
///
/// Blank lines and `#` comments are skipped; rows may have different lengths.
pub fn load_table(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&text, path)
}

fn parse_table(text: &str, path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let row = content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| Error::ParseTable {
                    path: path.to_path_buf(),
                    line: i + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("auralize-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SystemConfig::default();
        config.validate().unwrap();
        assert_eq!(config.bir_length(), 44_100);
        assert_eq!(config.fdn_params().delays, vec![997, 1153, 1327, 1559]);
        assert!((config.speed_of_sound() - 343.4).abs() < 1e-3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
            [fdn]
            rt_dc = 2.0
            absorption = "one-pole"

            [tracker]
            mode = "trajectory"
            frames = [[0.0, 0.0, 0.0], [15.0, 0.0, 0.0]]

            [output]
            queue_blocks = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.fdn.rt_dc, 2.0);
        assert_eq!(config.fdn.rt_pi, 0.5);
        assert_eq!(config.fdn.absorption, AbsorptionKind::OnePole);
        assert_eq!(config.tracker.mode, TrackerMode::Trajectory);
        assert_eq!(config.tracker.frames.len(), 2);
        assert_eq!(config.output.queue_blocks, 8);
        assert_eq!(config.output.start_offset_periods, 50);
        assert_eq!(config.general.block_samples, 512);
        assert!(matches!(config.absorption_model(), Ok(AbsorptionModel::OnePole)));
    }

    #[test]
    fn test_small_queue_is_rejected() {
        let mut config = SystemConfig::default();
        config.output.queue_blocks = 2;
        assert!(matches!(config.validate(), Err(Error::QueueCapacity { blocks: 2, .. })));
    }

    #[test]
    fn test_unusable_tracker_interval_is_rejected() {
        let mut config = SystemConfig::default();
        config.tracker.read_interval_ms = f32::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidSetting { setting: "tracker.read_interval_ms", .. })
        ));

        config.tracker.read_interval_ms = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_temperature_below_sound_cutoff_is_rejected() {
        let mut config = SystemConfig::default();
        // 331.4 + 0.6·T reaches zero at about -552.3 °C.
        config.general.temperature = -600.0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidSetting { setting: "general.temperature", .. })
        ));

        config.general.temperature = -40.0;
        config.validate().unwrap();
    }

    #[test]
    fn test_table_parser_skips_comments() {
        let rows = parse_table(
            "# numerator\n0.5 0.25\n\n1e-3, -2 # trailing\n   \n",
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(rows, vec![vec![0.5, 0.25], vec![1e-3, -2.0]]);
    }

    #[test]
    fn test_table_parser_reports_line() {
        let err = parse_table("1 2\n3 x4\n", Path::new("t.txt")).unwrap_err();
        match err {
            Error::ParseTable { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x4");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_coefficient_files_feed_iir_model() {
        let b = temp_file("b.txt", "0.9\n0.9\n0.9\n0.9\n");
        let a = temp_file("a.txt", "1 -0.1\n1 -0.1\n1 -0.1\n1 -0.1\n");
        let mut config = SystemConfig::default();
        config.fdn.b_coeff_file = Some(b.clone());
        config.fdn.a_coeff_file = Some(a.clone());
        let model = config.absorption_model().unwrap();
        fs::remove_file(b).ok();
        fs::remove_file(a).ok();
        match model {
            AbsorptionModel::Iir(tables) => {
                assert_eq!(tables.numerator.len(), 4);
                assert_eq!(tables.denominator[3], vec![1.0, -0.1]);
            }
            AbsorptionModel::OnePole => panic!("expected IIR tables"),
        }
    }

    #[test]
    fn test_single_coefficient_file_is_an_error() {
        let mut config = SystemConfig::default();
        config.fdn.b_coeff_file = Some(PathBuf::from("b.txt"));
        assert!(matches!(
            config.absorption_model(),
            Err(Error::MissingTable("denominator"))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SystemConfig::load(Path::new("/nonexistent/auralize.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/auralize.toml"));
    }

    #[test]
    fn test_printed_config_parses_back() {
        let mut config = SystemConfig::default();
        config.tracker.frames = vec![[1.0, 2.0, 3.0]];
        let text = config.to_toml().unwrap();
        let back: SystemConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
