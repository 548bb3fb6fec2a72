pub mod cli;
pub mod settings;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::logger::LogFormat;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use settings::CalibrationConfig;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

/// Command line of the calibration driver. Flags left unset fall back to the
/// config file, then to built-in defaults.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "static-imu-calib")]
#[command(about = "GoPro static multi-pose IMU calibration driver")]
pub struct CliConfig {
    /// Path to calibration dataset
    #[arg(long = "path_static_calib_dataset")]
    pub path_static_calib_dataset: Option<PathBuf>,

    /// Path to the calibration applications build folder
    #[arg(long = "path_to_build")]
    pub path_to_build: Option<PathBuf>,

    /// Gravity constant [default: 9.811104]
    #[arg(long = "gravity_const")]
    pub gravity_const: Option<f64>,

    /// Duration of the initial static phase for bias estimation [default: 15]
    #[arg(long = "initial_static_duration_s")]
    pub initial_static_duration_s: Option<f64>,

    /// If calibration steps should output more information [default: 0]
    #[arg(long = "verbose", allow_negative_numbers = true)]
    pub verbose: Option<i32>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extension of the calibration video [default: MP4]
    #[arg(long = "video_extension")]
    pub video_extension: Option<String>,

    /// Seconds of telemetry to drop from the start [default: 0]
    #[arg(long = "skip_seconds")]
    pub skip_seconds: Option<f64>,

    /// IMU axis order, e.g. YZX; lowercase negates an axis [default: YZX]
    #[arg(long = "imu_orientation")]
    pub imu_orientation: Option<String>,

    /// External telemetry extractor program, used instead of the built-in GPMF parser
    #[arg(long)]
    pub extractor: Option<String>,

    /// Reuse an existing *_pygpmf.json instead of extracting again
    #[arg(long = "reuse_telemetry")]
    pub reuse_telemetry: bool,

    /// Show what would run without executing anything
    #[arg(long = "dry_run")]
    pub dry_run: bool,

    /// Log process resource usage after each stage
    #[arg(long)]
    pub monitor: bool,

    #[arg(long = "log_format", value_enum)]
    pub log_format: Option<LogFormat>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Builds the run configuration: flags over config file over defaults.
    pub fn resolve(&self) -> Result<CalibrationConfig> {
        let mut config = CalibrationConfig::default();

        if let Some(path) = &self.config {
            TomlConfig::from_file(path)?.apply_to(&mut config);
        }

        if let Some(path) = &self.path_static_calib_dataset {
            config.dataset_path = path.clone();
        }
        if let Some(path) = &self.path_to_build {
            config.build_path = path.clone();
        }
        if let Some(g) = self.gravity_const {
            config.gravity_magnitude = g;
        }
        if let Some(duration) = self.initial_static_duration_s {
            config.initial_static_duration_s = duration;
        }
        if let Some(verbose) = self.verbose {
            config.verbosity = verbose;
        }
        if let Some(extension) = &self.video_extension {
            config.set_video_extension(extension);
        }
        if let Some(skip) = self.skip_seconds {
            config.skip_seconds = skip;
        }
        if let Some(orientation) = &self.imu_orientation {
            config.imu_orientation = orientation.clone();
        }
        if let Some(program) = &self.extractor {
            config.extractor.program = Some(program.clone());
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        config.reuse_telemetry |= self.reuse_telemetry;
        config.monitor |= self.monitor;

        Ok(config)
    }
}
