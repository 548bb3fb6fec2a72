use crate::adapters::extractor::{default_extractor_args, default_streams};
use crate::core::converter::AxisOrientation;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::{
    validate_contains_all, validate_non_empty_string, validate_non_negative_finite, validate_path,
    validate_positive_finite, validate_range, Validate,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_GRAVITY_MAGNITUDE: f64 = 9.811104;
pub const DEFAULT_INITIAL_STATIC_DURATION_S: f64 = 15.0;
pub const DEFAULT_VIDEO_EXTENSION: &str = "MP4";
pub const DEFAULT_IMU_ORIENTATION: &str = "YZX";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorSettings {
    /// External extractor; `None` reads the video with the built-in GPMF parser.
    pub program: Option<String>,
    pub args: Vec<String>,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: default_extractor_args(),
        }
    }
}

/// Fully resolved settings for one calibration run.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationConfig {
    pub dataset_path: PathBuf,
    pub build_path: PathBuf,
    pub gravity_magnitude: f64,
    pub initial_static_duration_s: f64,
    pub verbosity: i32,
    pub video_extension: String,
    pub telemetry_streams: Vec<String>,
    pub skip_seconds: f64,
    pub imu_orientation: String,
    pub reuse_telemetry: bool,
    pub extractor: ExtractorSettings,
    pub monitor: bool,
    pub log_format: LogFormat,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::new(),
            build_path: PathBuf::new(),
            gravity_magnitude: DEFAULT_GRAVITY_MAGNITUDE,
            initial_static_duration_s: DEFAULT_INITIAL_STATIC_DURATION_S,
            verbosity: 0,
            video_extension: DEFAULT_VIDEO_EXTENSION.to_string(),
            telemetry_streams: default_streams(),
            skip_seconds: 0.0,
            imu_orientation: DEFAULT_IMU_ORIENTATION.to_string(),
            reuse_telemetry: false,
            extractor: ExtractorSettings::default(),
            monitor: false,
            log_format: LogFormat::Text,
        }
    }
}

impl CalibrationConfig {
    /// Sets the video extension, dropping a leading dot (`.mp4` -> `mp4`).
    pub fn set_video_extension(&mut self, extension: &str) {
        self.video_extension = extension.trim().trim_start_matches('.').to_string();
    }
}

impl Validate for CalibrationConfig {
    fn validate(&self) -> Result<()> {
        validate_path("dataset.path", &self.dataset_path)?;
        validate_path("calibration.build_path", &self.build_path)?;
        validate_positive_finite("calibration.gravity_magnitude", self.gravity_magnitude)?;
        validate_range(
            "calibration.gravity_magnitude",
            self.gravity_magnitude,
            0.0,
            100.0,
        )?;
        validate_positive_finite(
            "calibration.initial_static_duration_s",
            self.initial_static_duration_s,
        )?;
        validate_non_negative_finite("conversion.skip_seconds", self.skip_seconds)?;
        validate_non_empty_string("dataset.video_extension", &self.video_extension)?;
        self.imu_orientation.parse::<AxisOrientation>()?;
        validate_contains_all("extractor.streams", &self.telemetry_streams, &["ACCL", "GYRO"])?;
        if let Some(program) = &self.extractor.program {
            validate_non_empty_string("extractor.program", program)?;
        }
        Ok(())
    }
}

impl ConfigProvider for CalibrationConfig {
    fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    fn build_path(&self) -> &Path {
        &self.build_path
    }

    fn gravity_magnitude(&self) -> f64 {
        self.gravity_magnitude
    }

    fn initial_static_duration_s(&self) -> f64 {
        self.initial_static_duration_s
    }

    fn verbosity(&self) -> i32 {
        self.verbosity
    }

    fn video_extension(&self) -> &str {
        &self.video_extension
    }

    fn telemetry_streams(&self) -> &[String] {
        &self.telemetry_streams
    }

    fn skip_seconds(&self) -> f64 {
        self.skip_seconds
    }

    fn imu_orientation(&self) -> &str {
        &self.imu_orientation
    }

    fn reuse_telemetry(&self) -> bool {
        self.reuse_telemetry
    }
}
