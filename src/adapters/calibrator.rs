use crate::adapters::process::{render_command_line, run_to_completion};
use crate::domain::ports::{CalibrationJob, CalibrationRunner, ConfigProvider};
use crate::utils::error::{CalibError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const CALIBRATION_BINARY: &str = "static_imu_calibration";
pub const CALIBRATION_RESULT_FILE: &str = "static_calib_result.json";

/// Formats a float like Python's `str(float)`: shortest round-trip digits,
/// a fractional part on whole numbers (`15.0`) and a signed two digit
/// exponent outside `[1e-4, 1e16)` (`1e-07`, `1e+16`).
pub fn format_flag_float(value: f64) -> String {
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

impl CalibrationJob {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C, telemetry_json: &Path) -> Self {
        Self {
            telemetry_json: telemetry_json.to_path_buf(),
            gravity_magnitude: config.gravity_magnitude(),
            initial_static_interval_s: config.initial_static_duration_s(),
            verbosity: config.verbosity(),
            output_calibration_path: config.dataset_path().join(CALIBRATION_RESULT_FILE),
        }
    }

    pub fn arguments(&self) -> Vec<String> {
        vec![
            format!("--telemetry_json={}", self.telemetry_json.display()),
            format!("--gravity_magnitude={}", format_flag_float(self.gravity_magnitude)),
            format!(
                "--initial_static_interval_s={}",
                format_flag_float(self.initial_static_interval_s)
            ),
            format!("--verbose={}", self.verbosity),
            format!(
                "--output_calibration_path={}",
                self.output_calibration_path.display()
            ),
            "--logtostderr=1".to_string(),
        ]
    }
}

/// The `static_imu_calibration` executable from the applications build folder.
#[derive(Debug, Clone)]
pub struct BinaryCalibrator {
    executable: PathBuf,
}

impl BinaryCalibrator {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    pub fn in_build_dir(build_path: &Path) -> Self {
        Self::new(build_path.join(format!(
            "{}{}",
            CALIBRATION_BINARY,
            std::env::consts::EXE_SUFFIX
        )))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

#[async_trait]
impl CalibrationRunner for BinaryCalibrator {
    async fn run(&self, job: &CalibrationJob) -> Result<i32> {
        if !tokio::fs::try_exists(&self.executable).await.unwrap_or(false) {
            return Err(CalibError::ExecutableNotFound {
                path: self.executable.clone(),
            });
        }
        run_to_completion(self.executable.as_os_str(), &job.arguments()).await
    }

    fn describe(&self, job: &CalibrationJob) -> String {
        render_command_line(self.executable.as_os_str(), &job.arguments())
    }
}
