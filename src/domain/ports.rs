use crate::domain::model::{
    CalibrationOutcome, ConvertedTelemetry, ExecutionPlan, ExtractedTelemetry,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &Path)
        -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &Path) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn dataset_path(&self) -> &Path;
    fn build_path(&self) -> &Path;
    fn gravity_magnitude(&self) -> f64;
    fn initial_static_duration_s(&self) -> f64;
    fn verbosity(&self) -> i32;
    fn video_extension(&self) -> &str;
    fn telemetry_streams(&self) -> &[String];
    fn skip_seconds(&self) -> f64;
    fn imu_orientation(&self) -> &str;
    fn reuse_telemetry(&self) -> bool;
}

/// Pulls the GPMF streams out of a video into the intermediate JSON file.
#[async_trait]
pub trait TelemetryExtractor: Send + Sync {
    async fn extract(&self, video: &Path, output: &Path, streams: &[String]) -> Result<()>;

    /// Human readable command line, used for logging and dry runs.
    fn describe(&self, video: &Path, output: &Path, streams: &[String]) -> Result<String>;
}

/// Everything the calibration binary is told on its command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationJob {
    pub telemetry_json: std::path::PathBuf,
    pub gravity_magnitude: f64,
    pub initial_static_interval_s: f64,
    pub verbosity: i32,
    pub output_calibration_path: std::path::PathBuf,
}

#[async_trait]
pub trait CalibrationRunner: Send + Sync {
    /// Runs the calibration and returns the exit code of a successful run.
    async fn run(&self, job: &CalibrationJob) -> Result<i32>;

    fn describe(&self, job: &CalibrationJob) -> String;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractedTelemetry>;
    async fn transform(&self, extracted: ExtractedTelemetry) -> Result<ConvertedTelemetry>;
    async fn load(&self, converted: ConvertedTelemetry) -> Result<CalibrationOutcome>;
    async fn plan(&self) -> Result<ExecutionPlan>;
}
