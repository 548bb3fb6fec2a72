pub mod converter;
pub mod discovery;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{
    CalibrationOutcome, ConvertedTelemetry, ExecutionPlan, ExtractedTelemetry, RunReport,
    StageReport, TelemetryPaths,
};
pub use crate::domain::ports::{
    CalibrationJob, CalibrationRunner, ConfigProvider, Pipeline, Storage, TelemetryExtractor,
};
pub use crate::utils::error::Result;
