// Adapters layer: telemetry extraction and the calibration binary.

pub mod calibrator;
pub mod extractor;
pub mod gpmf;
pub mod process;

pub use calibrator::BinaryCalibrator;
pub use extractor::CommandExtractor;
pub use gpmf::GpmfExtractor;
