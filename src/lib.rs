pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, settings::CalibrationConfig, toml_config::TomlConfig};

pub use adapters::{BinaryCalibrator, CommandExtractor, GpmfExtractor};
pub use core::{etl::CalibrationEngine, pipeline::StaticCalibrationPipeline};
pub use utils::error::{CalibError, Result};
