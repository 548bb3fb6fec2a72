use crate::config::settings::CalibrationConfig;
use crate::utils::error::{CalibError, Result};
use crate::utils::logger::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional configuration file. Every value may be omitted; command line
/// flags override whatever is set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub dataset: Option<DatasetConfig>,
    pub calibration: Option<CalibrationSection>,
    pub extractor: Option<ExtractorConfig>,
    pub conversion: Option<ConversionConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub path: Option<PathBuf>,
    pub video_extension: Option<String>,
    pub reuse_telemetry: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationSection {
    pub build_path: Option<PathBuf>,
    pub gravity_magnitude: Option<f64>,
    pub initial_static_duration_s: Option<f64>,
    pub verbose: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub streams: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    pub skip_seconds: Option<f64>,
    pub imu_orientation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    pub enabled: Option<bool>,
    pub log_format: Option<LogFormat>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CalibError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CalibError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Writes every value present in the file onto `config`.
    pub fn apply_to(&self, config: &mut CalibrationConfig) {
        if let Some(dataset) = &self.dataset {
            if let Some(path) = &dataset.path {
                config.dataset_path = path.clone();
            }
            if let Some(extension) = &dataset.video_extension {
                config.set_video_extension(extension);
            }
            if let Some(reuse) = dataset.reuse_telemetry {
                config.reuse_telemetry = reuse;
            }
        }

        if let Some(calibration) = &self.calibration {
            if let Some(build_path) = &calibration.build_path {
                config.build_path = build_path.clone();
            }
            if let Some(g) = calibration.gravity_magnitude {
                config.gravity_magnitude = g;
            }
            if let Some(duration) = calibration.initial_static_duration_s {
                config.initial_static_duration_s = duration;
            }
            if let Some(verbose) = calibration.verbose {
                config.verbosity = verbose;
            }
        }

        if let Some(extractor) = &self.extractor {
            if let Some(program) = &extractor.program {
                config.extractor.program = Some(program.clone());
            }
            if let Some(args) = &extractor.args {
                config.extractor.args = args.clone();
            }
            if let Some(streams) = &extractor.streams {
                config.telemetry_streams = streams.clone();
            }
        }

        if let Some(conversion) = &self.conversion {
            if let Some(skip) = conversion.skip_seconds {
                config.skip_seconds = skip;
            }
            if let Some(orientation) = &conversion.imu_orientation {
                config.imu_orientation = orientation.clone();
            }
        }

        if let Some(monitoring) = &self.monitoring {
            if let Some(enabled) = monitoring.enabled {
                config.monitor = enabled;
            }
            if let Some(format) = monitoring.log_format {
                config.log_format = format;
            }
        }
    }
}
