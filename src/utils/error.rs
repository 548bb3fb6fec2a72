use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid glob pattern: {0}")]
    GlobPatternError(#[from] glob::PatternError),

    #[error("Invalid regular expression: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Dataset directory not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Could not find calibration video with {extension} ending in {}", path.display())]
    VideoNotFound { path: PathBuf, extension: String },

    #[error("Executable not found: {}", path.display())]
    ExecutableNotFound { path: PathBuf },

    #[error("Failed to start {program}: {source}")]
    ProcessSpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}", code.map(|c| format!("code {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    ProcessFailed { program: String, code: Option<i32> },

    #[error("{program} finished but did not write {}", path.display())]
    MissingOutput { program: String, path: PathBuf },

    #[error("Could not read GPMF telemetry from {}: {message}", path.display())]
    ExtractionError { path: PathBuf, message: String },

    #[error("Telemetry stream {stream} is missing")]
    MissingStream { stream: String },

    #[error("Telemetry conversion error: {message}")]
    ConversionError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Dataset,
    Process,
    Conversion,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CalibError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CalibError::MissingConfigError { .. }
            | CalibError::InvalidConfigValueError { .. }
            | CalibError::ConfigValidationError { .. }
            | CalibError::GlobPatternError(_)
            | CalibError::RegexError(_) => ErrorCategory::Configuration,
            CalibError::DatasetNotFound { .. } | CalibError::VideoNotFound { .. } => {
                ErrorCategory::Dataset
            }
            CalibError::ExecutableNotFound { .. }
            | CalibError::ProcessSpawnError { .. }
            | CalibError::ProcessFailed { .. }
            | CalibError::MissingOutput { .. } => ErrorCategory::Process,
            CalibError::ExtractionError { .. }
            | CalibError::MissingStream { .. }
            | CalibError::ConversionError { .. }
            | CalibError::SerializationError(_) => ErrorCategory::Conversion,
            CalibError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Dataset => ErrorSeverity::Medium,
            ErrorCategory::Conversion | ErrorCategory::Process => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Dataset => 1,
            ErrorCategory::Conversion => 2,
            ErrorCategory::Process => 3,
            ErrorCategory::System => 4,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            CalibError::VideoNotFound { path, extension } => format!(
                "Error! Could not find cam calibration video file with {} ending in path {}",
                extension,
                path.display()
            ),
            CalibError::DatasetNotFound { path } => {
                format!("Dataset folder {} does not exist", path.display())
            }
            CalibError::ExecutableNotFound { path } => {
                format!("Calibration executable {} was not found", path.display())
            }
            CalibError::ProcessFailed { program, code } => match code {
                Some(code) => format!("{} failed with exit code {}", program, code),
                None => format!("{} was terminated by a signal", program),
            },
            CalibError::MissingStream { stream } => {
                format!("The extracted telemetry has no {} stream", stream)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CalibError::VideoNotFound { .. } => {
                "Put the calibration video into the dataset folder or pass --video_extension"
            }
            CalibError::DatasetNotFound { .. } => "Check --path_static_calib_dataset",
            CalibError::ExecutableNotFound { .. } => {
                "Build the calibration applications and point --path_to_build at their folder"
            }
            CalibError::ProcessSpawnError { .. } => {
                "Make sure the program is installed and on PATH (see --extractor)"
            }
            CalibError::ProcessFailed { .. } | CalibError::MissingOutput { .. } => {
                "Inspect the tool output above, rerun with --verbose 1 for more detail"
            }
            CalibError::ExtractionError { .. } => {
                "Make sure the video is an unmodified GoPro recording with GPMF telemetry"
            }
            CalibError::MissingStream { .. } | CalibError::ConversionError { .. } => {
                "Check that the video contains GPMF telemetry and the extractor streams list"
            }
            CalibError::SerializationError(_) => "The telemetry JSON is malformed; re-extract it",
            CalibError::MissingConfigError { .. }
            | CalibError::InvalidConfigValueError { .. }
            | CalibError::ConfigValidationError { .. }
            | CalibError::GlobPatternError(_)
            | CalibError::RegexError(_) => "Fix the flag or config file value and run again",
            CalibError::IoError(_) => "Check file permissions and free disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, CalibError>;
