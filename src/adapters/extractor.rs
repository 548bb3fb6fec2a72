use crate::adapters::process::{program_name, render_command_line, run_to_completion};
use crate::domain::ports::TelemetryExtractor;
use crate::utils::error::{CalibError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::ffi::OsStr;
use std::path::Path;

pub fn default_extractor_args() -> Vec<String> {
    vec![
        "--input={video}".to_string(),
        "--output={output}".to_string(),
        "--streams={streams}".to_string(),
    ]
}

/// GPMF streams requested from the extractor unless configured otherwise.
pub fn default_streams() -> Vec<String> {
    [
        "ACCL", "GYRO", "GPS5", "GPSP", "GPSU", "GPSF", "GRAV", "MAGN", "CORI", "IORI",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Runs an external GPMF extractor program, selected with `--extractor`.
///
/// The argument template may use `{video}`, `{output}` and `{streams}`;
/// streams are joined with commas. Any other `{...}` text is left alone.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn render_args(&self, video: &Path, output: &Path, streams: &[String]) -> Result<Vec<String>> {
        let re = Regex::new(r"\{(video|output|streams)\}")?;
        let video = video.to_string_lossy();
        let output = output.to_string_lossy();
        let streams = streams.join(",");

        Ok(self
            .args
            .iter()
            .map(|arg| {
                re.replace_all(arg, |caps: &regex::Captures| match &caps[1] {
                    "video" => video.to_string(),
                    "output" => output.to_string(),
                    _ => streams.clone(),
                })
                .into_owned()
            })
            .collect())
    }
}

#[async_trait]
impl TelemetryExtractor for CommandExtractor {
    async fn extract(&self, video: &Path, output: &Path, streams: &[String]) -> Result<()> {
        let args = self.render_args(video, output, streams)?;
        run_to_completion(OsStr::new(&self.program), &args).await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(CalibError::MissingOutput {
                program: program_name(OsStr::new(&self.program)),
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }

    fn describe(&self, video: &Path, output: &Path, streams: &[String]) -> Result<String> {
        let args = self.render_args(video, output, streams)?;
        Ok(render_command_line(OsStr::new(&self.program), &args))
    }
}
