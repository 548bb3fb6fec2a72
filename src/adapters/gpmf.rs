use crate::core::converter::{ACCL, GYRO, MAGN};
use crate::domain::model::{RawStream, RawTelemetry};
use crate::domain::ports::TelemetryExtractor;
use crate::utils::error::{CalibError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use telemetry_parser::util::{self, IMUData};
use telemetry_parser::Input;

/// Streams the built-in parser produces. Other requested streams are skipped.
pub const SUPPORTED_STREAMS: [&str; 3] = [ACCL, GYRO, MAGN];

// normalized_imu reports gyro rates in deg/s
const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Reads the GPMF IMU streams straight from the video with `telemetry-parser`.
///
/// Samples keep the sensor axis order (`XYZ`); remapping to the camera frame
/// is left to the converter.
#[derive(Debug, Clone, Default)]
pub struct GpmfExtractor;

impl GpmfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Parses `video` and returns the requested streams in the intermediate layout.
    pub fn read_streams(video: &Path, streams: &[String]) -> Result<RawTelemetry> {
        let samples = read_imu(video)?;
        imu_to_raw(&samples, streams)
    }
}

fn read_imu(video: &Path) -> Result<Vec<IMUData>> {
    let extraction_error = |message: String| CalibError::ExtractionError {
        path: video.to_path_buf(),
        message,
    };

    let mut stream = std::fs::File::open(video)?;
    let filesize = stream.metadata()?.len() as usize;

    let input = Input::from_stream(
        &mut stream,
        filesize,
        video,
        |_| (),
        Arc::new(AtomicBool::new(false)),
    )
    .map_err(|e| extraction_error(e.to_string()))?;

    tracing::info!(
        "📷 Detected camera: {} {}",
        input.camera_type(),
        input.camera_model().map(String::as_str).unwrap_or("")
    );

    util::normalized_imu(&input, Some("XYZ".to_string()))
        .map_err(|e| extraction_error(e.to_string()))
}

fn imu_to_raw(samples: &[IMUData], streams: &[String]) -> Result<RawTelemetry> {
    let mut raw = RawTelemetry::default();

    for name in streams {
        let pick: fn(&IMUData) -> Option<[f64; 3]> = match name.as_str() {
            ACCL => |s| s.accl,
            GYRO => |s| s.gyro.map(|g| g.map(|v| v * DEG_TO_RAD)),
            MAGN => |s| s.magn,
            other => {
                tracing::debug!("Stream {} is not read by the built-in GPMF parser", other);
                continue;
            }
        };

        let (rows, timestamps_s): (Vec<Vec<f64>>, Vec<f64>) = samples
            .iter()
            .filter_map(|s| pick(s).map(|v| (v.to_vec(), s.timestamp_ms / 1000.0)))
            .unzip();

        if rows.is_empty() {
            if name == ACCL || name == GYRO {
                return Err(CalibError::MissingStream {
                    stream: name.clone(),
                });
            }
            continue;
        }

        tracing::debug!("{}: {} samples", name, rows.len());
        raw.insert(name, &RawStream::from_rows(rows, timestamps_s))?;
    }

    Ok(raw)
}

#[async_trait]
impl TelemetryExtractor for GpmfExtractor {
    async fn extract(&self, video: &Path, output: &Path, streams: &[String]) -> Result<()> {
        let video_path = video.to_path_buf();
        let requested = streams.to_vec();

        // parsing is blocking and panics on some malformed containers
        let raw = tokio::task::spawn_blocking(move || Self::read_streams(&video_path, &requested))
            .await
            .map_err(|e| CalibError::ExtractionError {
                path: video.to_path_buf(),
                message: e.to_string(),
            })??;

        let json = serde_json::to_vec(&raw)?;
        tokio::fs::write(output, json).await?;
        Ok(())
    }

    fn describe(&self, video: &Path, output: &Path, streams: &[String]) -> Result<String> {
        let read: Vec<&str> = streams
            .iter()
            .map(String::as_str)
            .filter(|s| SUPPORTED_STREAMS.contains(s))
            .collect();
        Ok(format!(
            "telemetry-parser {} -> {} ({})",
            video.display(),
            output.display(),
            read.join(",")
        ))
    }
}
