use crate::utils::error::{CalibError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One row of a GPMF stream. Most streams carry vectors, a few (GPSP, GPSF)
/// carry a single number per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Sample {
    pub fn values(&self) -> &[f64] {
        match self {
            Sample::Scalar(v) => std::slice::from_ref(v),
            Sample::Vector(v) => v,
        }
    }
}

/// A single stream of the intermediate telemetry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStream {
    pub data: Vec<Sample>,
    pub timestamps_s: Vec<f64>,
}

impl RawStream {
    pub fn from_rows(rows: Vec<Vec<f64>>, timestamps_s: Vec<f64>) -> Self {
        Self {
            data: rows.into_iter().map(Sample::Vector).collect(),
            timestamps_s,
        }
    }
}

/// Intermediate telemetry as written by the extractor, keyed by FourCC.
///
/// Streams are kept as raw JSON and only parsed when asked for, so that
/// streams this tool does not understand (GPSU carries strings) never fail
/// the whole file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTelemetry {
    streams: BTreeMap<String, serde_json::Value>,
}

impl RawTelemetry {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let streams: BTreeMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        Ok(Self { streams })
    }

    pub fn insert(&mut self, name: &str, stream: &RawStream) -> Result<()> {
        self.streams
            .insert(name.to_string(), serde_json::to_value(stream)?);
        Ok(())
    }

    pub fn stream_names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    pub fn stream(&self, name: &str) -> Result<Option<RawStream>> {
        match self.streams.get(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CalibError::ConversionError {
                    message: format!("stream {} is malformed: {}", name, e),
                }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsTrack {
    /// latitude (deg), longitude (deg), altitude (m)
    pub lla: Vec<[f64; 3]>,
    pub speed_2d: Vec<f64>,
    pub speed_3d: Vec<f64>,
    pub timestamps_ns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub precision: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fix: Vec<f64>,
}

/// Canonical telemetry read by the calibration applications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub accelerometer: Vec<[f64; 3]>,
    pub gyroscope: Vec<[f64; 3]>,
    pub timestamps_ns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub magnetometer: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub magnetometer_timestamps_ns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gravity: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub camera_orientation: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_orientation: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub img_timestamps_ns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_fps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsTrack>,
}

impl Telemetry {
    pub fn imu_sample_count(&self) -> usize {
        self.timestamps_ns.len()
    }

    pub fn imu_duration_s(&self) -> f64 {
        match (self.timestamps_ns.first(), self.timestamps_ns.last()) {
            (Some(first), Some(last)) => (last - first) / 1e9,
            _ => 0.0,
        }
    }
}

/// Files belonging to one calibration video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryPaths {
    pub video: PathBuf,
    /// `<stem>_pygpmf.json`, written by the extractor
    pub raw: PathBuf,
    /// `<stem>.json`, written by the converter
    pub canonical: PathBuf,
}

impl TelemetryPaths {
    pub fn for_video(video: &Path) -> Self {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            video: video.to_path_buf(),
            raw: video.with_file_name(format!("{}_pygpmf.json", stem)),
            canonical: video.with_file_name(format!("{}.json", stem)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedTelemetry {
    pub paths: TelemetryPaths,
    /// true when an existing intermediate file was used instead of extracting
    pub reused: bool,
}

#[derive(Debug, Clone)]
pub struct ConvertedTelemetry {
    pub paths: TelemetryPaths,
    pub imu_samples: usize,
    pub imu_duration_s: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationOutcome {
    pub telemetry_json: PathBuf,
    pub output_calibration_path: PathBuf,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: String,
    pub started_at: DateTime<Utc>,
    pub paths: TelemetryPaths,
    pub telemetry_reused: bool,
    pub imu_samples: usize,
    pub stages: Vec<StageReport>,
    pub calibration: CalibrationOutcome,
}

impl RunReport {
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// What a run would do, produced without executing anything.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub paths: TelemetryPaths,
    pub extractor_command: String,
    pub calibration_command: String,
    pub reuse_existing_telemetry: bool,
}
