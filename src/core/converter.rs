//! Conversion of extractor output (`*_pygpmf.json`) into canonical telemetry.

use crate::domain::model::{GpsTrack, RawStream, RawTelemetry, Telemetry};
use crate::utils::error::{CalibError, Result};
use std::str::FromStr;

pub const ACCL: &str = "ACCL";
pub const GYRO: &str = "GYRO";
pub const MAGN: &str = "MAGN";
pub const GRAV: &str = "GRAV";
pub const CORI: &str = "CORI";
pub const IORI: &str = "IORI";
pub const GPS5: &str = "GPS5";
pub const GPSP: &str = "GPSP";
pub const GPSF: &str = "GPSF";

const NS_PER_S: f64 = 1e9;

/// Maps sensor axes onto camera axes.
///
/// Written as three letters from `XYZ`: output axis `i` takes the source axis
/// named by letter `i`, a lowercase letter negates it. `YZX` turns a GoPro
/// `(z, x, y)` row into `(x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisOrientation {
    axes: [(usize, f64); 3],
}

impl AxisOrientation {
    pub const IDENTITY: AxisOrientation = AxisOrientation {
        axes: [(0, 1.0), (1, 1.0), (2, 1.0)],
    };

    pub fn apply(&self, v: &[f64]) -> [f64; 3] {
        let [(a, sa), (b, sb), (c, sc)] = self.axes;
        [v[a] * sa, v[b] * sb, v[c] * sc]
    }
}

impl FromStr for AxisOrientation {
    type Err = CalibError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CalibError::InvalidConfigValueError {
            field: "conversion.imu_orientation".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 3 {
            return Err(invalid("expected three axis letters such as YZX"));
        }

        let mut axes = [(0usize, 1.0f64); 3];
        let mut seen = [false; 3];
        for (slot, c) in chars.iter().enumerate() {
            let index = match c.to_ascii_uppercase() {
                'X' => 0,
                'Y' => 1,
                'Z' => 2,
                _ => return Err(invalid("axis letters must be X, Y or Z")),
            };
            if seen[index] {
                return Err(invalid("each axis must appear exactly once"));
            }
            seen[index] = true;
            let sign = if c.is_ascii_lowercase() { -1.0 } else { 1.0 };
            axes[slot] = (index, sign);
        }

        Ok(Self { axes })
    }
}

/// A parsed stream with rows cut to a fixed width.
struct Series<const N: usize> {
    rows: Vec<[f64; N]>,
    timestamps_s: Vec<f64>,
}

impl<const N: usize> Series<N> {
    fn from_raw(name: &str, raw: RawStream) -> Result<Self> {
        if raw.data.len() != raw.timestamps_s.len() {
            return Err(CalibError::ConversionError {
                message: format!(
                    "stream {} has {} samples but {} timestamps",
                    name,
                    raw.data.len(),
                    raw.timestamps_s.len()
                ),
            });
        }
        if raw.timestamps_s.windows(2).any(|w| w[1] < w[0]) {
            return Err(CalibError::ConversionError {
                message: format!("timestamps of stream {} are not increasing", name),
            });
        }

        let mut rows = Vec::with_capacity(raw.data.len());
        for (i, sample) in raw.data.iter().enumerate() {
            let values = sample.values();
            if values.len() < N {
                return Err(CalibError::ConversionError {
                    message: format!(
                        "sample {} of stream {} has {} values, expected {}",
                        i,
                        name,
                        values.len(),
                        N
                    ),
                });
            }
            let mut row = [0.0; N];
            row.copy_from_slice(&values[..N]);
            rows.push(row);
        }

        Ok(Self {
            rows,
            timestamps_s: raw.timestamps_s,
        })
    }

    /// Drops every sample before `start_s`.
    fn trim_before(mut self, start_s: f64) -> Self {
        let keep_from = self.timestamps_s.partition_point(|&t| t < start_s);
        self.rows.drain(..keep_from);
        self.timestamps_s.drain(..keep_from);
        self
    }

    fn timestamps_ns(&self) -> Vec<f64> {
        self.timestamps_s.iter().map(|t| t * NS_PER_S).collect()
    }

    /// Linear interpolation at `t`; `None` outside the covered span.
    fn interpolate(&self, t: f64) -> Option<[f64; N]> {
        let ts = &self.timestamps_s;
        let (first, last) = (*ts.first()?, *ts.last()?);
        if t < first || t > last {
            return None;
        }

        let i1 = ts.partition_point(|&x| x < t);
        if ts[i1] == t {
            return Some(self.rows[i1]);
        }
        let i0 = i1 - 1;
        let alpha = (t - ts[i0]) / (ts[i1] - ts[i0]);

        let mut out = [0.0; N];
        for (k, value) in out.iter_mut().enumerate() {
            *value = self.rows[i0][k] + alpha * (self.rows[i1][k] - self.rows[i0][k]);
        }
        Some(out)
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConverter {
    orientation: AxisOrientation,
    skip_seconds: f64,
}

impl Default for TelemetryConverter {
    fn default() -> Self {
        Self {
            orientation: AxisOrientation::IDENTITY,
            skip_seconds: 0.0,
        }
    }
}

impl TelemetryConverter {
    pub fn new(orientation: AxisOrientation, skip_seconds: f64) -> Self {
        Self {
            orientation,
            skip_seconds,
        }
    }

    pub fn convert_pygpmf_telemetry(&self, raw: &RawTelemetry) -> Result<Telemetry> {
        let gyro: Series<3> = required(raw, GYRO)?;
        let accl: Series<3> = required(raw, ACCL)?;

        let start_s = match gyro.timestamps_s.first() {
            Some(t0) => t0 + self.skip_seconds,
            None => {
                return Err(CalibError::ConversionError {
                    message: "gyroscope stream is empty".to_string(),
                })
            }
        };
        let gyro = gyro.trim_before(start_s);

        let mut telemetry = Telemetry::default();
        for (t, g) in gyro.timestamps_s.iter().zip(&gyro.rows) {
            // gyro samples outside the accelerometer span have no partner
            if let Some(a) = accl.interpolate(*t) {
                telemetry.gyroscope.push(self.orientation.apply(g));
                telemetry.accelerometer.push(self.orientation.apply(&a));
                telemetry.timestamps_ns.push(t * NS_PER_S);
            }
        }

        if telemetry.timestamps_ns.is_empty() {
            return Err(CalibError::ConversionError {
                message: format!(
                    "no overlapping accelerometer and gyroscope samples after skipping {}s",
                    self.skip_seconds
                ),
            });
        }

        if let Some(magn) = optional::<3>(raw, MAGN)? {
            let magn = magn.trim_before(start_s);
            telemetry.magnetometer_timestamps_ns = magn.timestamps_ns();
            telemetry.magnetometer = magn.rows.iter().map(|m| self.orientation.apply(m)).collect();
        }

        if let Some(grav) = optional::<3>(raw, GRAV)? {
            telemetry.gravity = grav.trim_before(start_s).rows;
        }

        if let Some(cori) = optional::<4>(raw, CORI)? {
            let cori = cori.trim_before(start_s);
            telemetry.img_timestamps_ns = cori.timestamps_ns();
            telemetry.camera_fps = frame_rate(&cori.timestamps_s);
            telemetry.camera_orientation = cori.rows;
        }

        if let Some(iori) = optional::<4>(raw, IORI)? {
            telemetry.image_orientation = iori.trim_before(start_s).rows;
        }

        telemetry.gps = self.convert_gps(raw, start_s)?;

        tracing::debug!(
            "Converted {} IMU samples ({:.2}s), streams present: {}",
            telemetry.imu_sample_count(),
            telemetry.imu_duration_s(),
            raw.stream_names().collect::<Vec<_>>().join(",")
        );

        Ok(telemetry)
    }

    fn convert_gps(&self, raw: &RawTelemetry, start_s: f64) -> Result<Option<GpsTrack>> {
        let Some(gps5) = optional::<5>(raw, GPS5)? else {
            return Ok(None);
        };
        let gps5 = gps5.trim_before(start_s);

        let mut track = GpsTrack {
            timestamps_ns: gps5.timestamps_ns(),
            ..Default::default()
        };
        for [lat, lon, alt, speed_2d, speed_3d] in gps5.rows {
            track.lla.push([lat, lon, alt]);
            track.speed_2d.push(speed_2d);
            track.speed_3d.push(speed_3d);
        }

        if let Some(precision) = optional::<1>(raw, GPSP)? {
            track.precision = precision.trim_before(start_s).rows.iter().map(|r| r[0]).collect();
        }
        if let Some(fix) = optional::<1>(raw, GPSF)? {
            track.fix = fix.trim_before(start_s).rows.iter().map(|r| r[0]).collect();
        }

        Ok(Some(track))
    }
}

fn required<const N: usize>(raw: &RawTelemetry, name: &str) -> Result<Series<N>> {
    optional(raw, name)?.ok_or_else(|| CalibError::MissingStream {
        stream: name.to_string(),
    })
}

fn optional<const N: usize>(raw: &RawTelemetry, name: &str) -> Result<Option<Series<N>>> {
    raw.stream(name)?
        .map(|stream| Series::from_raw(name, stream))
        .transpose()
}

fn frame_rate(timestamps_s: &[f64]) -> Option<f64> {
    let (first, last) = (timestamps_s.first()?, timestamps_s.last()?);
    let span = last - first;
    if timestamps_s.len() < 2 || span <= 0.0 {
        return None;
    }
    Some((timestamps_s.len() - 1) as f64 / span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_with_imu(accl: RawStream, gyro: RawStream) -> RawTelemetry {
        let mut raw = RawTelemetry::default();
        raw.insert(ACCL, &accl).unwrap();
        raw.insert(GYRO, &gyro).unwrap();
        raw
    }

    fn uniform(rows: Vec<Vec<f64>>, start: f64, dt: f64) -> RawStream {
        let timestamps = (0..rows.len()).map(|i| start + i as f64 * dt).collect();
        RawStream::from_rows(rows, timestamps)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_orientation_parsing() {
        let o: AxisOrientation = "YZX".parse().unwrap();
        assert_eq!(o.apply(&[3.0, 1.0, 2.0]), [1.0, 2.0, 3.0]);

        let o: AxisOrientation = "xYz".parse().unwrap();
        assert_eq!(o.apply(&[1.0, 2.0, 3.0]), [-1.0, 2.0, -3.0]);

        assert!("XY".parse::<AxisOrientation>().is_err());
        assert!("XYY".parse::<AxisOrientation>().is_err());
        assert!("XYW".parse::<AxisOrientation>().is_err());
    }

    #[test]
    fn test_accelerometer_is_interpolated_onto_gyro_timeline() {
        let accl = RawStream::from_rows(
            vec![vec![0.0, 0.0, 9.0], vec![0.0, 0.0, 10.0]],
            vec![0.0, 1.0],
        );
        let gyro = RawStream::from_rows(
            vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2, 0.3], vec![0.1, 0.2, 0.3]],
            vec![0.0, 0.25, 1.0],
        );

        let telemetry = TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw_with_imu(accl, gyro))
            .unwrap();

        assert_eq!(telemetry.imu_sample_count(), 3);
        assert!(approx(telemetry.accelerometer[1][2], 9.25));
        assert!(approx(telemetry.accelerometer[2][2], 10.0));
        assert_eq!(telemetry.timestamps_ns, vec![0.0, 0.25e9, 1.0e9]);
        assert_eq!(telemetry.gyroscope[0], [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_gyro_outside_accelerometer_span_is_dropped() {
        let accl = uniform(vec![vec![1.0, 2.0, 3.0]; 3], 0.1, 0.1);
        let gyro = uniform(vec![vec![0.0, 0.0, 0.0]; 5], 0.0, 0.1);

        let telemetry = TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw_with_imu(accl, gyro))
            .unwrap();

        assert_eq!(telemetry.imu_sample_count(), 3);
        assert!(approx(telemetry.timestamps_ns[0], 0.1e9));
    }

    #[test]
    fn test_skip_seconds_and_axis_remap() {
        let accl = uniform(vec![vec![9.8, 0.1, 0.2]; 10], 0.0, 0.5);
        let gyro = uniform(vec![vec![0.3, 0.1, 0.2]; 10], 0.0, 0.5);
        let converter = TelemetryConverter::new("YZX".parse().unwrap(), 2.0);

        let telemetry = converter
            .convert_pygpmf_telemetry(&raw_with_imu(accl, gyro))
            .unwrap();

        assert_eq!(telemetry.imu_sample_count(), 6);
        assert!(approx(telemetry.timestamps_ns[0], 2.0e9));
        assert_eq!(telemetry.accelerometer[0], [0.1, 0.2, 9.8]);
        assert_eq!(telemetry.gyroscope[0], [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_skipping_everything_is_an_error() {
        let accl = uniform(vec![vec![0.0, 0.0, 9.8]; 4], 0.0, 0.1);
        let gyro = uniform(vec![vec![0.0, 0.0, 0.0]; 4], 0.0, 0.1);
        let converter = TelemetryConverter::new(AxisOrientation::IDENTITY, 10.0);

        let err = converter
            .convert_pygpmf_telemetry(&raw_with_imu(accl, gyro))
            .unwrap_err();
        assert!(matches!(err, CalibError::ConversionError { .. }));
    }

    #[test]
    fn test_missing_gyro_stream() {
        let mut raw = RawTelemetry::default();
        raw.insert(ACCL, &uniform(vec![vec![0.0, 0.0, 9.8]], 0.0, 0.1))
            .unwrap();

        let err = TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw)
            .unwrap_err();
        assert!(matches!(err, CalibError::MissingStream { ref stream } if stream == "GYRO"));
    }

    #[test]
    fn test_malformed_streams_are_rejected() {
        let short_rows = uniform(vec![vec![0.0, 0.0]; 2], 0.0, 0.1);
        let gyro = uniform(vec![vec![0.0, 0.0, 0.0]; 2], 0.0, 0.1);
        assert!(TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw_with_imu(short_rows, gyro.clone()))
            .is_err());

        let mismatched = RawStream::from_rows(vec![vec![0.0, 0.0, 9.8]; 3], vec![0.0, 0.1]);
        assert!(TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw_with_imu(mismatched, gyro.clone()))
            .is_err());

        let unordered = RawStream::from_rows(vec![vec![0.0, 0.0, 9.8]; 2], vec![0.2, 0.1]);
        assert!(TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw_with_imu(unordered, gyro))
            .is_err());
    }

    #[test]
    fn test_optional_streams_pass_through() {
        let mut raw = raw_with_imu(
            uniform(vec![vec![0.0, 0.0, 9.8]; 5], 0.0, 0.01),
            uniform(vec![vec![0.0, 0.0, 0.0]; 5], 0.0, 0.01),
        );
        raw.insert(CORI, &uniform(vec![vec![1.0, 0.0, 0.0, 0.0]; 31], 0.0, 1.0 / 30.0))
            .unwrap();
        raw.insert(GRAV, &uniform(vec![vec![0.0, 0.0, 1.0]; 31], 0.0, 1.0 / 30.0))
            .unwrap();
        raw.insert(
            GPS5,
            &uniform(vec![vec![47.1, 8.5, 400.0, 0.2, 0.3, 99.0]; 2], 0.0, 1.0),
        )
        .unwrap();
        raw.insert(GPSF, &RawStream {
            data: vec![crate::domain::model::Sample::Scalar(3.0)],
            timestamps_s: vec![0.0],
        })
        .unwrap();

        let telemetry = TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw)
            .unwrap();

        assert_eq!(telemetry.camera_orientation.len(), 31);
        assert_eq!(telemetry.img_timestamps_ns.len(), 31);
        assert!(approx(telemetry.camera_fps.unwrap(), 30.0));
        assert_eq!(telemetry.gravity.len(), 31);
        assert!(telemetry.magnetometer.is_empty());

        let gps = telemetry.gps.unwrap();
        assert_eq!(gps.lla, vec![[47.1, 8.5, 400.0]; 2]);
        assert_eq!(gps.speed_3d, vec![0.3, 0.3]);
        assert_eq!(gps.fix, vec![3.0]);
        assert!(gps.precision.is_empty());
    }

    fn imu_second() -> RawTelemetry {
        raw_with_imu(
            uniform(vec![vec![9.8, 0.0, 0.0]; 11], 0.0, 0.1),
            uniform(vec![vec![0.0, 0.0, 0.0]; 11], 0.0, 0.1),
        )
    }

    fn scalars(values: &[f64], timestamps_s: &[f64]) -> RawStream {
        RawStream {
            data: values
                .iter()
                .map(|v| crate::domain::model::Sample::Scalar(*v))
                .collect(),
            timestamps_s: timestamps_s.to_vec(),
        }
    }

    #[test]
    fn test_magnetometer_is_remapped_and_trimmed() {
        let mut raw = imu_second();
        raw.insert(
            MAGN,
            &RawStream::from_rows(
                vec![
                    vec![1.0, 2.0, 3.0],
                    vec![4.0, 5.0, 6.0],
                    vec![7.0, 8.0, 9.0],
                    vec![10.0, 11.0, 12.0],
                ],
                vec![0.0, 0.25, 0.5, 0.75],
            ),
        )
        .unwrap();

        let converter = TelemetryConverter::new("yZx".parse().unwrap(), 0.35);
        let telemetry = converter.convert_pygpmf_telemetry(&raw).unwrap();

        assert_eq!(
            telemetry.magnetometer,
            vec![[-8.0, 9.0, 7.0], [-11.0, 12.0, 10.0]]
        );
        assert_eq!(telemetry.magnetometer_timestamps_ns.len(), 2);
        assert!(approx(telemetry.magnetometer_timestamps_ns[0], 5e8));
        assert!(approx(telemetry.magnetometer_timestamps_ns[1], 7.5e8));
        // accelerometer goes through the same remap
        assert_eq!(telemetry.accelerometer[0], [-0.0, 0.0, 9.8]);
    }

    #[test]
    fn test_image_orientation_and_gps_precision_are_trimmed() {
        let mut raw = imu_second();
        raw.insert(
            IORI,
            &RawStream::from_rows(
                vec![
                    vec![1.0, 0.0, 0.0, 0.0],
                    vec![0.9, 0.1, 0.0, 0.0],
                    vec![0.8, 0.2, 0.0, 0.0],
                    vec![0.7, 0.3, 0.0, 0.0],
                ],
                vec![0.0, 0.2, 0.4, 0.6],
            ),
        )
        .unwrap();
        raw.insert(
            GPS5,
            &RawStream::from_rows(
                vec![
                    vec![47.0, 8.0, 400.0, 0.1, 0.2],
                    vec![47.1, 8.1, 401.0, 0.3, 0.4],
                    vec![47.2, 8.2, 402.0, 0.5, 0.6],
                ],
                vec![0.0, 0.5, 1.0],
            ),
        )
        .unwrap();
        raw.insert(GPSP, &scalars(&[900.0, 250.0, 300.0], &[0.0, 0.5, 1.0]))
            .unwrap();
        raw.insert(GPSF, &scalars(&[2.0, 3.0, 3.0], &[0.0, 0.5, 1.0]))
            .unwrap();

        let telemetry = TelemetryConverter::new(AxisOrientation::IDENTITY, 0.35)
            .convert_pygpmf_telemetry(&raw)
            .unwrap();

        assert_eq!(
            telemetry.image_orientation,
            vec![[0.8, 0.2, 0.0, 0.0], [0.7, 0.3, 0.0, 0.0]]
        );
        assert!(telemetry.camera_orientation.is_empty());

        let gps = telemetry.gps.unwrap();
        assert_eq!(gps.precision, vec![250.0, 300.0]);
        assert_eq!(gps.fix, vec![3.0, 3.0]);
        assert_eq!(gps.lla, vec![[47.1, 8.1, 401.0], [47.2, 8.2, 402.0]]);
        assert_eq!(gps.timestamps_ns.len(), 2);
        assert!(approx(gps.timestamps_ns[0], 5e8));
    }

    #[test]
    fn test_gps_precision_without_gps5_is_ignored() {
        let mut raw = imu_second();
        raw.insert(GPSP, &scalars(&[250.0], &[0.0])).unwrap();

        let telemetry = TelemetryConverter::default()
            .convert_pygpmf_telemetry(&raw)
            .unwrap();
        assert!(telemetry.gps.is_none());
    }

    #[test]
    fn test_frame_rate_needs_two_frames() {
        assert_eq!(frame_rate(&[]), None);
        assert_eq!(frame_rate(&[0.5]), None);
        assert!(approx(frame_rate(&[0.0, 0.5, 1.0]).unwrap(), 2.0));
    }
}
