use crate::core::{ExecutionPlan, Pipeline, RunReport, StageReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::{Duration, Instant};

const BANNER: &str = "==================================================================";

pub const STAGE_EXTRACT: &str = "telemetry_extraction";
pub const STAGE_TRANSFORM: &str = "telemetry_conversion";
pub const STAGE_LOAD: &str = "static_multi_pose_calibration";

/// Runs the pipeline stages in order, timing and logging each one.
pub struct CalibrationEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> CalibrationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started_at = chrono::Utc::now();
        let execution_id = format!("static_calib_{}", started_at.format("%Y%m%d_%H%M%S"));
        tracing::info!("🚀 Starting static IMU calibration run {}", execution_id);
        self.monitor.log_stats("Run started");

        let mut stages = Vec::with_capacity(3);

        stage_banner("Extracting GoPro telemetry.");
        let start = Instant::now();
        let extracted = self.pipeline.extract().await?;
        let elapsed = start.elapsed();
        stage_done(&format!("Telemetry extraction took {:.2}s.", elapsed.as_secs_f64()));
        stages.push(stage(STAGE_EXTRACT, elapsed));
        self.monitor.log_stats("Telemetry extraction");

        let telemetry_reused = extracted.reused;

        stage_banner("Converting GoPro telemetry.");
        let start = Instant::now();
        let converted = self.pipeline.transform(extracted).await?;
        let elapsed = start.elapsed();
        tracing::info!(
            "🔄 Converted {} IMU samples ({:.1}s of data)",
            converted.imu_samples,
            converted.imu_duration_s
        );
        stage_done(&format!("Telemetry conversion took {:.2}s.", elapsed.as_secs_f64()));
        stages.push(stage(STAGE_TRANSFORM, elapsed));
        self.monitor.log_stats("Telemetry conversion");

        let paths = converted.paths.clone();
        let imu_samples = converted.imu_samples;

        stage_banner("Performing static multi pose IMU calibration.");
        let start = Instant::now();
        let calibration = self.pipeline.load(converted).await?;
        let elapsed = start.elapsed();
        stage_done(&format!(
            "Static multi pose IMU calibration took {:.2}s.",
            elapsed.as_secs_f64()
        ));
        stages.push(stage(STAGE_LOAD, elapsed));
        self.monitor.log_stats("Calibration");

        Ok(RunReport {
            execution_id,
            started_at,
            paths,
            telemetry_reused,
            imu_samples,
            stages,
            calibration,
        })
    }

    /// Logs what a run would execute without running anything.
    pub async fn dry_run(&self) -> Result<ExecutionPlan> {
        let plan = self.pipeline.plan().await?;

        tracing::info!("🔍 DRY RUN - nothing will be executed");
        tracing::info!("  Video:       {}", plan.paths.video.display());
        tracing::info!("  Raw JSON:    {}", plan.paths.raw.display());
        tracing::info!("  Telemetry:   {}", plan.paths.canonical.display());
        if plan.reuse_existing_telemetry {
            tracing::info!("  Extraction:  skipped, existing raw telemetry is reused");
        } else {
            tracing::info!("  Extraction:  {}", plan.extractor_command);
        }
        tracing::info!("  Calibration: {}", plan.calibration_command);

        Ok(plan)
    }
}

fn stage(name: &str, duration: Duration) -> StageReport {
    StageReport {
        name: name.to_string(),
        duration,
    }
}

fn stage_banner(title: &str) {
    tracing::info!("{}", BANNER);
    tracing::info!("{}", title);
    tracing::info!("{}", BANNER);
}

fn stage_done(summary: &str) {
    tracing::info!("{}", BANNER);
    tracing::info!("⏱️ {}", summary);
    tracing::info!("{}", BANNER);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CalibrationOutcome, ConvertedTelemetry, ExtractedTelemetry, TelemetryPaths,
    };
    use crate::utils::error::CalibError;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    struct MockPipeline {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_transform: bool,
    }

    impl MockPipeline {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail_transform: false,
            }
        }

        fn paths() -> TelemetryPaths {
            TelemetryPaths::for_video(Path::new("/data/set1/GX010042.MP4"))
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for MockPipeline {
        async fn extract(&self) -> Result<ExtractedTelemetry> {
            self.calls.lock().unwrap().push("extract");
            Ok(ExtractedTelemetry {
                paths: Self::paths(),
                reused: true,
            })
        }

        async fn transform(&self, extracted: ExtractedTelemetry) -> Result<ConvertedTelemetry> {
            self.calls.lock().unwrap().push("transform");
            if self.fail_transform {
                return Err(CalibError::MissingStream {
                    stream: "GYRO".to_string(),
                });
            }
            Ok(ConvertedTelemetry {
                paths: extracted.paths,
                imu_samples: 42,
                imu_duration_s: 0.2,
            })
        }

        async fn load(&self, converted: ConvertedTelemetry) -> Result<CalibrationOutcome> {
            self.calls.lock().unwrap().push("load");
            Ok(CalibrationOutcome {
                telemetry_json: converted.paths.canonical,
                output_calibration_path: PathBuf::from("/data/set1/static_calib_result.json"),
                exit_code: 0,
            })
        }

        async fn plan(&self) -> Result<ExecutionPlan> {
            self.calls.lock().unwrap().push("plan");
            Ok(ExecutionPlan {
                paths: Self::paths(),
                extractor_command: "extract".to_string(),
                calibration_command: "calibrate".to_string(),
                reuse_existing_telemetry: false,
            })
        }
    }

    #[tokio::test]
    async fn test_run_executes_stages_in_order() {
        let pipeline = MockPipeline::new();
        let calls = pipeline.calls.clone();
        let engine = CalibrationEngine::new(pipeline);

        let report = engine.run().await.unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["extract", "transform", "load"]);
        let names: Vec<_> = report.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![STAGE_EXTRACT, STAGE_TRANSFORM, STAGE_LOAD]);
        assert!(report.telemetry_reused);
        assert_eq!(report.imu_samples, 42);
        assert_eq!(report.calibration.exit_code, 0);
        assert!(report.execution_id.starts_with("static_calib_"));
        assert_eq!(
            report.total_duration(),
            report.stages.iter().map(|s| s.duration).sum()
        );
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_each_stage_is_announced_and_timed() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let engine = CalibrationEngine::new(MockPipeline::new());

        tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(engine.run()).unwrap();
        });

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let position = |needle: &str| {
            text.find(needle)
                .unwrap_or_else(|| panic!("{needle:?} not logged in:\n{text}"))
        };
        let extract = position("Extracting GoPro telemetry.");
        let convert = position("Converting GoPro telemetry.");
        let calibrate = position("Performing static multi pose IMU calibration.");
        assert!(extract < convert && convert < calibrate);

        assert!(position("Telemetry extraction took ") < convert);
        assert!(position("Telemetry conversion took ") < calibrate);
        assert!(position("Static multi pose IMU calibration took ") > calibrate);
    }

    #[tokio::test]
    async fn test_stage_error_stops_the_run() {
        let mut pipeline = MockPipeline::new();
        pipeline.fail_transform = true;
        let calls = pipeline.calls.clone();
        let engine = CalibrationEngine::new_with_monitoring(pipeline, false);

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, CalibError::MissingStream { .. }));
        assert_eq!(*calls.lock().unwrap(), vec!["extract", "transform"]);
    }

    #[tokio::test]
    async fn test_dry_run_only_plans() {
        let pipeline = MockPipeline::new();
        let calls = pipeline.calls.clone();
        let engine = CalibrationEngine::new(pipeline);

        let plan = engine.dry_run().await.unwrap();

        assert_eq!(plan.calibration_command, "calibrate");
        assert_eq!(*calls.lock().unwrap(), vec!["plan"]);
    }

    #[test]
    fn test_report_serializes_stage_seconds() {
        let report = RunReport {
            execution_id: "static_calib_test".to_string(),
            started_at: chrono::Utc::now(),
            paths: MockPipeline::paths(),
            telemetry_reused: false,
            imu_samples: 10,
            stages: vec![stage(STAGE_EXTRACT, Duration::from_millis(1500))],
            calibration: CalibrationOutcome {
                telemetry_json: PathBuf::from("/data/set1/GX010042.json"),
                output_calibration_path: PathBuf::from("/data/set1/static_calib_result.json"),
                exit_code: 0,
            },
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stages"][0]["duration"], 1.5);
        assert_eq!(json["stages"][0]["name"], STAGE_EXTRACT);
        assert_eq!(json["calibration"]["exit_code"], 0);
    }
}
