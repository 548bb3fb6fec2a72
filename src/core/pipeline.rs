use crate::core::converter::{AxisOrientation, TelemetryConverter};
use crate::core::discovery::find_calibration_video;
use crate::core::{
    CalibrationJob, CalibrationOutcome, CalibrationRunner, ConfigProvider, ConvertedTelemetry,
    ExecutionPlan, ExtractedTelemetry, Pipeline, Storage, TelemetryExtractor, TelemetryPaths,
};
use crate::domain::model::RawTelemetry;
use crate::utils::error::Result;

/// Extract, convert and calibrate for one dataset folder.
pub struct StaticCalibrationPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    extractor: Box<dyn TelemetryExtractor>,
    calibrator: Box<dyn CalibrationRunner>,
}

impl<S: Storage, C: ConfigProvider> StaticCalibrationPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        extractor: Box<dyn TelemetryExtractor>,
        calibrator: Box<dyn CalibrationRunner>,
    ) -> Self {
        Self {
            storage,
            config,
            extractor,
            calibrator,
        }
    }

    fn locate(&self) -> Result<TelemetryPaths> {
        let video =
            find_calibration_video(self.config.dataset_path(), self.config.video_extension())?;
        tracing::info!("🎥 Calibration video: {}", video.display());
        Ok(TelemetryPaths::for_video(&video))
    }

    fn converter(&self) -> Result<TelemetryConverter> {
        let orientation: AxisOrientation = self.config.imu_orientation().parse()?;
        Ok(TelemetryConverter::new(
            orientation,
            self.config.skip_seconds(),
        ))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for StaticCalibrationPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractedTelemetry> {
        let paths = self.locate()?;

        if self.config.reuse_telemetry() && self.storage.exists(&paths.raw).await {
            tracing::info!(
                "♻️ Reusing extracted telemetry {}",
                paths.raw.display()
            );
            return Ok(ExtractedTelemetry {
                paths,
                reused: true,
            });
        }

        self.extractor
            .extract(&paths.video, &paths.raw, self.config.telemetry_streams())
            .await?;
        tracing::debug!("Telemetry written to {}", paths.raw.display());

        Ok(ExtractedTelemetry {
            paths,
            reused: false,
        })
    }

    async fn transform(&self, extracted: ExtractedTelemetry) -> Result<ConvertedTelemetry> {
        let paths = extracted.paths;
        let converter = self.converter()?;

        let bytes = self.storage.read_file(&paths.raw).await?;
        let raw = RawTelemetry::from_slice(&bytes)?;
        let telemetry = converter.convert_pygpmf_telemetry(&raw)?;

        let json = serde_json::to_vec(&telemetry)?;
        tracing::debug!(
            "Writing canonical telemetry ({} bytes) to {}",
            json.len(),
            paths.canonical.display()
        );
        self.storage.write_file(&paths.canonical, &json).await?;

        Ok(ConvertedTelemetry {
            imu_samples: telemetry.imu_sample_count(),
            imu_duration_s: telemetry.imu_duration_s(),
            paths,
        })
    }

    async fn load(&self, converted: ConvertedTelemetry) -> Result<CalibrationOutcome> {
        let job = CalibrationJob::from_config(&self.config, &converted.paths.canonical);
        tracing::debug!("Calibration command: {}", self.calibrator.describe(&job));

        let exit_code = self.calibrator.run(&job).await?;

        Ok(CalibrationOutcome {
            telemetry_json: job.telemetry_json,
            output_calibration_path: job.output_calibration_path,
            exit_code,
        })
    }

    async fn plan(&self) -> Result<ExecutionPlan> {
        let paths = self.locate()?;
        // surface a bad orientation before anything would run
        self.converter()?;

        let extractor_command =
            self.extractor
                .describe(&paths.video, &paths.raw, self.config.telemetry_streams())?;
        let job = CalibrationJob::from_config(&self.config, &paths.canonical);
        let calibration_command = self.calibrator.describe(&job);
        let reuse_existing_telemetry =
            self.config.reuse_telemetry() && self.storage.exists(&paths.raw).await;

        Ok(ExecutionPlan {
            paths,
            extractor_command,
            calibration_command,
            reuse_existing_telemetry,
        })
    }
}
