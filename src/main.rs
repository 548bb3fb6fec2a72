use clap::Parser;
use static_imu_calib::core::TelemetryExtractor;
use static_imu_calib::utils::error::CalibError;
use static_imu_calib::utils::{logger, validation::Validate};
use static_imu_calib::{
    BinaryCalibrator, CalibrationEngine, CliConfig, CommandExtractor, GpmfExtractor,
    LocalStorage, StaticCalibrationPipeline,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };

    logger::init_cli_logger(config.verbosity > 0, config.log_format);
    tracing::info!("Starting static-imu-calib");
    tracing::debug!("Resolved config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let extractor: Box<dyn TelemetryExtractor> = match &config.extractor.program {
        Some(program) => {
            tracing::info!("🔧 Using external extractor {}", program);
            Box::new(CommandExtractor::new(
                program.clone(),
                config.extractor.args.clone(),
            ))
        }
        None => Box::new(GpmfExtractor::new()),
    };
    let calibrator = BinaryCalibrator::in_build_dir(&config.build_path);
    let storage = LocalStorage::new(".");
    let monitor_enabled = config.monitor;
    let pipeline = StaticCalibrationPipeline::new(
        storage,
        config,
        extractor,
        Box::new(calibrator),
    );
    let engine = CalibrationEngine::new_with_monitoring(pipeline, monitor_enabled);

    if cli.dry_run {
        match engine.dry_run().await {
            Ok(plan) => {
                println!("🔍 Dry run for {}", plan.paths.video.display());
                if !plan.reuse_existing_telemetry {
                    println!("  {}", plan.extractor_command);
                }
                println!("  {}", plan.calibration_command);
                return Ok(());
            }
            Err(e) => exit_with(&e),
        }
    }

    match engine.run().await {
        Ok(report) => {
            tracing::info!(
                "✅ Calibration finished in {:.2}s",
                report.total_duration().as_secs_f64()
            );
            println!("✅ Static IMU calibration completed successfully!");
            println!(
                "📁 Telemetry: {}",
                report.calibration.telemetry_json.display()
            );
            println!(
                "📁 Calibration result: {}",
                report.calibration.output_calibration_path.display()
            );

            if let Some(path) = &cli.report {
                report.write_to(path)?;
                tracing::info!("📝 Run report written to {}", path.display());
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Calibration failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            exit_with(&e);
        }
    }

    Ok(())
}

fn exit_with(e: &CalibError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}
