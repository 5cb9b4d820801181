//! Eye gaze tracking command line tool for replaying landmark recordings and fitting calibrations.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eye_gaze_tracking::{
    calibration::{
        session::{AutoStart, CalibrationSession},
        CalibrationFitter, CalibrationMode, CalibrationPoint, CalibrationRecord, QuickOffsetCalibrator,
    },
    config::{Config, EXAMPLE_CONFIG},
    filters::FilterKind,
    source::{LandmarkSource, ReplaySource},
    tracker::GazeTracker,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSON-lines landmark recording and print gaze estimates
    Track {
        /// Recording to replay
        input: PathBuf,

        /// Calibration file to map gaze through
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Filter type (kalman, adaptive); overrides the configuration
        #[arg(short, long)]
        filter: Option<String>,

        /// Print every Nth estimate
        #[arg(long, default_value = "1")]
        every: usize,
    },

    /// Run a calibration session over a recording, one block of frames per target
    Calibrate {
        /// Recording to replay
        input: PathBuf,

        /// Where to write the fitted calibration
        #[arg(short, long, default_value = "gaze_calibration.json")]
        output: PathBuf,

        /// Regression mode (affine, polynomial); overrides the configuration
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Measure the additive gaze offset over a recording, one block of frames per quick target
    QuickOffset {
        /// Recording to replay
        input: PathBuf,
    },

    /// Fit a calibration from a JSON list of recorded calibration points
    Fit {
        /// Calibration points file
        input: PathBuf,

        /// Where to write the fitted calibration
        #[arg(short, long, default_value = "gaze_calibration.json")]
        output: PathBuf,

        /// Regression mode (affine, polynomial); overrides the configuration
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Write an example configuration file
    InitConfig {
        /// Output path
        #[arg(default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = load_config(args.config.as_deref());
    config.validate()?;

    match args.command {
        Command::Track {
            input,
            calibration,
            filter,
            every,
        } => track(&config, &input, calibration.as_deref(), filter.as_deref(), every),
        Command::Calibrate { input, output, mode } => calibrate(&config, &input, &output, mode.as_deref()),
        Command::QuickOffset { input } => quick_offset(&config, &input),
        Command::Fit { input, output, mode } => fit(&config, &input, &output, mode.as_deref()),
        Command::InitConfig { output } => {
            fs::write(&output, EXAMPLE_CONFIG).with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Example configuration written to {}", output.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };

    info!("Loading configuration from: {}", path.display());
    match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config file: {e}. Using defaults.");
            Config::default()
        }
    }
}

fn resolve_mode(config: &Config, mode: Option<&str>) -> Result<CalibrationMode> {
    Ok(match mode {
        Some(mode) => mode.parse()?,
        None => config.calibration.mode,
    })
}

fn track(
    config: &Config,
    input: &Path,
    calibration: Option<&Path>,
    filter: Option<&str>,
    every: usize,
) -> Result<()> {
    let mut config = config.clone();
    if let Some(filter) = filter {
        config.filter.kind = filter.parse::<FilterKind>()?;
    }

    let mut tracker = GazeTracker::from_config(&config);
    if let Some(path) = calibration {
        let model = CalibrationRecord::load(path)
            .and_then(|record| record.to_model())
            .with_context(|| format!("Failed to load calibration from {}", path.display()))?;
        info!("Using {} calibration from {}", model.mode(), path.display());
        tracker.set_calibration(model);
    }

    let mut source =
        ReplaySource::open(input).with_context(|| format!("Failed to open recording {}", input.display()))?;
    let every = every.max(1);
    let mut frames = 0usize;
    let mut estimates = 0usize;

    while let Some(frame) = source.next_frame()? {
        frames += 1;
        let Some(estimate) = tracker.process_frame(&frame) else {
            continue;
        };
        estimates += 1;

        if estimates % every == 0 {
            println!(
                "frame {frames:5}  gaze ({:+.3}, {:+.3})  screen ({:4}, {:4})  confidence {:.1}",
                estimate.combined.x,
                estimate.combined.y,
                estimate.screen_point.0,
                estimate.screen_point.1,
                estimate.confidence
            );
        }
    }

    info!("Processed {frames} frames, {estimates} with a gaze estimate");
    if let Some(latency) = tracker.average_latency_ms() {
        info!("Average processing time: {latency:.3} ms/frame");
    }
    Ok(())
}

fn calibrate(config: &Config, input: &Path, output: &Path, mode: Option<&str>) -> Result<()> {
    let mode = resolve_mode(config, mode)?;
    let mut tracker = GazeTracker::from_config(config);
    let session = CalibrationSession::from_config(&config.calibration, config.screen.width, config.screen.height)?;
    let mut fitter = CalibrationFitter::new(mode, config.screen.width, config.screen.height);

    let mut source =
        ReplaySource::open(input).with_context(|| format!("Failed to open recording {}", input.display()))?;
    let report = session.run(&mut tracker, &mut source, &mut AutoStart, &mut fitter)?;

    println!("Calibration error ({}): {:.1} pixels average", report.mode, report.mean_error_px);
    fitter.save_calibration(output)?;
    Ok(())
}

fn quick_offset(config: &Config, input: &Path) -> Result<()> {
    let mut tracker = GazeTracker::from_config(config);
    let calibrator = QuickOffsetCalibrator::from_config(&config.calibration, config.screen.width, config.screen.height)?;

    let mut source =
        ReplaySource::open(input).with_context(|| format!("Failed to open recording {}", input.display()))?;
    let (offset_x, offset_y) = calibrator.run(&mut tracker, &mut source, &mut AutoStart)?;

    println!("Offsets: offset_x {offset_x:+.3}, offset_y {offset_y:+.3}");
    Ok(())
}

fn fit(config: &Config, input: &Path, output: &Path, mode: Option<&str>) -> Result<()> {
    let mode = resolve_mode(config, mode)?;
    let content = fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let points: Vec<CalibrationPoint> = serde_json::from_str(&content)?;

    let mut fitter = CalibrationFitter::new(mode, config.screen.width, config.screen.height);
    let report = fitter.fit(&points)?;

    println!("Calibration error ({}): {:.1} pixels average", report.mode, report.mean_error_px);
    for (target, error) in fitter.targets().iter().zip(&report.point_errors) {
        println!("  target ({:4}, {:4}): {error:.1}px", target.0, target.1);
    }

    fitter.save_calibration(output)?;
    Ok(())
}
