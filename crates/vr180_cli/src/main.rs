//! vr180-stitch: turn a pair of fisheye recordings into one VR180 video.
//!
//! Exit codes: 0 success, 1 usage error, 2 setup error, 3 stage failure,
//! 4 missing cached artifact, 5 degenerate calibration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::Parser;

use vr180_core::config::{ConfigManager, Settings};
use vr180_core::logging::{init_tracing, JobLoggerBuilder, LogConfig, LogLevel};
use vr180_core::models::{Eye, EyeStream, JobSpec, ManualOverride, VideoSource};
use vr180_core::orchestrator::{exit_codes, run_job, Context};
use vr180_core::tools::ProcessRunner;

#[derive(Parser, Debug)]
#[command(name = "vr180-stitch")]
#[command(about = "Stitch a stereo fisheye pair into a frame-packed VR180 video", long_about = None)]
#[command(version)]
struct Cli {
    /// Left camera video; several paths are concatenated in order
    #[arg(long, required = true, num_args = 1..)]
    left: Vec<PathBuf>,

    /// Right camera video; several paths are concatenated in order
    #[arg(long, required = true, num_args = 1..)]
    right: Vec<PathBuf>,

    /// Video the left mask is derived from (default: first left segment)
    #[arg(long)]
    left_mask: Option<PathBuf>,

    /// Video the right mask is derived from (default: first right segment)
    #[arg(long)]
    right_mask: Option<PathBuf>,

    /// Prefix naming every intermediate artifact, e.g. /shoot/take1
    #[arg(long)]
    prefix: PathBuf,

    /// Final video path
    #[arg(long, short)]
    output: PathBuf,

    /// Lens field of view in degrees
    #[arg(long)]
    fov: Option<f64>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Reuse masks from an earlier run with the same prefix
    #[arg(long)]
    reuse_masks: bool,

    /// Reuse the current calibration of the prefix
    #[arg(long)]
    reuse_calibration: bool,

    /// Use this calibration project instead of calibrating
    #[arg(long, value_name = "FILE")]
    calibration: Option<PathBuf>,

    /// Manual yaw for both eyes
    #[arg(long, allow_negative_numbers = true)]
    yaw: Option<f64>,

    /// Manual pitch for both eyes
    #[arg(long, allow_negative_numbers = true)]
    pitch: Option<f64>,

    /// Manual roll for both eyes
    #[arg(long, allow_negative_numbers = true)]
    roll: Option<f64>,

    /// Configuration file
    #[arg(long, default_value = ".config/vr180.toml")]
    config: PathBuf,

    /// Directory for log files (default: from configuration)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    /// Checks clap cannot express.
    fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [("fov", self.fov), ("fps", self.fps)] {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    bail!("--{} must be a positive number, got {}", name, v);
                }
            }
        }
        for (name, value) in [("yaw", self.yaw), ("pitch", self.pitch), ("roll", self.roll)] {
            if value.is_some_and(|v| !v.is_finite()) {
                bail!("--{} must be finite", name);
            }
        }
        Ok(())
    }

    fn eye_stream(&self, eye: Eye, input_fov: f64) -> anyhow::Result<EyeStream> {
        let (paths, mask) = match eye {
            Eye::Left => (&self.left, &self.left_mask),
            Eye::Right => (&self.right, &self.right_mask),
        };
        let source = VideoSource::from_paths(paths.clone())
            .with_context(|| format!("no {} input given", eye))?;
        let mut stream = EyeStream::new(eye, source, input_fov);
        if let Some(mask) = mask {
            stream = stream.with_mask_source(mask);
        }
        Ok(stream)
    }

    fn job_spec(&self, settings: &Settings) -> anyhow::Result<JobSpec> {
        let fov = self.fov.unwrap_or(settings.render.input_fov);
        let mut job = JobSpec::new(
            self.eye_stream(Eye::Left, fov)?,
            self.eye_stream(Eye::Right, fov)?,
            &self.prefix,
            &self.output,
        );
        job.reuse_masks = self.reuse_masks;
        job.reuse_calibration = self.reuse_calibration;
        job.calibration_file = self.calibration.clone();
        job.manual_override = ManualOverride {
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
        };
        job.output_fps = self.fps;
        Ok(job)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(exit_codes::USAGE as u8);
        }
        Err(e) => e.exit(),
    };

    if let Err(e) = cli.validate() {
        eprintln!("error: {:#}", e);
        return ExitCode::from(exit_codes::USAGE as u8);
    }

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_codes::SETUP
        }
    };
    ExitCode::from(code as u8)
}

/// Load configuration, set up logging and run the pipeline.
///
/// Errors returned here are setup failures; pipeline failures are mapped
/// to their own exit codes.
fn run(cli: &Cli) -> anyhow::Result<i32> {
    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    let log_dir = cli.log_dir.clone().unwrap_or_else(|| config.logs_folder());
    let mut settings = config.into_settings();
    if cli.verbose {
        settings.logging.level = LogLevel::Debug;
    }

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let _guard = init_tracing(settings.logging.level, Some(&log_dir));
    tracing::debug!("vr180-stitch {}", vr180_core::version());

    let job = match cli.job_spec(&settings) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return Ok(exit_codes::USAGE);
        }
    };

    let logger = JobLoggerBuilder::new(job.job_name(), &log_dir)
        .config(LogConfig::from_settings(&settings.logging))
        .callback(Box::new(|line: &str| println!("{}", line)))
        .build()
        .context("creating job log")?;
    let logger = Arc::new(logger);

    let ctx = Context::new(job, settings, Arc::clone(&logger), Arc::new(ProcessRunner::new()))
        .with_progress_callback(Box::new(|step: &str, percent: u32, message: &str| {
            tracing::info!(step, percent, "{}", message);
        }));

    let code = match run_job(&ctx) {
        Ok((result, _state)) => {
            logger.success(&format!(
                "Wrote {} ({} steps run, {} reused)",
                ctx.job_spec.output.display(),
                result.steps_completed.len(),
                result.steps_skipped.len()
            ));
            exit_codes::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            logger.error(&e.to_string());
            e.exit_code()
        }
    };
    logger.close();
    Ok(code)
}
