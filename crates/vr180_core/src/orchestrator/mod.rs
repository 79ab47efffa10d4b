//! Pipeline orchestrator for coordinating a stitching run.
//!
//! A run is a fixed chain of steps. Each step validates its inputs,
//! does its work (or takes its reuse path) and records what it produced
//! in the shared [`JobState`].
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Masks      (skipped with reuse_masks)
//!     ├── Step: Calibrate  (skipped with a calibration file or reuse_calibration)
//!     ├── Step: Orient
//!     └── Step: Compose
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vr180_core::orchestrator::{run_job, Context};
//!
//! let ctx = Context::new(job_spec, settings, logger, Arc::new(ProcessRunner::new()));
//! let (result, state) = run_job(&ctx)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod parallel;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{exit_codes, PipelineError, PipelineResult, StepError, StepResult};
pub use parallel::for_each_eye;
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{CalibrateStep, ComposeStep, MasksStep, OrientStep};
pub use types::{
    CalibrationOutput, Context, JobState, MasksOutput, OrientationOutput, ProgressCallback,
    StepOutcome,
};

use crate::artifacts::ArtifactKind;

/// Create the standard pipeline with all steps in order.
///
/// 1. Masks - per-eye blend masks
/// 2. Calibrate - camera pair calibration project
/// 3. Orient - per-eye yaw/pitch/roll, with manual override
/// 4. Compose - projection, blending, stacking and encoding
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(MasksStep::new())
        .with_step(CalibrateStep::new())
        .with_step(OrientStep::new())
        .with_step(ComposeStep::new())
}

/// Run the standard pipeline and write the run manifest next to the prefix.
pub fn run_job(ctx: &Context) -> PipelineResult<(PipelineRunResult, JobState)> {
    let mut state = JobState::new(&ctx.job_name);
    let result = create_standard_pipeline().run(ctx, &mut state)?;

    let manifest = ctx.store.path(ArtifactKind::Manifest);
    state
        .write_manifest(&manifest)
        .map_err(|e| PipelineError::step_failed(&ctx.job_name, "Manifest", e))?;
    ctx.logger
        .info(&format!("Manifest written to {}", manifest.display()));
    Ok((result, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ProjectStage;
    use crate::calibration::CalibrationSource;
    use crate::models::{ManualOverride, Orientation, VideoSource};
    use crate::tools::fake::{sample_project, FakeRunner};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;
    use super::types::tests::test_context;

    #[test]
    fn standard_pipeline_order() {
        let pipeline = create_standard_pipeline();
        assert_eq!(
            pipeline.step_names(),
            vec!["Masks", "Calibrate", "Orient", "Compose"]
        );
    }

    #[test]
    fn full_run_renders_and_writes_manifest() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let ctx = test_context(dir.path(), runner.clone());

        let (result, state) = run_job(&ctx).unwrap();

        assert!(result.all_completed());
        assert_eq!(result.total_steps(), 4);
        assert!(ctx.job_spec.output.is_file());
        assert!(ctx.store.exists(ArtifactKind::Manifest));
        assert_eq!(runner.count("magick"), 8);
        assert_eq!(runner.count("autooptimiser"), 1);

        let compose = state.compose.unwrap();
        let verification = compose.verification.unwrap();
        assert_eq!(verification.expected_frames, 600);
        assert_eq!(verification.stream.pix_fmt, "yuv420p");
        assert!(compose.command.contains("stereo_mode=left_right"));
        assert!(!compose.command.contains(" -c:a"));

        let calibration = state.calibration.unwrap();
        assert_eq!(calibration.source, CalibrationSource::Computed);
        assert_eq!(calibration.control_points, 12);
    }

    #[test]
    fn calibrated_angles_are_crossed_into_render() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new().with_project(sample_project(
            Orientation::new(-1.5, 0.25, 0.5),
            Orientation::new(2.5, -0.75, 1.25),
            12,
        )));
        let ctx = test_context(dir.path(), runner);

        let (_, state) = run_job(&ctx).unwrap();
        let spec = state.orientation.unwrap().spec;
        assert_eq!(spec.left, Orientation::new(2.5, -0.75, 1.25));
        assert_eq!(spec.right, Orientation::new(-1.5, 0.25, 0.5));

        let graph = state.compose.unwrap().filter_graph;
        assert!(graph.contains("yaw=2.5:pitch=-0.75:roll=1.25:w=2880:h=2880[left_equirect]"));
    }

    #[test]
    fn reuse_runs_no_mask_or_calibration_tools() {
        let dir = tempdir().unwrap();
        let first = Arc::new(FakeRunner::new());
        let ctx = test_context(dir.path(), first);
        run_job(&ctx).unwrap();

        let mask_path = ctx.store.path(ArtifactKind::MaskNormalizedAlpha(crate::models::Eye::Left));
        let modified = fs::metadata(&mask_path).unwrap().modified().unwrap();

        let second = Arc::new(FakeRunner::new());
        let mut ctx = test_context(dir.path(), second.clone());
        ctx.job_spec.reuse_masks = true;
        ctx.job_spec.reuse_calibration = true;

        let (result, state) = run_job(&ctx).unwrap();
        assert_eq!(result.steps_skipped, vec!["Masks", "Calibrate"]);
        assert_eq!(second.count("magick"), 0);
        assert_eq!(second.count("pto_gen"), 0);
        assert_eq!(second.count("ffmpeg"), 1);
        let masks = state.masks.unwrap();
        assert!(masks.reused);
        assert_eq!((masks.masks.left.width, masks.masks.left.height), (64, 64));
        assert_eq!((masks.masks.right.width, masks.masks.right.height), (64, 64));
        assert_eq!(
            fs::metadata(&mask_path).unwrap().modified().unwrap(),
            modified
        );
    }

    #[test]
    fn reuse_without_cache_is_missing_artifact() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let mut ctx = test_context(dir.path(), runner.clone());
        ctx.job_spec.reuse_masks = true;

        let err = run_job(&ctx).unwrap_err();
        assert_eq!(err.step_name(), Some("Masks"));
        assert_eq!(err.exit_code(), exit_codes::MISSING_CACHED_ARTIFACT);
        assert!(runner.calls().is_empty());

        let mut ctx = test_context(dir.path(), runner.clone());
        ctx.job_spec.reuse_calibration = true;
        let err = run_job(&ctx).unwrap_err();
        assert_eq!(err.step_name(), Some("Calibrate"));
        assert_eq!(err.exit_code(), exit_codes::MISSING_CACHED_ARTIFACT);
    }

    #[test]
    fn manual_override_wins_for_both_eyes() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new().with_project(sample_project(
            Orientation::default(),
            Orientation::default(),
            12,
        )));
        let mut ctx = test_context(dir.path(), runner);
        ctx.job_spec.manual_override = ManualOverride {
            yaw: Some(10.0),
            pitch: Some(0.0),
            roll: Some(0.0),
        };

        let (_, state) = run_job(&ctx).unwrap();
        let orientation = state.orientation.unwrap();
        assert!(orientation.overridden);
        assert_eq!(orientation.spec.left, Orientation::new(10.0, 0.0, 0.0));
        assert_eq!(orientation.spec.right, Orientation::new(10.0, 0.0, 0.0));

        let override_path = orientation.override_project.unwrap();
        assert_eq!(
            override_path,
            ctx.store.path(ArtifactKind::Project(ProjectStage::Override))
        );
        assert_eq!(
            ctx.store.read_current().unwrap(),
            Some(ctx.store.path(ArtifactKind::Project(ProjectStage::Optimized)))
        );
    }

    #[test]
    fn degenerate_calibration_never_reaches_render() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new().with_project(sample_project(
            Orientation::new(0.0, 95.0, 0.0),
            Orientation::default(),
            12,
        )));
        let ctx = test_context(dir.path(), runner.clone());

        let err = run_job(&ctx).unwrap_err();
        assert_eq!(err.step_name(), Some("Calibrate"));
        assert_eq!(err.exit_code(), exit_codes::DEGENERATE_CALIBRATION);
        assert!(!runner.stages().iter().any(|s| s == "stereo render"));
    }

    #[test]
    fn supplied_nan_calibration_is_rejected() {
        let dir = tempdir().unwrap();
        let supplied = dir.path().join("external.pto");
        fs::write(
            &supplied,
            sample_project(Orientation::default(), Orientation::new(f64::NAN, 0.0, 0.0), 0),
        )
        .unwrap();

        let runner = Arc::new(FakeRunner::new());
        let mut ctx = test_context(dir.path(), runner.clone());
        ctx.job_spec.calibration_file = Some(supplied.clone());

        let err = run_job(&ctx).unwrap_err();
        assert_eq!(err.step_name(), Some("Orient"));
        assert_eq!(err.exit_code(), exit_codes::DEGENERATE_CALIBRATION);
        assert_eq!(runner.count("cpfind"), 0);
        assert_eq!(ctx.store.read_current().unwrap(), Some(supplied));
    }

    #[test]
    fn concatenated_segments_render_like_single_file() {
        let dir = tempdir().unwrap();
        let mut left_segments = Vec::new();
        let mut right_segments = Vec::new();
        let mut runner = FakeRunner::new().with_default_duration(10.0);
        for i in 1..=5 {
            for (eye, list) in [("left", &mut left_segments), ("right", &mut right_segments)] {
                let path = dir.path().join(format!("{}_{:02}.mp4", eye, i));
                fs::write(&path, b"segment").unwrap();
                runner = runner.with_duration(&path, 2.0);
                list.push(path);
            }
        }
        let runner = Arc::new(runner);
        let mut ctx = test_context(dir.path(), runner.clone());
        ctx.job_spec.left.source = VideoSource::Concat(left_segments);
        ctx.job_spec.right.source = VideoSource::Concat(right_segments);

        let (_, state) = run_job(&ctx).unwrap();
        let compose = state.compose.unwrap();
        assert_eq!(compose.concat_lists.len(), 2);
        let verification = compose.verification.unwrap();
        assert!((verification.source_duration - 10.0).abs() < 1e-9);
        assert_eq!(verification.expected_frames, 600);

        // Calibration stills come from the first segment
        let still = runner
            .calls()
            .into_iter()
            .find(|c| c.stage == "calibration still (left)")
            .unwrap();
        assert!(still.args.contains(&dir.path().join("left_01.mp4").display().to_string()));
    }

    #[test]
    fn missing_input_fails_before_any_tool() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(FakeRunner::new());
        let mut ctx = test_context(dir.path(), runner.clone());
        ctx.job_spec.right.mask_source = dir.path().join("gone.mp4");

        let err = run_job(&ctx).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USAGE);
        assert!(runner.calls().is_empty());
    }
}
