//! Calibrate step - runs the calibration chain or adopts an existing project.

use crate::artifacts::{ArtifactKind, ProjectStage};
use crate::calibration::{CalibrationEngine, CalibrationModel, CalibrationSource};
use crate::models::Eye;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{CalibrationOutput, Context, JobState, StepOutcome};

/// Produces the calibration model the orientation is read from.
///
/// A supplied project file wins over `reuse_calibration`; both skip the
/// tool chain entirely.
pub struct CalibrateStep;

impl CalibrateStep {
    pub fn new() -> Self {
        Self
    }

    /// Project a reuse run points at: the current pointer, or the
    /// optimised project of the prefix.
    fn reused_project(ctx: &Context) -> StepResult<CalibrationModel> {
        let path = match ctx.store.read_current()? {
            Some(path) => path,
            None => ctx
                .store
                .require(ArtifactKind::Project(ProjectStage::Optimized))?,
        };
        if !path.is_file() {
            return Err(StepError::missing_cached(
                ArtifactKind::CurrentProject.to_string(),
                path,
            ));
        }
        CalibrationModel::load(path, CalibrationSource::Reused)
    }

    fn record(state: &mut JobState, model: &CalibrationModel) {
        state.calibration = Some(CalibrationOutput {
            project: model.path.clone(),
            source: model.source,
            control_points: model.project.point_pair_count(),
            line_points: model.project.line_point_count(),
        });
    }
}

impl Default for CalibrateStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CalibrateStep {
    fn name(&self) -> &str {
        "Calibrate"
    }

    fn description(&self) -> &str {
        "Camera pair calibration"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if let Some(ref file) = ctx.job_spec.calibration_file {
            if !file.is_file() {
                return Err(StepError::file_not_found(file));
            }
            return Ok(());
        }
        if ctx.job_spec.reuse_calibration {
            return Ok(());
        }
        for eye in Eye::BOTH {
            let stream = ctx.job_spec.stream(eye);
            let missing = stream.source.missing_segments();
            if let Some(first) = missing.first() {
                return Err(StepError::file_not_found(first));
            }
        }
        ctx.store.ensure_dir()
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        if let Some(ref file) = ctx.job_spec.calibration_file {
            if ctx.job_spec.reuse_calibration {
                ctx.logger
                    .warn("Both a calibration file and calibration reuse given; using the file");
            }
            let model = CalibrationModel::load(file, CalibrationSource::Supplied)?;
            ctx.store.ensure_dir()?;
            ctx.store.set_current(&model.path)?;
            Self::record(state, &model);
            return Ok(StepOutcome::Skipped(format!(
                "using supplied calibration {}",
                file.display()
            )));
        }

        if ctx.job_spec.reuse_calibration {
            let model = Self::reused_project(ctx)?;
            Self::record(state, &model);
            return Ok(StepOutcome::Skipped(format!(
                "reusing calibration {}",
                model.path.display()
            )));
        }

        let (Some(left), Some(right)) = (
            ctx.job_spec.left.source.first_segment(),
            ctx.job_spec.right.source.first_segment(),
        ) else {
            return Err(StepError::invalid_input("an eye has no video segments"));
        };

        let engine = CalibrationEngine::new(
            ctx.runner(),
            &ctx.settings.tools,
            &ctx.settings.calibration,
        );
        let model = engine.calibrate(
            left,
            right,
            ctx.job_spec.left.input_fov,
            &ctx.store,
            &ctx.logger,
        )?;
        Self::record(state, &model);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .calibration
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Calibration not recorded"))?;
        if !output.project.is_file() {
            return Err(StepError::invalid_output(format!(
                "calibration project missing: {}",
                output.project.display()
            )));
        }
        Ok(())
    }
}
