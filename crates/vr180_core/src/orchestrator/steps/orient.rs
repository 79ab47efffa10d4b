//! Orient step - resolves the per-eye angles used for reprojection.

use std::fs;

use crate::artifacts::{ArtifactKind, ProjectStage};
use crate::calibration::{CalibrationModel, CalibrationSource};
use crate::models::Eye;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, OrientationOutput, StepOutcome};
use crate::orientation;

/// Reads the calibration in effect and applies the manual override.
///
/// An override is persisted as its own project file; the calibrated
/// project and the current pointer are left alone.
pub struct OrientStep;

impl OrientStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrientStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for OrientStep {
    fn name(&self) -> &str {
        "Orient"
    }

    fn description(&self) -> &str {
        "Orientation resolution"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let calibration = state.calibration.as_ref().ok_or_else(|| {
            StepError::precondition_failed("Calibrate must run before Orient")
        })?;
        let model = CalibrationModel::load(&calibration.project, calibration.source)?;
        let manual = ctx.job_spec.manual_override;

        let spec = orientation::resolve(
            &model.project,
            &manual,
            ctx.settings.calibration.max_tilt_degrees,
        )?;

        let override_project = if manual.is_set() {
            let path = ctx.store.path(ArtifactKind::Project(ProjectStage::Override));
            let rewritten = model.project.with_orientation(&manual.to_orientation());
            fs::write(&path, rewritten.render())
                .map_err(|e| StepError::io_error("writing override project", e))?;
            ctx.logger.info(&format!(
                "Manual override {} applied to both eyes ({})",
                manual.to_orientation(),
                path.display()
            ));
            Some(path)
        } else {
            if model.source == CalibrationSource::Supplied {
                ctx.logger.info("Using angles from supplied calibration as-is");
            }
            None
        };

        for eye in Eye::BOTH {
            ctx.logger.info(&format!("{} eye: {}", eye, spec.get(eye)));
        }

        state.orientation = Some(OrientationOutput {
            spec,
            overridden: manual.is_set(),
            override_project,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .orientation
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Orientation not recorded"))?;
        if !(output.spec.left.is_finite() && output.spec.right.is_finite()) {
            return Err(StepError::invalid_output("Orientation is not finite"));
        }
        Ok(())
    }
}
