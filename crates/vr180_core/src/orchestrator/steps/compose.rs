//! Compose step - renders the frame-packed stereo file.

use crate::composition::{CompositionPipeline, CompositionRequest, RenderParams};
use crate::models::Eye;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};

/// Projects both eyes with their masks and angles and encodes the result.
pub struct ComposeStep;

impl ComposeStep {
    pub fn new() -> Self {
        Self
    }

    fn build_request(ctx: &Context, state: &JobState) -> StepResult<CompositionRequest> {
        let masks = state
            .masks
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Masks must run before Compose"))?;
        let orientation = state
            .orientation
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("Orient must run before Compose"))?;

        Ok(CompositionRequest {
            left: ctx.job_spec.left.clone(),
            right: ctx.job_spec.right.clone(),
            masks: masks.masks.clone(),
            orientation: orientation.spec,
            render: RenderParams::from_settings(&ctx.settings.render, Some(ctx.output_fps())),
            encode: ctx.settings.encode.clone(),
            output: ctx.job_spec.output.clone(),
        })
    }
}

impl Default for ComposeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ComposeStep {
    fn name(&self) -> &str {
        "Compose"
    }

    fn description(&self) -> &str {
        "Stereo composition"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        for eye in Eye::BOTH {
            let missing = ctx.job_spec.stream(eye).source.missing_segments();
            if let Some(first) = missing.first() {
                return Err(StepError::file_not_found(first));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let request = Self::build_request(ctx, state)?;
        ctx.logger.info(&format!(
            "Rendering {} at {} fps to {}",
            request.encode.stereo_layout,
            request.render.output_fps,
            request.output.display()
        ));

        let output = CompositionPipeline::new(ctx.runner(), &ctx.settings.tools)
            .with_filter_graph_logging(ctx.settings.logging.show_filter_graph)
            .compose(request, &ctx.store, &ctx.logger)?;

        state.compose = Some(output);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .compose
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Render not recorded"))?;
        if !output.output_path.is_file() {
            return Err(StepError::invalid_output(format!(
                "output missing: {}",
                output.output_path.display()
            )));
        }
        Ok(())
    }
}
