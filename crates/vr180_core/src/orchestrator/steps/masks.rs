//! Masks step - builds or reuses the per-eye blend masks.

use crate::artifacts::ArtifactStore;
use crate::masks::{check_mask_dimensions, MaskGenerator};
use crate::models::{Eye, MaskSet};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::parallel::for_each_eye;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, MasksOutput, StepOutcome};

/// Generates both eyes' masks, or checks that cached ones exist.
pub struct MasksStep;

impl MasksStep {
    pub fn new() -> Self {
        Self
    }

    /// Cached masks of one eye, sized from the files on disk.
    fn cached_masks(ctx: &Context, eye: Eye) -> StepResult<crate::models::MaskImages> {
        for kind in ArtifactStore::cached_mask_kinds(eye) {
            ctx.store.require(kind)?;
        }
        let mut images = ctx.store.mask_images(eye);
        let (width, height) = check_mask_dimensions(&images)?;
        images.width = width;
        images.height = height;
        Ok(images)
    }
}

impl Default for MasksStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MasksStep {
    fn name(&self) -> &str {
        "Masks"
    }

    fn description(&self) -> &str {
        "Blend mask generation"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.job_spec.reuse_masks {
            return Ok(());
        }
        for eye in Eye::BOTH {
            let source = &ctx.job_spec.stream(eye).mask_source;
            if !source.is_file() {
                return Err(StepError::file_not_found(source));
            }
        }
        ctx.store.ensure_dir()
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        if ctx.job_spec.reuse_masks {
            let masks = MaskSet {
                left: Self::cached_masks(ctx, Eye::Left)?,
                right: Self::cached_masks(ctx, Eye::Right)?,
            };
            state.masks = Some(MasksOutput {
                masks,
                reused: true,
            });
            return Ok(StepOutcome::Skipped("reusing cached masks".to_string()));
        }

        let generator = MaskGenerator::new(
            ctx.runner(),
            &ctx.settings.tools,
            &ctx.settings.masks,
        );
        let [left, right] = for_each_eye(ctx.settings.masks.parallel_eyes, |eye| {
            generator.build_masks(
                eye,
                &ctx.job_spec.stream(eye).mask_source,
                &ctx.store,
                &ctx.logger,
            )
        })?;

        if (left.width, left.height) != (right.width, right.height) {
            ctx.logger.warn(&format!(
                "Eye masks differ in size: left {}x{}, right {}x{}",
                left.width, left.height, right.width, right.height
            ));
        }

        state.masks = Some(MasksOutput {
            masks: MaskSet { left, right },
            reused: false,
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        let output = state
            .masks
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("Masks not recorded"))?;
        for eye in Eye::BOTH {
            let images = output.masks.get(eye);
            for path in images.persisted() {
                if !path.is_file() {
                    return Err(StepError::invalid_output(format!(
                        "{} eye mask missing: {}",
                        eye,
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}
