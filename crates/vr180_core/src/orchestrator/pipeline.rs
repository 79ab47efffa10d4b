//! Sequential step runner.

use super::errors::{PipelineError, PipelineResult, StepResult};
use super::step::PipelineStep;
use super::types::{Context, JobState, StepOutcome};

/// Ordered steps of one run.
///
/// Each step is checked, executed and (unless it took a reuse path)
/// checked again. The first error ends the run.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, step: impl PipelineStep + 'static) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn with_step(mut self, step: impl PipelineStep + 'static) -> Self {
        self.add_step(step);
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn run(&self, ctx: &Context, state: &mut JobState) -> PipelineResult<PipelineRunResult> {
        let mut result = PipelineRunResult::default();
        let count = self.steps.len().max(1);

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            ctx.logger.phase(step.description());
            ctx.report_progress(name, (index * 100 / count) as u32, &format!("Starting {name}"));

            match run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{name} completed"));
                    result.steps_completed.push(name.to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{name} reused: {reason}"));
                    result.steps_skipped.push(name.to_string());
                }
                Err(e) => {
                    ctx.logger.error(&format!("{name}: {e}"));
                    return Err(PipelineError::step_failed(&ctx.job_name, name, e));
                }
            }
        }

        ctx.report_progress("Complete", 100, "All steps finished");
        Ok(result)
    }
}

/// One step through its three phases.
fn run_step(step: &dyn PipelineStep, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
    step.validate_input(ctx)?;
    let outcome = step.execute(ctx, state)?;
    if outcome == StepOutcome::Success {
        step.validate_output(ctx, state)?;
    }
    Ok(outcome)
}

/// Which steps ran their tools and which reused earlier artifacts.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    pub steps_completed: Vec<String>,
    pub steps_skipped: Vec<String>,
}

impl PipelineRunResult {
    /// True when nothing was reused.
    pub fn all_completed(&self) -> bool {
        self.steps_skipped.is_empty()
    }

    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len()
    }
}
