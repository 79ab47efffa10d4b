//! The unit of work the [`Pipeline`](super::Pipeline) sequences.

use super::errors::StepResult;
use super::types::{Context, JobState, StepOutcome};

/// One stage of a run: masks, calibration, orientation or composition.
///
/// `validate_input` sees only the read-only [`Context`] and should fail
/// fast on missing files or reuse targets. `execute` records whatever
/// later steps consume in [`JobState`], also when it returns
/// [`StepOutcome::Skipped`] after reusing earlier artifacts.
/// `validate_output` runs only after [`StepOutcome::Success`].
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &str;

    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome>;

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()>;

    /// Heading written to the run log when the step starts.
    fn description(&self) -> &str {
        self.name()
    }
}
