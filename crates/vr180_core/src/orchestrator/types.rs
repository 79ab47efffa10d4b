//! What steps read ([`Context`]) and what they leave behind ([`JobState`]).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{StepError, StepResult};
use crate::artifacts::ArtifactStore;
use crate::calibration::CalibrationSource;
use crate::composition::ComposeOutput;
use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::{JobSpec, MaskSet, OrientationSpec};
use crate::tools::ToolRunner;

/// Called with (step, percent, message) as the run advances.
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Inputs and shared services of one run. Steps never mutate it.
pub struct Context {
    pub job_spec: JobSpec,
    pub settings: Settings,
    /// File stem of the prefix, used for the run log and error messages.
    pub job_name: String,
    pub logger: Arc<JobLogger>,
    pub runner: Arc<dyn ToolRunner>,
    /// Where every intermediate artifact of the prefix lives.
    pub store: ArtifactStore,
    on_progress: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        job_spec: JobSpec,
        settings: Settings,
        logger: Arc<JobLogger>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            job_name: job_spec.job_name(),
            store: ArtifactStore::new(&job_spec.prefix),
            job_spec,
            settings,
            logger,
            runner,
            on_progress: None,
        }
    }

    pub fn with_progress_callback(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn report_progress(&self, step: &str, percent: u32, message: &str) {
        if let Some(notify) = &self.on_progress {
            notify(step, percent, message);
        }
    }

    /// Tool runner as a plain reference.
    pub fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    /// Output frame rate for this run.
    pub fn output_fps(&self) -> f64 {
        self.job_spec
            .output_fps
            .unwrap_or(self.settings.render.output_fps)
    }
}

/// Results of the steps so far, one section per step.
///
/// Each section is filled once by its step and read by the ones after it.
/// A successful run writes the whole state to `<prefix>_manifest.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: String,
    /// RFC 3339 local time.
    pub started_at: Option<String>,
    /// When the last step finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    /// Mask images used for the render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masks: Option<MasksOutput>,
    /// Calibration project in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationOutput>,
    /// Resolved per-eye angles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<OrientationOutput>,
    /// Render results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compose: Option<ComposeOutput>,
}

impl JobState {
    pub fn new(job_id: impl Into<String>) -> Self {
        let started_at = chrono::Local::now().to_rfc3339();
        Self {
            job_id: job_id.into(),
            started_at: Some(started_at),
            ..Self::default()
        }
    }

    /// Stamp the finish time and write the state as pretty JSON.
    pub fn write_manifest(&mut self, path: &Path) -> StepResult<()> {
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StepError::other(format!("serializing manifest: {}", e)))?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(|e| StepError::io_error("writing manifest", e))?;
        fs::rename(&temp, path).map_err(|e| StepError::io_error("replacing manifest", e))
    }
}

/// Output from the Masks step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasksOutput {
    pub masks: MaskSet,
    /// Taken from an earlier run instead of generated.
    pub reused: bool,
}

/// Output from the Calibrate step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutput {
    /// Project file the angles are read from.
    pub project: PathBuf,
    pub source: CalibrationSource,
    pub control_points: usize,
    pub line_points: usize,
}

/// Output from the Orient step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationOutput {
    pub spec: OrientationSpec,
    /// Manual angles replaced the calibrated ones.
    pub overridden: bool,
    /// Project copy carrying the manual angles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_project: Option<PathBuf>,
}

/// How a step finished when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Tools ran and produced fresh artifacts.
    Success,
    /// Earlier artifacts were reused; carries the reason.
    Skipped(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::{Eye, EyeStream, VideoSource};

    /// Context over two existing dummy videos in `dir`, prefix `dir/take1`.
    pub(crate) fn test_context(dir: &Path, runner: Arc<dyn ToolRunner>) -> Context {
        let left = dir.join("left.mp4");
        let right = dir.join("right.mp4");
        fs::write(&left, b"left").unwrap();
        fs::write(&right, b"right").unwrap();

        let job = JobSpec::new(
            EyeStream::new(Eye::Left, VideoSource::Single(left), 202.0),
            EyeStream::new(Eye::Right, VideoSource::Single(right), 202.0),
            dir.join("take1"),
            dir.join("take1_vr180.mp4"),
        );
        let logger = JobLogger::new("take1", dir.join("logs"), LogConfig::default(), None).unwrap();
        Context::new(job, Settings::default(), Arc::new(logger), runner)
    }

    #[test]
    fn manifest_omits_steps_that_never_ran() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take1_manifest.json");
        let mut state = JobState::new("test-123");
        state.calibration = Some(CalibrationOutput {
            project: "/shoot/take1_calib_optimized.pto".into(),
            source: CalibrationSource::Computed,
            control_points: 40,
            line_points: 4,
        });
        state.write_manifest(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["calibration"]["control_points"], 40);
        assert!(value["masks"].is_null());
        assert!(value["started_at"].is_string());
    }

    #[test]
    fn manifest_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take1_manifest.json");
        let mut state = JobState::new("take1");
        state.write_manifest(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["job_id"], "take1");
        assert!(value.get("finished_at").is_some());
        assert!(value.get("compose").is_none());
    }

    #[test]
    fn context_derives_name_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path(), Arc::new(crate::tools::fake::FakeRunner::new()));
        assert_eq!(ctx.job_name, "take1");
        assert_eq!(ctx.store.dir(), dir.path());
        assert_eq!(ctx.output_fps(), 60.0);
    }
}
