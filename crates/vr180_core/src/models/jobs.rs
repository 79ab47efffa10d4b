//! Job specification for a single stitching run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::Eye;
use super::media::EyeStream;
use super::orientation::ManualOverride;

/// Everything the caller decided for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Left camera input.
    pub left: EyeStream,
    /// Right camera input.
    pub right: EyeStream,
    /// Prefix naming every intermediate artifact (e.g. `/shoot/take1`).
    pub prefix: PathBuf,
    /// Final encoded video.
    pub output: PathBuf,
    /// Assume masks from an earlier run with the same prefix exist.
    #[serde(default)]
    pub reuse_masks: bool,
    /// Assume the current calibration of this prefix is valid.
    #[serde(default)]
    pub reuse_calibration: bool,
    /// Pre-built calibration project to use instead of calibrating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_file: Option<PathBuf>,
    /// Manual yaw/pitch/roll for both eyes.
    #[serde(default)]
    pub manual_override: ManualOverride,
    /// Output frame rate for this run (falls back to settings).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fps: Option<f64>,
}

impl JobSpec {
    /// Create a job with no reuse and no override.
    pub fn new(
        left: EyeStream,
        right: EyeStream,
        prefix: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            left,
            right,
            prefix: prefix.into(),
            output: output.into(),
            reuse_masks: false,
            reuse_calibration: false,
            calibration_file: None,
            manual_override: ManualOverride::default(),
            output_fps: None,
        }
    }

    /// Eye stream by identity.
    pub fn stream(&self, eye: Eye) -> &EyeStream {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }

    /// Name used for the job logger and manifest.
    pub fn job_name(&self) -> String {
        self.prefix
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "vr180".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoSource;

    #[test]
    fn job_name_comes_from_prefix() {
        let left = EyeStream::new(Eye::Left, VideoSource::Single("l.mp4".into()), 202.0);
        let right = EyeStream::new(Eye::Right, VideoSource::Single("r.mp4".into()), 202.0);
        let job = JobSpec::new(left, right, "/shoot/take1", "/shoot/take1_vr.mp4");

        assert_eq!(job.job_name(), "take1");
        assert_eq!(job.stream(Eye::Right).source.segments()[0], PathBuf::from("r.mp4"));
        assert!(!job.reuse_masks);
    }
}
