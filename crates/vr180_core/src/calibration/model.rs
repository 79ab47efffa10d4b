//! Calibration models and angle validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::project::ProjectFile;
use crate::models::Orientation;
use crate::orchestrator::{StepError, StepResult};

/// Where a calibration model came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    /// Produced by this run's calibration chain.
    Computed,
    /// Handed in by the caller.
    Supplied,
    /// Left over from an earlier run with the same prefix.
    Reused,
}

/// A calibration project together with where it lives on disk.
#[derive(Debug, Clone)]
pub struct CalibrationModel {
    pub path: PathBuf,
    pub project: ProjectFile,
    pub source: CalibrationSource,
}

impl CalibrationModel {
    /// Read and parse a project file.
    ///
    /// Parseability is the only check made here.
    pub fn load(path: impl AsRef<Path>, source: CalibrationSource) -> StepResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StepError::file_not_found(path));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| StepError::io_error(format!("reading {}", path.display()), e))?;
        let project = ProjectFile::parse(&text)?;
        Ok(Self {
            path: path.to_path_buf(),
            project,
            source,
        })
    }
}

/// Reject angles that cannot be rendered.
///
/// Yaw may take any finite value; pitch and roll must stay strictly below
/// `max_tilt_degrees` in magnitude.
pub fn validate_orientation(
    label: &str,
    orientation: &Orientation,
    max_tilt_degrees: f64,
) -> StepResult<()> {
    if !orientation.is_finite() {
        return Err(StepError::degenerate(format!(
            "{} orientation is not finite ({})",
            label, orientation
        )));
    }
    for (name, value) in [("pitch", orientation.pitch), ("roll", orientation.roll)] {
        if value.abs() >= max_tilt_degrees {
            return Err(StepError::degenerate(format!(
                "{} {} of {} is outside ±{}",
                label, name, value, max_tilt_degrees
            )));
        }
    }
    Ok(())
}

/// Reject an optimised project built from too few point pairs.
pub fn validate_control_points(project: &ProjectFile, minimum: usize) -> StepResult<()> {
    let count = project.point_pair_count();
    if count < minimum {
        return Err(StepError::degenerate(format!(
            "only {} control points found, at least {} required",
            count, minimum
        )));
    }
    Ok(())
}
