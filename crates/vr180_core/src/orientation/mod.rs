//! Final per-eye orientation from a calibration project and an optional
//! manual override.

use crate::calibration::{validate_orientation, ProjectFile};
use crate::models::{Eye, ManualOverride, Orientation, OrientationSpec};
use crate::orchestrator::StepResult;

/// Orientation of `eye` as stored in the project.
///
/// The project keeps the pair crossed: the right image's angles belong to
/// the left eye and the left image's to the right eye. This is the only
/// place the crossing is applied.
pub fn resolve_eye_orientation(project: &ProjectFile, eye: Eye) -> StepResult<Orientation> {
    let image = eye.other().image_index();
    Ok(project.orientation(image)?)
}

/// Resolve both eyes and reject angles that cannot be rendered.
///
/// A manual override with any angle set replaces the project's angles for
/// both eyes with the same triple.
pub fn resolve(
    project: &ProjectFile,
    manual: &ManualOverride,
    max_tilt_degrees: f64,
) -> StepResult<OrientationSpec> {
    let spec = if manual.is_set() {
        OrientationSpec::uniform(manual.to_orientation())
    } else {
        OrientationSpec {
            left: resolve_eye_orientation(project, Eye::Left)?,
            right: resolve_eye_orientation(project, Eye::Right)?,
        }
    };

    for eye in Eye::BOTH {
        validate_orientation(&format!("{} eye", eye), &spec.get(eye), max_tilt_degrees)?;
    }
    Ok(spec)
}
