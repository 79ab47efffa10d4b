//! Camera-pair calibration.
//!
//! Produces a project file holding one yaw/pitch/roll triple per image.
//! Image 0 is always the left still and image 1 the right still.

mod engine;
mod model;
pub mod project;

pub use engine::CalibrationEngine;
pub use model::{validate_control_points, validate_orientation, CalibrationModel, CalibrationSource};
pub use project::{ProjectError, ProjectFile};
