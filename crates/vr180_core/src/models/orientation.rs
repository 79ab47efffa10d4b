//! Camera orientation angles.

use serde::{Deserialize, Serialize};

use super::enums::Eye;

/// Yaw/pitch/roll of one camera in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Orientation {
    pub fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Whether all three angles are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "yaw={} pitch={} roll={}",
            self.yaw, self.pitch, self.roll
        )
    }
}

/// Final per-eye orientation consumed by composition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrientationSpec {
    pub left: Orientation,
    pub right: Orientation,
}

impl OrientationSpec {
    /// Orientation for an eye.
    pub fn get(&self, eye: Eye) -> Orientation {
        match eye {
            Eye::Left => self.left,
            Eye::Right => self.right,
        }
    }

    /// Same orientation for both eyes.
    pub fn uniform(orientation: Orientation) -> Self {
        Self {
            left: orientation,
            right: orientation,
        }
    }
}

/// Manually supplied yaw/pitch/roll replacing the calibrated angles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll: Option<f64>,
}

impl ManualOverride {
    /// True when any angle was given.
    pub fn is_set(&self) -> bool {
        self.yaw.is_some() || self.pitch.is_some() || self.roll.is_some()
    }

    /// Triple applied to both eyes. Angles left out are zero.
    pub fn to_orientation(&self) -> Orientation {
        Orientation {
            yaw: self.yaw.unwrap_or(0.0),
            pitch: self.pitch.unwrap_or(0.0),
            roll: self.roll.unwrap_or(0.0),
        }
    }
}
