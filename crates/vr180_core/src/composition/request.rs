//! Everything one render needs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{EncodeSettings, RenderSettings};
use crate::models::{Eye, EyeStream, MaskSet, OrientationSpec};

/// Geometry and timing of the render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderParams {
    pub output_fps: f64,
    pub pts_multiplier: f64,
    pub scale_size: u32,
    pub canvas_size: u32,
    /// Per-eye output width.
    pub output_width: u32,
    /// Per-eye output height.
    pub output_height: u32,
    pub output_h_fov: f64,
    pub output_v_fov: f64,
    /// Allowed frame count deviation; `None` skips probing the result.
    pub frame_tolerance: Option<u64>,
}

impl RenderParams {
    /// Render parameters from settings, with an optional per-run frame rate.
    pub fn from_settings(settings: &RenderSettings, fps: Option<f64>) -> Self {
        Self {
            output_fps: fps.unwrap_or(settings.output_fps),
            pts_multiplier: settings.pts_multiplier,
            scale_size: settings.scale_size,
            canvas_size: settings.canvas_size,
            output_width: settings.output_width,
            output_height: settings.output_height,
            output_h_fov: settings.output_h_fov,
            output_v_fov: settings.output_v_fov,
            frame_tolerance: settings.verify_output.then_some(settings.frame_tolerance),
        }
    }
}

/// One render of a stereo pair. Consumed by [`super::CompositionPipeline::compose`].
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub left: EyeStream,
    pub right: EyeStream,
    pub masks: MaskSet,
    pub orientation: OrientationSpec,
    pub render: RenderParams,
    pub encode: EncodeSettings,
    pub output: PathBuf,
}

impl CompositionRequest {
    pub fn stream(&self, eye: Eye) -> &EyeStream {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }
}
