//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::StereoLayout;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Mask generation.
    #[serde(default)]
    pub masks: MaskSettings,

    /// Orientation calibration.
    #[serde(default)]
    pub calibration: CalibrationSettings,

    /// Projection and blending of the final video.
    #[serde(default)]
    pub render: RenderSettings,

    /// Encoder settings for the final video.
    #[serde(default)]
    pub encode: EncodeSettings,

    /// External executables.
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for per-run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to the run log.
    #[serde(default)]
    pub level: LogLevel,

    /// Keep external tool output out of the log unless a stage fails.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines shown after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Print the render filter graph one chain per line.
    #[serde(default)]
    pub show_filter_graph: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            show_filter_graph: false,
        }
    }
}

/// Mask generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskSettings {
    /// Number of leading frames averaged into the mask still.
    #[serde(default = "default_frame_window")]
    pub frame_window: u32,

    /// Contrast-stretch black point (percent).
    #[serde(default = "default_contrast_low")]
    pub contrast_low_pct: f64,

    /// Contrast-stretch white point (percent).
    #[serde(default = "default_contrast_high")]
    pub contrast_high_pct: f64,

    /// Posterize palette size for the alpha mask.
    #[serde(default = "default_posterize_levels")]
    pub posterize_levels: u32,

    /// Pixel painted black before normalization.
    #[serde(default)]
    pub reference_pixel: [u32; 2],

    /// Build left and right masks concurrently.
    #[serde(default = "default_true")]
    pub parallel_eyes: bool,
}

fn default_frame_window() -> u32 {
    128
}

fn default_contrast_low() -> f64 {
    3.0
}

fn default_contrast_high() -> f64 {
    77.0
}

fn default_posterize_levels() -> u32 {
    8
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            frame_window: default_frame_window(),
            contrast_low_pct: default_contrast_low(),
            contrast_high_pct: default_contrast_high(),
            posterize_levels: default_posterize_levels(),
            reference_pixel: [0, 0],
            parallel_eyes: true,
        }
    }
}

/// Calibration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Timestamp of the calibration still (seconds).
    #[serde(default = "default_still_offset")]
    pub still_offset_secs: f64,

    /// Width the calibration stills are scaled to.
    #[serde(default = "default_still_width")]
    pub still_width: u32,

    /// Lens projection code written into the initial project.
    #[serde(default = "default_lens_projection")]
    pub lens_projection: u32,

    /// Fewest control points an optimised project may carry.
    #[serde(default = "default_min_control_points")]
    pub min_control_points: usize,

    /// Largest accepted |pitch| and |roll| in degrees.
    #[serde(default = "default_max_tilt")]
    pub max_tilt_degrees: f64,

    /// Extract left and right stills concurrently.
    #[serde(default = "default_true")]
    pub parallel_eyes: bool,
}

fn default_still_offset() -> f64 {
    1.0
}

fn default_still_width() -> u32 {
    1920
}

fn default_lens_projection() -> u32 {
    2
}

fn default_min_control_points() -> usize {
    3
}

fn default_max_tilt() -> f64 {
    90.0
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            still_offset_secs: default_still_offset(),
            still_width: default_still_width(),
            lens_projection: default_lens_projection(),
            min_control_points: default_min_control_points(),
            max_tilt_degrees: default_max_tilt(),
            parallel_eyes: true,
        }
    }
}

/// Projection and blend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Output frame rate.
    #[serde(default = "default_output_fps")]
    pub output_fps: f64,

    /// Presentation timestamp multiplier applied before resampling.
    #[serde(default = "default_pts_multiplier")]
    pub pts_multiplier: f64,

    /// Square working resolution frames and masks are scaled to.
    #[serde(default = "default_square")]
    pub scale_size: u32,

    /// Square canvas the blended frame is padded onto.
    #[serde(default = "default_square")]
    pub canvas_size: u32,

    /// Per-eye equirectangular width.
    #[serde(default = "default_square")]
    pub output_width: u32,

    /// Per-eye equirectangular height.
    #[serde(default = "default_square")]
    pub output_height: u32,

    /// Lens field of view in degrees.
    #[serde(default = "default_input_fov")]
    pub input_fov: f64,

    /// Horizontal field of view of the output.
    #[serde(default = "default_output_fov")]
    pub output_h_fov: f64,

    /// Vertical field of view of the output.
    #[serde(default = "default_output_fov")]
    pub output_v_fov: f64,

    /// Allowed frame count deviation of the rendered file.
    #[serde(default = "default_frame_tolerance")]
    pub frame_tolerance: u64,

    /// Probe the rendered file and check it against the request.
    #[serde(default = "default_true")]
    pub verify_output: bool,
}

fn default_output_fps() -> f64 {
    60.0
}

fn default_pts_multiplier() -> f64 {
    1.0
}

fn default_square() -> u32 {
    2880
}

fn default_input_fov() -> f64 {
    202.0
}

fn default_output_fov() -> f64 {
    180.0
}

fn default_frame_tolerance() -> u64 {
    1
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            output_fps: default_output_fps(),
            pts_multiplier: default_pts_multiplier(),
            scale_size: default_square(),
            canvas_size: default_square(),
            output_width: default_square(),
            output_height: default_square(),
            input_fov: default_input_fov(),
            output_h_fov: default_output_fov(),
            output_v_fov: default_output_fov(),
            frame_tolerance: default_frame_tolerance(),
            verify_output: true,
        }
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    #[serde(default = "default_codec")]
    pub codec: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// Frame packing of the two eyes.
    #[serde(default)]
    pub stereo_layout: StereoLayout,
}

fn default_codec() -> String {
    "libx264".to_string()
}

fn default_profile() -> String {
    "high".to_string()
}

fn default_pix_fmt() -> String {
    "yuv420p".to_string()
}

fn default_crf() -> u32 {
    18
}

fn default_preset() -> String {
    "medium".to_string()
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            profile: default_profile(),
            pix_fmt: default_pix_fmt(),
            crf: default_crf(),
            preset: default_preset(),
            stereo_layout: StereoLayout::default(),
        }
    }
}

/// Executable names or absolute paths of the external tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    #[serde(default = "default_magick")]
    pub magick: String,
    #[serde(default = "default_pto_gen")]
    pub pto_gen: String,
    #[serde(default = "default_cpfind")]
    pub cpfind: String,
    #[serde(default = "default_cpclean")]
    pub cpclean: String,
    #[serde(default = "default_linefind")]
    pub linefind: String,
    #[serde(default = "default_autooptimiser")]
    pub autooptimiser: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_magick() -> String {
    "magick".to_string()
}

fn default_pto_gen() -> String {
    "pto_gen".to_string()
}

fn default_cpfind() -> String {
    "cpfind".to_string()
}

fn default_cpclean() -> String {
    "cpclean".to_string()
}

fn default_linefind() -> String {
    "linefind".to_string()
}

fn default_autooptimiser() -> String {
    "autooptimiser".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            magick: default_magick(),
            pto_gen: default_pto_gen(),
            cpfind: default_cpfind(),
            cpclean: default_cpclean(),
            linefind: default_linefind(),
            autooptimiser: default_autooptimiser(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Masks,
    Calibration,
    Render,
    Encode,
    Tools,
}

impl ConfigSection {
    /// All sections in file order.
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Masks,
        ConfigSection::Calibration,
        ConfigSection::Render,
        ConfigSection::Encode,
        ConfigSection::Tools,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Masks => "masks",
            ConfigSection::Calibration => "calibration",
            ConfigSection::Render => "render",
            ConfigSection::Encode => "encode",
            ConfigSection::Tools => "tools",
        }
    }

    /// Comment written above the table in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Masks => "Blend mask generation",
            ConfigSection::Calibration => "Camera orientation calibration",
            ConfigSection::Render => "Projection, blending and frame rate",
            ConfigSection::Encode => "Final encode",
            ConfigSection::Tools => "External executables",
        }
    }
}
