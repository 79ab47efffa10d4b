//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Identity of one camera in the stereo pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Both eyes, in stacking order.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// Lowercase label used in artifact names and filter-graph pads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Eye::Left => "left",
            Eye::Right => "right",
        }
    }

    /// The opposite eye.
    pub fn other(&self) -> Eye {
        match self {
            Eye::Left => Eye::Right,
            Eye::Right => Eye::Left,
        }
    }

    /// Image index of this eye's still inside a calibration project.
    ///
    /// Stills are always handed to project generation left first.
    pub fn image_index(&self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

impl std::fmt::Display for Eye {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the two eye frames are packed into one output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoLayout {
    /// Left eye on the left half, right eye on the right half.
    #[default]
    SideBySide,
    /// Left eye on top, right eye at the bottom.
    TopBottom,
}

impl StereoLayout {
    /// ffmpeg filter that stacks the two eye streams.
    pub fn stack_filter(&self) -> &'static str {
        match self {
            StereoLayout::SideBySide => "hstack",
            StereoLayout::TopBottom => "vstack",
        }
    }

    /// H.264 SEI frame-packing arrangement type.
    pub fn frame_packing_type(&self) -> u8 {
        match self {
            StereoLayout::SideBySide => 3,
            StereoLayout::TopBottom => 4,
        }
    }

    /// Matroska `stereo_mode` tag value.
    pub fn stereo_mode(&self) -> &'static str {
        match self {
            StereoLayout::SideBySide => "left_right",
            StereoLayout::TopBottom => "top_bottom",
        }
    }
}

impl std::fmt::Display for StereoLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StereoLayout::SideBySide => write!(f, "side-by-side"),
            StereoLayout::TopBottom => write!(f, "top-bottom"),
        }
    }
}
