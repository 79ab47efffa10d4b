//! Media-related data structures (sources, eye streams, masks).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::Eye;

/// Raw video feeding one eye.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// A single recorded file.
    Single(PathBuf),
    /// Ordered segments of a capture split into time-bounded chunks.
    Concat(Vec<PathBuf>),
}

impl VideoSource {
    /// Build a source from one or more paths.
    ///
    /// Returns `None` for an empty list; more than one path selects
    /// concatenation mode.
    pub fn from_paths(mut paths: Vec<PathBuf>) -> Option<Self> {
        match paths.len() {
            0 => None,
            1 => paths.pop().map(VideoSource::Single),
            _ => Some(VideoSource::Concat(paths)),
        }
    }

    /// All files making up this source, in playback order.
    pub fn segments(&self) -> &[PathBuf] {
        match self {
            VideoSource::Single(path) => std::slice::from_ref(path),
            VideoSource::Concat(paths) => paths,
        }
    }

    /// First file of the source.
    pub fn first_segment(&self) -> Option<&Path> {
        self.segments().first().map(PathBuf::as_path)
    }

    /// Whether this source is a segment concatenation.
    pub fn is_concat(&self) -> bool {
        matches!(self, VideoSource::Concat(_))
    }

    /// Segments that do not exist on disk.
    pub fn missing_segments(&self) -> Vec<&Path> {
        self.segments()
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }
}

/// One camera's input to the pipeline.
///
/// Immutable once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeStream {
    /// Which eye this stream belongs to.
    pub eye: Eye,
    /// Raw footage that gets projected.
    pub source: VideoSource,
    /// Video used to derive the mask (usually a long static shot).
    pub mask_source: PathBuf,
    /// Lens field of view in degrees.
    pub input_fov: f64,
}

impl EyeStream {
    /// Create an eye stream whose mask is derived from the first raw segment.
    pub fn new(eye: Eye, source: VideoSource, input_fov: f64) -> Self {
        let mask_source = source
            .first_segment()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            eye,
            source,
            mask_source,
            input_fov,
        }
    }

    /// Use a dedicated video for mask generation.
    pub fn with_mask_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.mask_source = path.into();
        self
    }
}

/// Mask images derived for one eye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskImages {
    /// Temporal average of the first frames (high bit depth).
    pub average: PathBuf,
    /// Tone-normalized average.
    pub normalized: PathBuf,
    /// Posterized alpha cutout of the image circle.
    pub alpha: PathBuf,
    /// Normalized image with the surround made transparent.
    pub normalized_alpha: PathBuf,
    /// Transparent surround isolated, used as a seam overlay.
    pub border_alpha: PathBuf,
    /// Shared width of all images (0 when not inspected).
    pub width: u32,
    /// Shared height of all images (0 when not inspected).
    pub height: u32,
}

impl MaskImages {
    /// Images consumed or cached by later runs.
    pub fn persisted(&self) -> [&Path; 4] {
        [
            &self.normalized,
            &self.alpha,
            &self.normalized_alpha,
            &self.border_alpha,
        ]
    }
}

/// Per-eye pair of mask images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSet {
    pub left: MaskImages,
    pub right: MaskImages,
}

impl MaskSet {
    /// Mask images for an eye.
    pub fn get(&self, eye: Eye) -> &MaskImages {
        match eye {
            Eye::Left => &self.left,
            Eye::Right => &self.right,
        }
    }
}
