//! Artifact identities.

use serde::{Deserialize, Serialize};

use crate::models::Eye;

/// Calibration project files, one per stage of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStage {
    /// Generated from the two stills.
    Initial,
    /// With detected control points.
    WithPoints,
    /// Unreliable points removed.
    Cleaned,
    /// Straight-line constraints added.
    WithLines,
    /// Optimised angles.
    Optimized,
    /// Optimised project with manual angles written in.
    Override,
}

impl ProjectStage {
    /// The stages produced by a calibration run, in order.
    pub const CHAIN: [ProjectStage; 5] = [
        ProjectStage::Initial,
        ProjectStage::WithPoints,
        ProjectStage::Cleaned,
        ProjectStage::WithLines,
        ProjectStage::Optimized,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            ProjectStage::Initial => "initial",
            ProjectStage::WithPoints => "points",
            ProjectStage::Cleaned => "cleaned",
            ProjectStage::WithLines => "lines",
            ProjectStage::Optimized => "optimized",
            ProjectStage::Override => "override",
        }
    }
}

/// Everything a run writes next to its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    MaskAverage(Eye),
    MaskNormalized(Eye),
    MaskAlpha(Eye),
    MaskNormalizedAlpha(Eye),
    MaskBorderAlpha(Eye),
    CalibrationStill(Eye),
    Project(ProjectStage),
    /// Text file holding the path of the active calibration project.
    CurrentProject,
    /// ffconcat list of an eye's segments.
    ConcatList(Eye),
    /// JSON record of a finished run.
    Manifest,
}

impl ArtifactKind {
    /// File name suffix appended to the prefix.
    pub fn file_suffix(&self) -> String {
        match self {
            ArtifactKind::MaskAverage(eye) => format!("{}_average.png", eye),
            ArtifactKind::MaskNormalized(eye) => format!("{}_normalized.png", eye),
            ArtifactKind::MaskAlpha(eye) => format!("{}_alpha.png", eye),
            ArtifactKind::MaskNormalizedAlpha(eye) => format!("{}_normalized_alpha.png", eye),
            ArtifactKind::MaskBorderAlpha(eye) => format!("{}_border_alpha.png", eye),
            ArtifactKind::CalibrationStill(eye) => format!("{}_still.jpg", eye),
            ArtifactKind::Project(stage) => format!("calib_{}.pto", stage.suffix()),
            ArtifactKind::CurrentProject => "calib_current.txt".to_string(),
            ArtifactKind::ConcatList(eye) => format!("{}_segments.ffconcat", eye),
            ArtifactKind::Manifest => "manifest.json".to_string(),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::MaskAverage(eye) => write!(f, "{} average still", eye),
            ArtifactKind::MaskNormalized(eye) => write!(f, "{} normalized mask", eye),
            ArtifactKind::MaskAlpha(eye) => write!(f, "{} alpha mask", eye),
            ArtifactKind::MaskNormalizedAlpha(eye) => write!(f, "{} normalized-alpha mask", eye),
            ArtifactKind::MaskBorderAlpha(eye) => write!(f, "{} border-alpha mask", eye),
            ArtifactKind::CalibrationStill(eye) => write!(f, "{} calibration still", eye),
            ArtifactKind::Project(stage) => write!(f, "{} calibration project", stage.suffix()),
            ArtifactKind::CurrentProject => write!(f, "current calibration pointer"),
            ArtifactKind::ConcatList(eye) => write!(f, "{} segment list", eye),
            ArtifactKind::Manifest => write!(f, "run manifest"),
        }
    }
}
