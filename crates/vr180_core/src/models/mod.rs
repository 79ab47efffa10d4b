//! Data models for the VR180 pipeline.
//!
//! This module contains the core data structures shared by every stage:
//! - Enums for eye identity and stereo layout
//! - Media structures (video sources, eye streams, mask images)
//! - Orientation angles and manual overrides
//! - The job specification handed to the orchestrator

mod enums;
mod jobs;
mod media;
mod orientation;

pub use enums::{Eye, StereoLayout};
pub use jobs::JobSpec;
pub use media::{EyeStream, MaskImages, MaskSet, VideoSource};
pub use orientation::{ManualOverride, Orientation, OrientationSpec};
