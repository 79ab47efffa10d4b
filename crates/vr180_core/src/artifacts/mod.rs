//! Persisted intermediate artifacts.
//!
//! Every artifact of a run is named after a caller-chosen prefix and an
//! [`ArtifactKind`]. A prefix of `/shoot/take1` puts all files in `/shoot`:
//!
//! ```text
//! /shoot/take1_left_average.png
//! /shoot/take1_left_normalized_alpha.png
//! /shoot/take1_calib_optimized.pto
//! /shoot/take1_calib_current.txt   -> points at the active project
//! ```
//!
//! Reuse flags only check existence through [`ArtifactStore::require`];
//! nothing verifies that a cached file still matches the input videos.

mod kinds;
mod store;

pub use kinds::{ArtifactKind, ProjectStage};
pub use store::ArtifactStore;
