//! Pipeline step implementations.
//!
//! Each step handles one component of the stereo pipeline.

mod calibrate;
mod compose;
mod masks;
mod orient;

pub use calibrate::CalibrateStep;
pub use compose::ComposeStep;
pub use masks::MasksStep;
pub use orient::OrientStep;
