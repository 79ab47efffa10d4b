//! Final stereo render.
//!
//! Each eye goes through the same chain before the two are stacked:
//!
//! ```text
//! raw ─setpts,fps,scale─┐
//!                       ├─blend(divide)─┐
//! normalized_alpha─scale┘               ├─overlay─pad─v360(fisheye→hequirect)
//! border_alpha──────────────────scale───┘
//! ```

mod graph;
mod pipeline;
mod request;

pub use graph::{build_filter_graph, FilterGraph, OUTPUT_LABEL};
pub use pipeline::{CompositionPipeline, ComposeOutput, RenderVerification};
pub use request::{CompositionRequest, RenderParams};
