//! VR180 Core - stereo fisheye to equirectangular pipeline
//!
//! This crate contains the whole pipeline with no CLI dependencies:
//! mask generation, camera pair calibration, orientation resolution and
//! the final frame-packed render. Every heavy stage is an external tool
//! driven through [`tools::ToolRunner`].

pub mod artifacts;
pub mod calibration;
pub mod composition;
pub mod config;
pub mod logging;
pub mod masks;
pub mod models;
pub mod orchestrator;
pub mod orientation;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
