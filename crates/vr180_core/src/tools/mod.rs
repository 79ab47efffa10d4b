//! External tool invocation.
//!
//! Every expensive stage of the pipeline is an external program. This
//! module keeps the *what* (argument lists, built by pure functions per
//! tool) apart from the *how* (a [`ToolRunner`] that executes them).
//!
//! - `ffmpeg` / `ffprobe`: frame averaging, still extraction, final render,
//!   duration and stream probing
//! - `magick`: normalization, alpha extraction, alpha compositing
//! - `hugin`: calibration project generation and optimisation

pub mod ffmpeg;
pub mod ffprobe;
pub mod hugin;
pub mod magick;
mod runner;

#[cfg(test)]
pub mod fake;

pub use runner::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
