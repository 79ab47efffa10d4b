//! Duration and stream probing with ffprobe.

use std::path::Path;

use serde_json::Value;

use super::runner::{ToolInvocation, ToolRunner};
use crate::logging::JobLogger;
use crate::models::VideoSource;
use crate::orchestrator::{StepError, StepResult};

/// Summary of the first video stream of a file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StreamSummary {
    pub frames: u64,
    pub pix_fmt: String,
    pub profile: String,
    pub width: u32,
    pub height: u32,
}

pub fn duration_invocation(ffprobe: &str, input: &Path) -> ToolInvocation {
    ToolInvocation::new("duration probe", ffprobe)
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .path(input)
}

pub fn stream_invocation(ffprobe: &str, input: &Path) -> ToolInvocation {
    ToolInvocation::new("stream probe", ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames,pix_fmt,profile,width,height",
            "-of",
            "json",
        ])
        .path(input)
}

/// Container-reported frame count of the first video stream. Cheap, but
/// not every container records it.
pub fn frame_count_invocation(ffprobe: &str, input: &Path) -> ToolInvocation {
    ToolInvocation::new("frame count", ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=nb_frames",
            "-of",
            "json",
        ])
        .path(input)
}

/// Parse `streams[0].nb_frames`; `None` when the container omits it.
pub fn parse_frame_count(stdout: &str) -> StepResult<Option<u64>> {
    let json: Value = serde_json::from_str(stdout)
        .map_err(|e| StepError::parse_error("ffprobe output", e.to_string()))?;
    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| StepError::parse_error("ffprobe output", "no video stream"))?;
    Ok(stream
        .get("nb_frames")
        .and_then(number_or_string)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64))
}

/// Parse `format.duration` (seconds) from ffprobe JSON.
pub fn parse_duration(stdout: &str) -> StepResult<f64> {
    let json: Value = serde_json::from_str(stdout)
        .map_err(|e| StepError::parse_error("ffprobe output", e.to_string()))?;
    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(number_or_string)
        .ok_or_else(|| StepError::parse_error("ffprobe output", "no format duration"))?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(StepError::parse_error(
            "ffprobe output",
            format!("invalid duration {}", duration),
        ));
    }
    Ok(duration)
}

/// Parse the first stream entry from ffprobe JSON.
pub fn parse_stream_summary(stdout: &str) -> StepResult<StreamSummary> {
    let json: Value = serde_json::from_str(stdout)
        .map_err(|e| StepError::parse_error("ffprobe output", e.to_string()))?;
    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| StepError::parse_error("ffprobe output", "no video stream"))?;

    let frames = stream
        .get("nb_read_frames")
        .and_then(number_or_string)
        .map(|f| f as u64)
        .ok_or_else(|| StepError::parse_error("ffprobe output", "no frame count"))?;
    let text = |key: &str| {
        stream
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let dimension = |key: &str| stream.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    Ok(StreamSummary {
        frames,
        pix_fmt: text("pix_fmt"),
        profile: text("profile"),
        width: dimension("width"),
        height: dimension("height"),
    })
}

/// ffprobe reports most numbers as strings.
fn number_or_string(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Duration of one file in seconds.
pub fn probe_duration(
    runner: &dyn ToolRunner,
    logger: &JobLogger,
    ffprobe: &str,
    input: &Path,
) -> StepResult<f64> {
    let output = runner.run(&duration_invocation(ffprobe, input), logger)?;
    parse_duration(&output.stdout)
}

/// Total duration of a source, probing concatenated segments one at a time.
pub fn probe_source_duration(
    runner: &dyn ToolRunner,
    logger: &JobLogger,
    ffprobe: &str,
    source: &VideoSource,
) -> StepResult<f64> {
    let mut total = 0.0;
    for segment in source.segments() {
        total += probe_duration(runner, logger, ffprobe, segment)?;
    }
    Ok(total)
}

/// Frame count of a file's first video stream, if its container records one.
pub fn source_frame_count(
    runner: &dyn ToolRunner,
    logger: &JobLogger,
    ffprobe: &str,
    input: &Path,
) -> StepResult<Option<u64>> {
    let output = runner.run(&frame_count_invocation(ffprobe, input), logger)?;
    parse_frame_count(&output.stdout)
}

/// Probe the rendered file's video stream.
pub fn probe_stream(
    runner: &dyn ToolRunner,
    logger: &JobLogger,
    ffprobe: &str,
    input: &Path,
) -> StepResult<StreamSummary> {
    let output = runner.run(&stream_invocation(ffprobe, input), logger)?;
    parse_stream_summary(&output.stdout)
}

/// Frames a render of `duration` seconds should contain.
pub fn expected_frame_count(duration_secs: f64, pts_multiplier: f64, fps: f64) -> u64 {
    (duration_secs * pts_multiplier * fps).round().max(0.0) as u64
}
