//! Builders for the panorama calibration tools.
//!
//! Each tool reads one project file and writes a new one; nothing is
//! modified in place.

use std::path::Path;

use super::ffmpeg::format_number;
use super::runner::ToolInvocation;

/// Initial two-image project from the calibration stills.
pub fn generate_project(
    pto_gen: &str,
    left_still: &Path,
    right_still: &Path,
    fov: f64,
    projection: u32,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new("project generation", pto_gen)
        .arg("-o")
        .output(output)
        .arg("-p")
        .arg(projection.to_string())
        .arg("-f")
        .arg(format_number(fov))
        .path(left_still)
        .path(right_still)
}

/// Control point detection tuned for overlapping fisheye pairs.
pub fn find_control_points(cpfind: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("control point detection", cpfind)
        .args(["--fullscale", "--celeste", "--multirow", "-o"])
        .output(output)
        .path(input)
}

/// Statistical removal of unreliable control points.
pub fn clean_control_points(cpclean: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("control point cleaning", cpclean)
        .arg("-o")
        .output(output)
        .path(input)
}

/// Straight line detection.
pub fn find_lines(linefind: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("line detection", linefind)
        .arg("-o")
        .output(output)
        .path(input)
}

/// Global optimisation of orientation and lens parameters.
pub fn optimise(autooptimiser: &str, input: &Path, output: &Path) -> ToolInvocation {
    ToolInvocation::new("optimisation", autooptimiser)
        .args(["-a", "-l", "-s", "-o"])
        .output(output)
        .path(input)
}
