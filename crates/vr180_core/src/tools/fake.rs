//! In-process stand-in for the external tools, used by tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::runner::{ToolInvocation, ToolOutput, ToolRunner};
use crate::logging::JobLogger;
use crate::models::Orientation;
use crate::orchestrator::{StepError, StepResult};

/// Render a two-image project with the given angles and control points.
pub fn sample_project(left: Orientation, right: Orientation, control_points: usize) -> String {
    let mut text = String::from("# hugin project file\np f3 w5760 h2880 v360 n\"TIFF_m\"\nm i0\n");
    for (index, angles) in [left, right].iter().enumerate() {
        text.push_str(&format!(
            "i w1920 h1920 f2 v202 Ra0 Rb0 Rc0 Rd0 Re0 Eev0 Er1 Eb1 r{} p{} y{} TrX0 TrY0 TrZ0 n\"still_{}.jpg\"\n",
            angles.roll, angles.pitch, angles.yaw, index
        ));
    }
    for n in 0..control_points {
        text.push_str(&format!(
            "c n0 N1 x{0}.5 y{0}.25 X{1}.5 Y{0}.25 t0\n",
            100 + n,
            200 + n
        ));
    }
    text.push_str("c n0 N0 x10 y10 X10 Y900 t3\n");
    text
}

/// Records invocations and fabricates their outputs.
pub struct FakeRunner {
    calls: Mutex<Vec<ToolInvocation>>,
    image_size: (u32, u32),
    project: String,
    durations: HashMap<PathBuf, f64>,
    default_duration: f64,
    output_frames: u64,
    output_pix_fmt: String,
    source_frames: Option<u64>,
    fail_on: Option<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            image_size: (64, 64),
            project: sample_project(
                Orientation::new(-1.5, 0.25, 0.5),
                Orientation::new(2.5, -0.75, 1.25),
                12,
            ),
            durations: HashMap::new(),
            default_duration: 10.0,
            output_frames: 600,
            output_pix_fmt: "yuv420p".to_string(),
            source_frames: Some(1200),
            fail_on: None,
        }
    }

    /// Text written for every project file the tools produce.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Duration reported for one probed file.
    pub fn with_duration(mut self, path: impl Into<PathBuf>, seconds: f64) -> Self {
        self.durations.insert(path.into(), seconds);
        self
    }

    pub fn with_default_duration(mut self, seconds: f64) -> Self {
        self.default_duration = seconds;
        self
    }

    /// Frame count and pixel format reported for the rendered output.
    pub fn with_output_stream(mut self, frames: u64, pix_fmt: &str) -> Self {
        self.output_frames = frames;
        self.output_pix_fmt = pix_fmt.to_string();
        self
    }

    /// Frame count the container of every input reports (`None`: not recorded).
    pub fn with_source_frames(mut self, frames: Option<u64>) -> Self {
        self.source_frames = frames;
        self
    }

    /// Make every invocation of `program` exit with status 1.
    pub fn failing_on(mut self, program: &str) -> Self {
        self.fail_on = Some(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().clone()
    }

    /// Number of invocations of a program.
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    pub fn stages(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.stage.clone()).collect()
    }

    fn probe_json(&self, invocation: &ToolInvocation) -> String {
        if invocation.stage == "frame count" {
            let frames = self
                .source_frames
                .map_or_else(|| "N/A".to_string(), |n| n.to_string());
            return format!(r#"{{"streams":[{{"nb_frames":"{}"}}]}}"#, frames);
        }
        if invocation.stage == "stream probe" {
            return format!(
                r#"{{"streams":[{{"width":5760,"height":2880,"pix_fmt":"{}","profile":"High","nb_read_frames":"{}"}}]}}"#,
                self.output_pix_fmt, self.output_frames
            );
        }
        let target = invocation.args.last().map(PathBuf::from).unwrap_or_default();
        let duration = self
            .durations
            .get(&target)
            .copied()
            .unwrap_or(self.default_duration);
        format!(r#"{{"format":{{"duration":"{:.6}"}}}}"#, duration)
    }

    fn materialize(&self, path: &Path) -> StepResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StepError::io_error("creating fake dir", e))?;
        }
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let (width, height) = self.image_size;
        let written = match extension.as_str() {
            "png" => image::RgbaImage::from_pixel(width, height, image::Rgba([128, 128, 128, 255]))
                .save(path)
                .map_err(|e| e.to_string()),
            "jpg" | "jpeg" => image::RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]))
                .save(path)
                .map_err(|e| e.to_string()),
            "pto" => fs::write(path, &self.project).map_err(|e| e.to_string()),
            _ => fs::write(path, b"fake media").map_err(|e| e.to_string()),
        };
        written.map_err(|e| StepError::other(format!("fake output {}: {}", path.display(), e)))
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &ToolInvocation, logger: &JobLogger) -> StepResult<ToolOutput> {
        logger.command(&invocation.command_line());
        self.calls.lock().push(invocation.clone());

        if self.fail_on.as_deref() == Some(invocation.program.as_str()) {
            return Err(StepError::command_failed(
                invocation.tool_name(),
                1,
                format!("{}: simulated failure", invocation.stage),
            ));
        }

        for output in &invocation.outputs {
            self.materialize(output)?;
        }

        let stdout = if invocation.program == "ffprobe" {
            self.probe_json(invocation)
        } else {
            String::new()
        };
        Ok(ToolOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }
}
