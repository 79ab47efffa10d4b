//! Filter graph construction.

use super::request::CompositionRequest;
use crate::models::Eye;
use crate::tools::ffmpeg::format_number;

/// Pad carrying the stacked stereo frame.
pub const OUTPUT_LABEL: &str = "stereo";

/// A complete `-filter_complex` graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraph {
    /// Filter chains, joined with `;` on render.
    pub chains: Vec<String>,
    pub output_label: &'static str,
}

impl FilterGraph {
    pub fn render(&self) -> String {
        self.chains.join(";")
    }
}

/// Input order of a render: both videos, then the blend masks, then the
/// border overlays.
pub(crate) fn video_input(eye: Eye) -> usize {
    eye.image_index()
}

pub(crate) fn blend_mask_input(eye: Eye) -> usize {
    2 + eye.image_index()
}

pub(crate) fn border_input(eye: Eye) -> usize {
    4 + eye.image_index()
}

fn eye_chains(request: &CompositionRequest, eye: Eye) -> Vec<String> {
    let render = &request.render;
    let stream = request.stream(eye);
    let angles = request.orientation.get(eye);
    let size = render.scale_size;
    let canvas = render.canvas_size;
    let e = eye.as_str();

    vec![
        format!(
            "[{}:v]setpts=PTS*{},fps={},scale={}:{}[{e}_scaled]",
            video_input(eye),
            format_number(render.pts_multiplier),
            format_number(render.output_fps),
            size,
            size,
            e = e
        ),
        format!(
            "[{}:v]scale={}:{}[{e}_mask]",
            blend_mask_input(eye),
            size,
            size,
            e = e
        ),
        format!(
            "[{e}_scaled][{e}_mask]blend=all_mode=divide[{e}_blend]",
            e = e
        ),
        format!(
            "[{}:v]scale={}:{}[{e}_border]",
            border_input(eye),
            size,
            size,
            e = e
        ),
        format!(
            "[{e}_blend][{e}_border]overlay[{e}_masked]",
            e = e
        ),
        format!(
            "[{e}_masked]pad={c}:{c}:(ow-iw)/2:(oh-ih)/2[{e}_canvas]",
            c = canvas,
            e = e
        ),
        format!(
            "[{e}_canvas]v360=input=fisheye:output=hequirect:ih_fov={fov}:iv_fov={fov}:h_fov={h}:v_fov={v}:yaw={yaw}:pitch={pitch}:roll={roll}:w={w}:h={hh}[{e}_equirect]",
            e = e,
            fov = format_number(stream.input_fov),
            h = format_number(render.output_h_fov),
            v = format_number(render.output_v_fov),
            yaw = format_number(angles.yaw),
            pitch = format_number(angles.pitch),
            roll = format_number(angles.roll),
            w = render.output_width,
            hh = render.output_height,
        ),
    ]
}

/// Build the two-eye graph ending in [`OUTPUT_LABEL`].
pub fn build_filter_graph(request: &CompositionRequest) -> FilterGraph {
    let mut chains = Vec::new();
    for eye in Eye::BOTH {
        chains.extend(eye_chains(request, eye));
    }
    chains.push(format!(
        "[left_equirect][right_equirect]{}=inputs=2[{}]",
        request.encode.stereo_layout.stack_filter(),
        OUTPUT_LABEL
    ));
    FilterGraph {
        chains,
        output_label: OUTPUT_LABEL,
    }
}
