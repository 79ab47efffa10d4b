//! ffmpeg command builders.

use std::path::{Path, PathBuf};

use super::runner::ToolInvocation;
use crate::config::EncodeSettings;
use crate::models::StereoLayout;

/// One `-i` input of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    /// A regular media or image file.
    File(PathBuf),
    /// An ffconcat list, read segment by segment by the concat demuxer.
    ConcatList(PathBuf),
}

impl InputSpec {
    fn append_to(&self, invocation: ToolInvocation) -> ToolInvocation {
        match self {
            InputSpec::File(path) => invocation.arg("-i").path(path),
            InputSpec::ConcatList(list) => invocation
                .args(["-f", "concat", "-safe", "0", "-i"])
                .path(list),
        }
    }
}

/// Average the first `frame_window` frames into one 16-bit still.
///
/// Frames are widened to 16-bit planar RGB before `tmix` so the mean is not
/// rounded to the decoder's 8 bits. Frame `n` of `tmix` blends frames
/// `n-window+1..=n`, so the last frame of the trimmed stream is the mean of
/// the whole window.
pub fn average_frames(
    ffmpeg: &str,
    eye_label: &str,
    input: &Path,
    frame_window: u32,
    output: &Path,
) -> ToolInvocation {
    let window = frame_window.max(1);
    let filter = format!(
        "trim=end_frame={window},format=gbrp16le,tmix=frames={window},select=eq(n\\,{last})",
        window = window,
        last = window - 1
    );
    ToolInvocation::new(format!("frame average ({})", eye_label), ffmpeg)
        .args(["-hide_banner", "-y", "-i"])
        .path(input)
        .args(["-an", "-vf"])
        .arg(filter)
        .args(["-frames:v", "1", "-pix_fmt", "rgb48be"])
        .output(output)
}

/// Grab one frame at `offset_secs`, scaled down to `width`.
pub fn extract_still(
    ffmpeg: &str,
    eye_label: &str,
    input: &Path,
    offset_secs: f64,
    width: u32,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new(format!("calibration still ({})", eye_label), ffmpeg)
        .args(["-hide_banner", "-y", "-ss"])
        .arg(format!("{:.3}", offset_secs))
        .arg("-i")
        .path(input)
        .args(["-an", "-frames:v", "1", "-vf"])
        .arg(format!("scale={}:-2", width))
        .args(["-q:v", "2"])
        .output(output)
}

/// Encoder arguments for the packed stereo output.
pub fn encode_args(encode: &EncodeSettings, fps: f64) -> Vec<String> {
    let mut args = vec![
        "-an".to_string(),
        "-c:v".to_string(),
        encode.codec.clone(),
        "-profile:v".to_string(),
        encode.profile.clone(),
        "-preset".to_string(),
        encode.preset.clone(),
        "-crf".to_string(),
        encode.crf.to_string(),
        "-pix_fmt".to_string(),
        encode.pix_fmt.clone(),
        "-r".to_string(),
        format_number(fps),
    ];
    args.extend(stereo_args(&encode.codec, encode.stereo_layout));
    args
}

/// Frame-packing signalling for the chosen codec.
fn stereo_args(codec: &str, layout: StereoLayout) -> Vec<String> {
    let mut args = Vec::new();
    if codec == "libx264" {
        args.push("-x264-params".to_string());
        args.push(format!("frame-packing={}", layout.frame_packing_type()));
    }
    args.push("-metadata:s:v:0".to_string());
    args.push(format!("stereo_mode={}", layout.stereo_mode()));
    args
}

/// Run a filter graph over the given inputs and encode `output_label`.
pub fn render(
    ffmpeg: &str,
    inputs: &[InputSpec],
    filter_graph: &str,
    output_label: &str,
    encode: &EncodeSettings,
    fps: f64,
    output: &Path,
) -> ToolInvocation {
    let mut invocation =
        ToolInvocation::new("stereo render", ffmpeg).args(["-hide_banner", "-y"]);
    for input in inputs {
        invocation = input.append_to(invocation);
    }
    invocation
        .arg("-filter_complex")
        .arg(filter_graph)
        .arg("-map")
        .arg(format!("[{}]", output_label))
        .args(encode_args(encode, fps))
        .output(output)
}

/// Format a float without trailing zeros (`60.0` -> `60`, `29.97` -> `29.97`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_selects_last_frame_of_window() {
        let inv = average_frames(
            "ffmpeg",
            "left",
            Path::new("/in/left.mp4"),
            128,
            Path::new("/out/take1_left_average.png"),
        );
        let vf = inv.args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(
            inv.args[vf + 1],
            "trim=end_frame=128,format=gbrp16le,tmix=frames=128,select=eq(n\\,127)"
        );
        let filter = &inv.args[vf + 1];
        let widen = filter.find("format=gbrp16le").unwrap();
        assert!(widen < filter.find("tmix=").unwrap());
        assert!(inv.args.contains(&"rgb48be".to_string()));
        assert_eq!(inv.outputs.len(), 1);
    }

    #[test]
    fn still_seeks_before_input() {
        let inv = extract_still(
            "ffmpeg",
            "right",
            Path::new("r.mp4"),
            1.0,
            1920,
            Path::new("still.jpg"),
        );
        let ss = inv.args.iter().position(|a| a == "-ss").unwrap();
        let input = inv.args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(inv.args[ss + 1], "1.000");
        assert!(inv.args.contains(&"scale=1920:-2".to_string()));
    }

    #[test]
    fn concat_input_uses_demuxer() {
        let inv = render(
            "ffmpeg",
            &[
                InputSpec::ConcatList(PathBuf::from("left.ffconcat")),
                InputSpec::File(PathBuf::from("mask.png")),
            ],
            "[0:v][1:v]overlay[out]",
            "out",
            &EncodeSettings::default(),
            60.0,
            Path::new("out.mp4"),
        );
        let joined = inv.args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i left.ffconcat -i mask.png"));
        assert!(joined.contains("-map [out]"));
        assert!(joined.contains("-an"));
        assert!(joined.contains("-x264-params frame-packing=3"));
        assert!(joined.contains("stereo_mode=left_right"));
        assert!(joined.contains("-r 60"));
    }

    #[test]
    fn non_x264_codec_only_tags_stereo_mode() {
        let encode = EncodeSettings {
            codec: "libx265".to_string(),
            profile: "main".to_string(),
            stereo_layout: StereoLayout::TopBottom,
            ..EncodeSettings::default()
        };
        let args = encode_args(&encode, 30.0);
        assert!(!args.iter().any(|a| a == "-x264-params"));
        assert!(args.contains(&"stereo_mode=top_bottom".to_string()));
    }

    #[test]
    fn numbers_drop_trailing_zero() {
        assert_eq!(format_number(60.0), "60");
        assert_eq!(format_number(202.5), "202.5");
        assert_eq!(format_number(-3.0), "-3");
    }
}
