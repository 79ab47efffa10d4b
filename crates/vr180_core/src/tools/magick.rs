//! ImageMagick command builders for mask generation.

use std::path::Path;

use super::runner::ToolInvocation;

/// Normalize the tonal range, anchoring black at a reference pixel.
///
/// Painting one pixel black keeps `-normalize` stable on near-uniform
/// frames.
pub fn normalize(
    magick: &str,
    eye_label: &str,
    input: &Path,
    reference_pixel: [u32; 2],
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new(format!("normalize ({})", eye_label), magick)
        .path(input)
        .args(["-fill", "black", "-draw"])
        .arg(format!("point {},{}", reference_pixel[0], reference_pixel[1]))
        .arg("-normalize")
        .output(output)
}

/// Derive the image-circle cutout from a normalized still.
pub fn alpha_mask(
    magick: &str,
    eye_label: &str,
    normalized: &Path,
    low_pct: f64,
    high_pct: f64,
    levels: u32,
    output: &Path,
) -> ToolInvocation {
    ToolInvocation::new(format!("alpha mask ({})", eye_label), magick)
        .path(normalized)
        .arg("-contrast-stretch")
        .arg(format!("{}%x{}%", low_pct, high_pct))
        .args(["-colorspace", "Gray", "-posterize"])
        .arg(levels.to_string())
        .output(output)
}

/// Use `mask` as the opacity of `image`.
///
/// With `negate` the mask is inverted first, which keeps only the surround.
pub fn apply_alpha(
    magick: &str,
    stage: impl Into<String>,
    image: &Path,
    mask: &Path,
    negate: bool,
    output: &Path,
) -> ToolInvocation {
    let mut invocation = ToolInvocation::new(stage, magick).path(image);
    if negate {
        invocation = invocation.arg("(").path(mask).args(["-negate", ")"]);
    } else {
        invocation = invocation.path(mask);
    }
    invocation
        .args(["-alpha", "off", "-compose", "CopyOpacity", "-composite"])
        .output(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_draws_reference_point() {
        let inv = normalize(
            "magick",
            "left",
            Path::new("avg.png"),
            [0, 0],
            Path::new("norm.png"),
        );
        assert_eq!(
            inv.args,
            vec![
                "avg.png", "-fill", "black", "-draw", "point 0,0", "-normalize", "norm.png"
            ]
        );
    }

    #[test]
    fn alpha_mask_uses_stretch_and_posterize() {
        let inv = alpha_mask(
            "magick",
            "left",
            Path::new("norm.png"),
            3.0,
            77.0,
            8,
            Path::new("alpha.png"),
        );
        let joined = inv.args.join(" ");
        assert_eq!(
            joined,
            "norm.png -contrast-stretch 3%x77% -colorspace Gray -posterize 8 alpha.png"
        );
    }

    #[test]
    fn negated_alpha_groups_mask() {
        let inv = apply_alpha(
            "magick",
            "border",
            Path::new("norm.png"),
            Path::new("alpha.png"),
            true,
            Path::new("border.png"),
        );
        assert_eq!(
            inv.args.join(" "),
            "norm.png ( alpha.png -negate ) -alpha off -compose CopyOpacity -composite border.png"
        );
    }
}
