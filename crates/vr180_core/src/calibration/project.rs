//! Reader and rewriter for the text project format of the calibration tools.
//!
//! Only the parts the pipeline needs are interpreted: image lines (`i`)
//! with their orientation and file name, and control point lines (`c`).
//! Every other line is carried through untouched.
//!
//! ```text
//! i w1920 h1920 f2 v202 r0.5 p-1.25 y3 n"take1_left_still.jpg"
//! i w1920 h1920 f2 v=0 r-0.1 p0.4 y181.2 n"take1_right_still.jpg"
//! c n0 N1 x812.5 y400.1 X790.2 Y412.8 t0
//! ```

use thiserror::Error;

use crate::models::Orientation;
use crate::orchestrator::StepError;

/// Errors raised while reading a project file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("image {0} not present in project")]
    MissingImage(usize),

    #[error("image {0}: angle links form a cycle")]
    LinkCycle(usize),
}

impl From<ProjectError> for StepError {
    fn from(err: ProjectError) -> Self {
        StepError::parse_error("calibration project", err.to_string())
    }
}

/// One angle of an image: a literal or a link to another image's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleValue {
    Value(f64),
    Link(usize),
}

/// One image entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectImage {
    pub yaw: AngleValue,
    pub pitch: AngleValue,
    pub roll: AngleValue,
    pub file_name: Option<String>,
}

/// One correspondence between two images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub image_a: usize,
    pub image_b: usize,
    pub a: (f64, f64),
    pub b: (f64, f64),
    /// 0 for a point pair, >0 for points on a straight line.
    pub kind: u32,
}

impl ControlPoint {
    pub fn is_line(&self) -> bool {
        self.kind > 0
    }
}

/// A parsed project description.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFile {
    lines: Vec<String>,
    images: Vec<ProjectImage>,
    control_points: Vec<ControlPoint>,
}

#[derive(Clone, Copy)]
enum Axis {
    Yaw,
    Pitch,
    Roll,
}

impl ProjectFile {
    pub fn parse(text: &str) -> Result<Self, ProjectError> {
        let mut images = Vec::new();
        let mut control_points = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let number = index + 1;
            let trimmed = line.trim_start();
            if let Some(rest) = trimmed.strip_prefix("i ") {
                images.push(parse_image(rest, number)?);
            } else if let Some(rest) = trimmed.strip_prefix("c ") {
                control_points.push(parse_control_point(rest, number)?);
            }
        }

        Ok(Self {
            lines: text.lines().map(str::to_string).collect(),
            images,
            control_points,
        })
    }

    pub fn images(&self) -> &[ProjectImage] {
        &self.images
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// Point pairs, not counting straight-line points.
    pub fn point_pair_count(&self) -> usize {
        self.control_points.iter().filter(|c| !c.is_line()).count()
    }

    pub fn line_point_count(&self) -> usize {
        self.control_points.iter().filter(|c| c.is_line()).count()
    }

    /// Resolved yaw/pitch/roll of one image.
    pub fn orientation(&self, image: usize) -> Result<Orientation, ProjectError> {
        Ok(Orientation {
            yaw: self.resolve(image, Axis::Yaw)?,
            pitch: self.resolve(image, Axis::Pitch)?,
            roll: self.resolve(image, Axis::Roll)?,
        })
    }

    fn resolve(&self, image: usize, axis: Axis) -> Result<f64, ProjectError> {
        let mut current = image;
        for _ in 0..=self.images.len() {
            let entry = self
                .images
                .get(current)
                .ok_or(ProjectError::MissingImage(current))?;
            let value = match axis {
                Axis::Yaw => entry.yaw,
                Axis::Pitch => entry.pitch,
                Axis::Roll => entry.roll,
            };
            match value {
                AngleValue::Value(v) => return Ok(v),
                AngleValue::Link(target) => current = target,
            }
        }
        Err(ProjectError::LinkCycle(image))
    }

    /// Copy of the project with every image set to `orientation`.
    ///
    /// Links on the angle keys are replaced by literal values; the rest of
    /// each line is kept as written.
    pub fn with_orientation(&self, orientation: &Orientation) -> ProjectFile {
        let lines = self
            .lines
            .iter()
            .map(|line| match line.trim_start().strip_prefix("i ") {
                Some(rest) => rewrite_image_line(rest, orientation),
                None => line.clone(),
            })
            .collect();
        let images = self
            .images
            .iter()
            .map(|image| ProjectImage {
                yaw: AngleValue::Value(orientation.yaw),
                pitch: AngleValue::Value(orientation.pitch),
                roll: AngleValue::Value(orientation.roll),
                file_name: image.file_name.clone(),
            })
            .collect();
        ProjectFile {
            lines,
            images,
            control_points: self.control_points.clone(),
        }
    }

    /// Serialize back to text.
    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Split a line into `key value` tokens, keeping quoted values intact.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                if start.is_none() {
                    start = Some(i);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(s) = start.take() {
                    tokens.push(&line[s..i]);
                }
            }
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

fn split_key(token: &str) -> (&str, &str) {
    match token.find(|c: char| !c.is_ascii_alphabetic()) {
        Some(end) => token.split_at(end),
        // `pnan`, `yinf`: an unsigned non-finite value has no delimiter
        None => {
            let lower = token.to_ascii_lowercase();
            if token.len() > 3 && (lower.ends_with("nan") || lower.ends_with("inf")) {
                token.split_at(token.len() - 3)
            } else {
                (token, "")
            }
        }
    }
}

fn parse_number(value: &str, key: &str, line: usize) -> Result<f64, ProjectError> {
    value.parse::<f64>().map_err(|_| ProjectError::Malformed {
        line,
        message: format!("invalid value '{}' for {}", value, key),
    })
}

fn parse_angle(value: &str, key: &str, line: usize) -> Result<AngleValue, ProjectError> {
    match value.strip_prefix('=') {
        Some(target) => target
            .parse::<usize>()
            .map(AngleValue::Link)
            .map_err(|_| ProjectError::Malformed {
                line,
                message: format!("invalid link '{}' for {}", value, key),
            }),
        None => parse_number(value, key, line).map(AngleValue::Value),
    }
}

fn parse_image(rest: &str, line: usize) -> Result<ProjectImage, ProjectError> {
    let mut yaw = None;
    let mut pitch = None;
    let mut roll = None;
    let mut file_name = None;

    for token in tokenize(rest) {
        match split_key(token) {
            ("y", value) => yaw = Some(parse_angle(value, "y", line)?),
            ("p", value) => pitch = Some(parse_angle(value, "p", line)?),
            ("r", value) => roll = Some(parse_angle(value, "r", line)?),
            ("n", value) => file_name = Some(value.trim_matches('"').to_string()),
            _ => {}
        }
    }

    let missing = |key: &str| ProjectError::Malformed {
        line,
        message: format!("image without {}", key),
    };
    Ok(ProjectImage {
        yaw: yaw.ok_or_else(|| missing("yaw"))?,
        pitch: pitch.ok_or_else(|| missing("pitch"))?,
        roll: roll.ok_or_else(|| missing("roll"))?,
        file_name,
    })
}

fn parse_control_point(rest: &str, line: usize) -> Result<ControlPoint, ProjectError> {
    let mut values = [None::<f64>; 7];
    for token in tokenize(rest) {
        let (key, value) = split_key(token);
        let slot = match key {
            "n" => 0,
            "N" => 1,
            "x" => 2,
            "y" => 3,
            "X" => 4,
            "Y" => 5,
            "t" => 6,
            _ => continue,
        };
        values[slot] = Some(parse_number(value, key, line)?);
    }

    let get = |slot: usize, key: &str| {
        values[slot].ok_or_else(|| ProjectError::Malformed {
            line,
            message: format!("control point without {}", key),
        })
    };
    Ok(ControlPoint {
        image_a: get(0, "n")? as usize,
        image_b: get(1, "N")? as usize,
        a: (get(2, "x")?, get(3, "y")?),
        b: (get(4, "X")?, get(5, "Y")?),
        kind: values[6].unwrap_or(0.0) as u32,
    })
}

fn rewrite_image_line(rest: &str, orientation: &Orientation) -> String {
    let tokens: Vec<String> = tokenize(rest)
        .into_iter()
        .map(|token| match split_key(token).0 {
            "y" => format!("y{}", orientation.yaw),
            "p" => format!("p{}", orientation.pitch),
            "r" => format!("r{}", orientation.roll),
            _ => token.to_string(),
        })
        .collect();
    format!("i {}", tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "# hugin project file
p f3 w5760 h2880 v360 n\"TIFF_m\"
i w1920 h1920 f2 v202 Ra0 Eev0 r0.5 p-1.25 y3 TrX0 n\"my left still.jpg\"
i w1920 h1920 f2 v=0 Ra0 Eev0 r=0 p0.4 y181.2 TrX0 n\"right.jpg\"
c n0 N1 x812.5 y400.1 X790.2 Y412.8 t0
c n0 N1 x12 y40 X70 Y41 t0
c n1 N1 x10 y10 X10 Y900 t3
";

    #[test]
    fn parses_images_and_points() {
        let project = ProjectFile::parse(PROJECT).unwrap();
        assert_eq!(project.images().len(), 2);
        assert_eq!(
            project.images()[0].file_name.as_deref(),
            Some("my left still.jpg")
        );
        assert_eq!(project.point_pair_count(), 2);
        assert_eq!(project.line_point_count(), 1);
        assert_eq!(project.control_points()[0].a, (812.5, 400.1));
    }

    #[test]
    fn links_resolve_to_target_image() {
        let project = ProjectFile::parse(PROJECT).unwrap();
        let right = project.orientation(1).unwrap();
        assert_eq!(right, Orientation::new(181.2, 0.4, 0.5));
        assert_eq!(
            project.orientation(0).unwrap(),
            Orientation::new(3.0, -1.25, 0.5)
        );
        assert_eq!(project.orientation(2), Err(ProjectError::MissingImage(2)));
    }

    #[test]
    fn link_cycles_are_detected() {
        let text = "i r=1 p0 y0\ni r=0 p0 y0\n";
        let project = ProjectFile::parse(text).unwrap();
        assert_eq!(project.orientation(0), Err(ProjectError::LinkCycle(0)));
    }

    #[test]
    fn nan_angles_parse() {
        let project = ProjectFile::parse("i r0 p-nan y0\n").unwrap();
        assert!(!project.orientation(0).unwrap().is_finite());
    }

    #[test]
    fn unsigned_nan_parses() {
        let project = ProjectFile::parse("i r0 pNaN y0\n").unwrap();
        assert!(project.orientation(0).unwrap().pitch.is_nan());
    }

    #[test]
    fn garbage_values_are_malformed() {
        let err = ProjectFile::parse("p f3\ni r0 pabc y0\n").unwrap_err();
        assert!(matches!(err, ProjectError::Malformed { line: 2, .. }));
        assert!(ProjectFile::parse("i r0 p0\n").is_err());
    }

    #[test]
    fn with_orientation_rewrites_every_image() {
        let project = ProjectFile::parse(PROJECT).unwrap();
        let angles = Orientation::new(10.125, 0.0, -0.000125);
        let rewritten = project.with_orientation(&angles);

        assert_eq!(rewritten.orientation(0).unwrap(), angles);
        assert_eq!(rewritten.orientation(1).unwrap(), angles);

        let reparsed = ProjectFile::parse(&rewritten.render()).unwrap();
        assert_eq!(reparsed.orientation(1).unwrap(), angles);
        assert_eq!(reparsed.images()[0].file_name.as_deref(), Some("my left still.jpg"));
        assert_eq!(reparsed.point_pair_count(), 2);
        assert!(rewritten.render().contains("v=0"));

        // Source project is untouched
        assert_eq!(project.orientation(1).unwrap().yaw, 181.2);
    }
}
