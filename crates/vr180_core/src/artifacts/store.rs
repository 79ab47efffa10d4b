//! Prefix-keyed artifact paths.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::kinds::ArtifactKind;
use crate::models::{Eye, MaskImages};
use crate::orchestrator::{StepError, StepResult};

/// Resolves `(prefix, kind)` pairs to files and checks for their presence.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    stem: String,
}

impl ArtifactStore {
    /// Create a store for a prefix such as `/shoot/take1`.
    pub fn new(prefix: impl AsRef<Path>) -> Self {
        let prefix = prefix.as_ref();
        let dir = prefix
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = prefix
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "vr180".to_string());
        Self { dir, stem }
    }

    /// Directory all artifacts live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an artifact.
    pub fn path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}", self.stem, kind.file_suffix()))
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.path(kind).is_file()
    }

    /// Path of an artifact that a reuse flag assumes is present.
    pub fn require(&self, kind: ArtifactKind) -> StepResult<PathBuf> {
        let path = self.path(kind);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StepError::missing_cached(kind.to_string(), path))
        }
    }

    /// Create the artifact directory.
    pub fn ensure_dir(&self) -> StepResult<()> {
        if self.dir.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| StepError::io_error("creating artifact directory", e))
    }

    /// Paths of one eye's mask images (dimensions not yet known).
    pub fn mask_images(&self, eye: Eye) -> MaskImages {
        MaskImages {
            average: self.path(ArtifactKind::MaskAverage(eye)),
            normalized: self.path(ArtifactKind::MaskNormalized(eye)),
            alpha: self.path(ArtifactKind::MaskAlpha(eye)),
            normalized_alpha: self.path(ArtifactKind::MaskNormalizedAlpha(eye)),
            border_alpha: self.path(ArtifactKind::MaskBorderAlpha(eye)),
            width: 0,
            height: 0,
        }
    }

    /// Mask kinds that must exist for masks to be reused.
    pub fn cached_mask_kinds(eye: Eye) -> [ArtifactKind; 4] {
        [
            ArtifactKind::MaskNormalized(eye),
            ArtifactKind::MaskAlpha(eye),
            ArtifactKind::MaskNormalizedAlpha(eye),
            ArtifactKind::MaskBorderAlpha(eye),
        ]
    }

    /// Point the current-calibration file at a project.
    ///
    /// Projects inside the artifact directory are stored by file name,
    /// others by absolute path, so `read_current` finds them from any
    /// working directory.
    pub fn set_current(&self, project: &Path) -> StepResult<()> {
        let target = pointer_target(&self.dir, project, std::env::current_dir)
            .map_err(|e| StepError::io_error("resolving calibration project path", e))?;
        let pointer = self.path(ArtifactKind::CurrentProject);
        let temp = pointer.with_extension("txt.tmp");
        fs::write(&temp, format!("{}\n", target.display()))
            .map_err(|e| StepError::io_error("writing calibration pointer", e))?;
        fs::rename(&temp, &pointer)
            .map_err(|e| StepError::io_error("replacing calibration pointer", e))
    }

    /// Project the current-calibration file points at, if any.
    ///
    /// Relative targets are resolved against the artifact directory.
    pub fn read_current(&self) -> StepResult<Option<PathBuf>> {
        let pointer = self.path(ArtifactKind::CurrentProject);
        if !pointer.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&pointer)
            .map_err(|e| StepError::io_error("reading calibration pointer", e))?;
        let target = content.trim();
        if target.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.dir.join(target)))
    }

    /// Write an ffconcat list of an eye's segments.
    ///
    /// Lines are streamed to disk one segment at a time.
    pub fn write_concat_list<'a, I>(&self, eye: Eye, segments: I) -> StepResult<PathBuf>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let list_path = self.path(ArtifactKind::ConcatList(eye));
        let file = fs::File::create(&list_path)
            .map_err(|e| StepError::io_error("creating segment list", e))?;
        let mut writer = BufWriter::new(file);

        let write_err = |e: std::io::Error| StepError::io_error("writing segment list", e);
        writeln!(writer, "ffconcat version 1.0").map_err(write_err)?;
        let mut count = 0usize;
        for segment in segments {
            let absolute = if segment.is_absolute() {
                segment.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(|e| StepError::io_error("resolving segment path", e))?
                    .join(segment)
            };
            writeln!(writer, "file '{}'", escape_concat_path(&absolute)).map_err(write_err)?;
            count += 1;
        }
        writer.flush().map_err(write_err)?;

        if count == 0 {
            return Err(StepError::invalid_input(format!(
                "no segments for {} eye",
                eye
            )));
        }
        Ok(list_path)
    }
}

/// Text stored in the pointer file for `project`: relative to `dir` when
/// the project lives there, absolute otherwise.
fn pointer_target(
    dir: &Path,
    project: &Path,
    cwd: impl FnOnce() -> std::io::Result<PathBuf>,
) -> std::io::Result<PathBuf> {
    if let Ok(inside) = project.strip_prefix(dir) {
        return Ok(inside.to_path_buf());
    }
    if project.is_absolute() {
        Ok(project.to_path_buf())
    } else {
        Ok(cwd()?.join(project))
    }
}

/// Quote a path for an ffconcat `file` directive.
fn escape_concat_path(path: &Path) -> String {
    path.display().to_string().replace('\'', "'\\''")
}
