//! Mask generator driving the averaging and image tools.

use std::path::Path;

use image::{ImageDecoder, ImageReader};

use crate::artifacts::ArtifactStore;
use crate::config::{MaskSettings, ToolSettings};
use crate::logging::JobLogger;
use crate::models::{Eye, MaskImages};
use crate::orchestrator::{StepError, StepResult};
use crate::tools::{ffmpeg, ffprobe, magick, ToolRunner};

/// Builds the mask images of one eye.
pub struct MaskGenerator<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a ToolSettings,
    settings: &'a MaskSettings,
}

impl<'a> MaskGenerator<'a> {
    pub fn new(runner: &'a dyn ToolRunner, tools: &'a ToolSettings, settings: &'a MaskSettings) -> Self {
        Self {
            runner,
            tools,
            settings,
        }
    }

    /// Run all mask stages for `eye` and persist the images under the
    /// store's prefix.
    ///
    /// Any failing stage aborts the eye; images written by earlier stages
    /// stay on disk but are not reported as a mask set.
    pub fn build_masks(
        &self,
        eye: Eye,
        raw_video: &Path,
        store: &ArtifactStore,
        logger: &JobLogger,
    ) -> StepResult<MaskImages> {
        if !raw_video.is_file() {
            return Err(StepError::file_not_found(raw_video));
        }
        let label = eye.as_str();
        let mut images = store.mask_images(eye);
        logger.section(&format!("{} eye mask", label));

        let window = self.averaging_window(label, raw_video, logger)?;
        self.runner.run(
            &ffmpeg::average_frames(
                &self.tools.ffmpeg,
                label,
                raw_video,
                window,
                &images.average,
            ),
            logger,
        )?;

        self.runner.run(
            &magick::normalize(
                &self.tools.magick,
                label,
                &images.average,
                self.settings.reference_pixel,
                &images.normalized,
            ),
            logger,
        )?;

        self.runner.run(
            &magick::alpha_mask(
                &self.tools.magick,
                label,
                &images.normalized,
                self.settings.contrast_low_pct,
                self.settings.contrast_high_pct,
                self.settings.posterize_levels,
                &images.alpha,
            ),
            logger,
        )?;

        self.runner.run(
            &magick::apply_alpha(
                &self.tools.magick,
                format!("normalized alpha ({})", label),
                &images.normalized,
                &images.alpha,
                false,
                &images.normalized_alpha,
            ),
            logger,
        )?;

        self.runner.run(
            &magick::apply_alpha(
                &self.tools.magick,
                format!("border alpha ({})", label),
                &images.normalized,
                &images.alpha,
                true,
                &images.border_alpha,
            ),
            logger,
        )?;

        let (width, height) = check_mask_dimensions(&images)?;
        images.width = width;
        images.height = height;
        logger.info(&format!(
            "{} mask ready ({}x{})",
            label, width, height
        ));
        Ok(images)
    }

    /// Frames to average: the configured window, or every frame of a
    /// shorter source. Unknown counts keep the configured window.
    fn averaging_window(
        &self,
        label: &str,
        raw_video: &Path,
        logger: &JobLogger,
    ) -> StepResult<u32> {
        let window = self.settings.frame_window.max(1);
        let tool = &self.tools.ffprobe;
        match ffprobe::source_frame_count(self.runner, logger, tool, raw_video)? {
            Some(0) => Err(StepError::invalid_input(format!(
                "{} mask source {} has no video frames",
                label,
                raw_video.display()
            ))),
            Some(n) if n < u64::from(window) => {
                logger.warn(&format!(
                    "{} mask source has only {} frames; averaging all of them instead of {}",
                    label, n, window
                ));
                Ok(n as u32)
            }
            _ => Ok(window),
        }
    }
}

/// Check that every persisted mask image has the same size, and that the
/// two composited images share a pixel format.
pub fn check_mask_dimensions(images: &MaskImages) -> StepResult<(u32, u32)> {
    let mut expected: Option<(u32, u32)> = None;
    for path in images.persisted() {
        let dims = image::image_dimensions(path)
            .map_err(|e| StepError::invalid_output(format!("{}: {}", path.display(), e)))?;
        match expected {
            None => expected = Some(dims),
            Some(first) if first != dims => {
                return Err(StepError::invalid_output(format!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    dims.0,
                    dims.1,
                    first.0,
                    first.1
                )));
            }
            Some(_) => {}
        }
    }

    let blend = color_type(&images.normalized_alpha)?;
    let border = color_type(&images.border_alpha)?;
    if blend != border {
        return Err(StepError::invalid_output(format!(
            "mask pixel formats differ: {:?} vs {:?}",
            blend, border
        )));
    }

    expected.ok_or_else(|| StepError::invalid_output("no mask images"))
}

fn color_type(path: &Path) -> StepResult<image::ColorType> {
    let decoder = ImageReader::open(path)
        .map_err(|e| StepError::io_error(format!("opening {}", path.display()), e))?
        .with_guessed_format()
        .map_err(|e| StepError::io_error(format!("reading {}", path.display()), e))?
        .into_decoder()
        .map_err(|e| StepError::invalid_output(format!("{}: {}", path.display(), e)))?;
    Ok(decoder.color_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::tools::fake::FakeRunner;
    use std::fs;
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbaImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn builds_all_images_in_order() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("left.mp4");
        fs::write(&raw, b"video").unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("masks", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FakeRunner::new();
        let tools = ToolSettings::default();
        let settings = MaskSettings::default();

        let images = MaskGenerator::new(&runner, &tools, &settings)
            .build_masks(Eye::Left, &raw, &store, &logger)
            .unwrap();

        assert_eq!((images.width, images.height), (64, 64));
        for path in images.persisted() {
            assert!(path.is_file(), "{} missing", path.display());
        }
        assert_eq!(runner.count("ffprobe"), 1);
        assert_eq!(runner.count("ffmpeg"), 1);
        assert_eq!(runner.count("magick"), 4);
        assert_eq!(
            runner.stages(),
            vec![
                "frame count",
                "frame average (left)",
                "normalize (left)",
                "alpha mask (left)",
                "normalized alpha (left)",
                "border alpha (left)",
            ]
        );
    }

    #[test]
    fn missing_raw_video_is_input_error() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("masks", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FakeRunner::new();
        let tools = ToolSettings::default();
        let settings = MaskSettings::default();

        let err = MaskGenerator::new(&runner, &tools, &settings)
            .build_masks(Eye::Right, &dir.path().join("nope.mp4"), &store, &logger)
            .unwrap_err();
        assert!(matches!(err, StepError::FileNotFound { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn failing_stage_stops_the_eye() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("left.mp4");
        fs::write(&raw, b"video").unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("masks", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FakeRunner::new().failing_on("magick");
        let tools = ToolSettings::default();
        let settings = MaskSettings::default();

        let err = MaskGenerator::new(&runner, &tools, &settings)
            .build_masks(Eye::Left, &raw, &store, &logger)
            .unwrap_err();
        assert!(matches!(err, StepError::CommandFailed { .. }));
        assert_eq!(runner.calls().len(), 3);
    }

    fn average_filter(runner: &FakeRunner) -> String {
        let average = runner
            .calls()
            .into_iter()
            .find(|c| c.stage == "frame average (left)")
            .unwrap();
        let vf = average.args.iter().position(|a| a == "-vf").unwrap();
        average.args[vf + 1].clone()
    }

    #[test]
    fn short_source_averages_every_frame() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("left.mp4");
        fs::write(&raw, b"video").unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("masks", dir.path(), LogConfig::default(), None).unwrap();
        let tools = ToolSettings::default();
        let settings = MaskSettings::default();

        let short = FakeRunner::new().with_source_frames(Some(40));
        MaskGenerator::new(&short, &tools, &settings)
            .build_masks(Eye::Left, &raw, &store, &logger)
            .unwrap();
        assert!(average_filter(&short).contains("tmix=frames=40,select=eq(n\\,39)"));

        let unknown = FakeRunner::new().with_source_frames(None);
        MaskGenerator::new(&unknown, &tools, &settings)
            .build_masks(Eye::Left, &raw, &store, &logger)
            .unwrap();
        assert!(average_filter(&unknown).contains("tmix=frames=128,"));
    }

    #[test]
    fn source_without_frames_is_input_error() {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("left.mp4");
        fs::write(&raw, b"video").unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("masks", dir.path(), LogConfig::default(), None).unwrap();
        let runner = FakeRunner::new().with_source_frames(Some(0));
        let tools = ToolSettings::default();
        let settings = MaskSettings::default();

        let err = MaskGenerator::new(&runner, &tools, &settings)
            .build_masks(Eye::Left, &raw, &store, &logger)
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidInput(_)));
        assert_eq!(runner.count("ffmpeg"), 0);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let images = store.mask_images(Eye::Left);
        for path in images.persisted() {
            write_png(path, 32, 32);
        }
        assert_eq!(check_mask_dimensions(&images).unwrap(), (32, 32));

        write_png(&images.border_alpha, 32, 16);
        assert!(matches!(
            check_mask_dimensions(&images),
            Err(StepError::InvalidOutput(_))
        ));
    }
}
