//! The calibration chain: stills, project generation, point detection,
//! cleaning, line detection and optimisation.

use std::path::{Path, PathBuf};

use super::model::{validate_control_points, validate_orientation, CalibrationModel, CalibrationSource};
use crate::artifacts::{ArtifactKind, ArtifactStore, ProjectStage};
use crate::config::{CalibrationSettings, ToolSettings};
use crate::logging::JobLogger;
use crate::models::Eye;
use crate::orchestrator::{for_each_eye, StepResult};
use crate::tools::{ffmpeg, hugin, ToolInvocation, ToolRunner};

/// Runs the calibration tools for one stereo pair.
pub struct CalibrationEngine<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a ToolSettings,
    settings: &'a CalibrationSettings,
}

impl<'a> CalibrationEngine<'a> {
    pub fn new(
        runner: &'a dyn ToolRunner,
        tools: &'a ToolSettings,
        settings: &'a CalibrationSettings,
    ) -> Self {
        Self {
            runner,
            tools,
            settings,
        }
    }

    /// Calibrate the pair and make the optimised project current.
    ///
    /// Each stage writes a new project file next to the prefix, so a
    /// failing stage leaves the previous one on disk.
    pub fn calibrate(
        &self,
        left_source: &Path,
        right_source: &Path,
        input_fov: f64,
        store: &ArtifactStore,
        logger: &JobLogger,
    ) -> StepResult<CalibrationModel> {
        let [left_still, right_still] = self.extract_stills(left_source, right_source, store, logger)?;

        let project = |stage| store.path(ArtifactKind::Project(stage));
        let chain: [ToolInvocation; 5] = [
            hugin::generate_project(
                &self.tools.pto_gen,
                &left_still,
                &right_still,
                input_fov,
                self.settings.lens_projection,
                &project(ProjectStage::Initial),
            ),
            hugin::find_control_points(
                &self.tools.cpfind,
                &project(ProjectStage::Initial),
                &project(ProjectStage::WithPoints),
            ),
            hugin::clean_control_points(
                &self.tools.cpclean,
                &project(ProjectStage::WithPoints),
                &project(ProjectStage::Cleaned),
            ),
            hugin::find_lines(
                &self.tools.linefind,
                &project(ProjectStage::Cleaned),
                &project(ProjectStage::WithLines),
            ),
            hugin::optimise(
                &self.tools.autooptimiser,
                &project(ProjectStage::WithLines),
                &project(ProjectStage::Optimized),
            ),
        ];

        for invocation in &chain {
            logger.section(&invocation.stage);
            self.runner.run(invocation, logger)?;
        }

        let model = CalibrationModel::load(project(ProjectStage::Optimized), CalibrationSource::Computed)?;
        logger.info(&format!(
            "Optimised project has {} control points and {} line points",
            model.project.point_pair_count(),
            model.project.line_point_count()
        ));

        validate_control_points(&model.project, self.settings.min_control_points)?;
        for eye in Eye::BOTH {
            let index = eye.image_index();
            let angles = model.project.orientation(index)?;
            validate_orientation(
                &format!("image {}", index),
                &angles,
                self.settings.max_tilt_degrees,
            )?;
        }

        store.set_current(&model.path)?;
        Ok(model)
    }

    fn extract_stills(
        &self,
        left_source: &Path,
        right_source: &Path,
        store: &ArtifactStore,
        logger: &JobLogger,
    ) -> StepResult<[PathBuf; 2]> {
        logger.section("Calibration stills");
        for_each_eye(self.settings.parallel_eyes, |eye| {
            let source = match eye {
                Eye::Left => left_source,
                Eye::Right => right_source,
            };
            let still = store.path(ArtifactKind::CalibrationStill(eye));
            self.runner.run(
                &ffmpeg::extract_still(
                    &self.tools.ffmpeg,
                    eye.as_str(),
                    source,
                    self.settings.still_offset_secs,
                    self.settings.still_width,
                    &still,
                ),
                logger,
            )?;
            Ok(still)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::Orientation;
    use crate::orchestrator::StepError;
    use crate::tools::fake::{sample_project, FakeRunner};
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: ArtifactStore,
        logger: JobLogger,
        tools: ToolSettings,
        settings: CalibrationSettings,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("take1"));
        let logger = JobLogger::new("calib", dir.path(), LogConfig::default(), None).unwrap();
        Fixture {
            _dir: dir,
            store,
            logger,
            tools: ToolSettings::default(),
            settings: CalibrationSettings::default(),
        }
    }

    #[test]
    fn chain_runs_in_order_and_sets_current() {
        let f = fixture();
        let runner = FakeRunner::new();
        let model = CalibrationEngine::new(&runner, &f.tools, &f.settings)
            .calibrate(Path::new("l.mp4"), Path::new("r.mp4"), 202.0, &f.store, &f.logger)
            .unwrap();

        let programs: Vec<String> = runner.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(
            &programs[2..],
            &["pto_gen", "cpfind", "cpclean", "linefind", "autooptimiser"]
        );
        assert_eq!(runner.count("ffmpeg"), 2);
        assert_eq!(model.source, CalibrationSource::Computed);
        assert_eq!(
            f.store.read_current().unwrap(),
            Some(f.store.path(ArtifactKind::Project(ProjectStage::Optimized)))
        );
        for stage in ProjectStage::CHAIN {
            assert!(f.store.exists(ArtifactKind::Project(stage)));
        }
    }

    #[test]
    fn too_few_points_reject_model() {
        let f = fixture();
        let runner = FakeRunner::new().with_project(sample_project(
            Orientation::default(),
            Orientation::default(),
            1,
        ));
        let err = CalibrationEngine::new(&runner, &f.tools, &f.settings)
            .calibrate(Path::new("l.mp4"), Path::new("r.mp4"), 202.0, &f.store, &f.logger)
            .unwrap_err();

        assert!(matches!(err, StepError::DegenerateCalibration(_)));
        assert!(f.store.read_current().unwrap().is_none());
    }

    #[test]
    fn diverged_angles_reject_model() {
        let f = fixture();
        let runner = FakeRunner::new().with_project(sample_project(
            Orientation::new(0.0, f64::NAN, 0.0),
            Orientation::default(),
            20,
        ));
        let err = CalibrationEngine::new(&runner, &f.tools, &f.settings)
            .calibrate(Path::new("l.mp4"), Path::new("r.mp4"), 202.0, &f.store, &f.logger)
            .unwrap_err();
        assert!(matches!(err, StepError::DegenerateCalibration(_)));
    }

    #[test]
    fn failing_stage_stops_chain() {
        let f = fixture();
        let runner = FakeRunner::new().failing_on("cpclean");
        let err = CalibrationEngine::new(&runner, &f.tools, &f.settings)
            .calibrate(Path::new("l.mp4"), Path::new("r.mp4"), 202.0, &f.store, &f.logger)
            .unwrap_err();

        assert!(matches!(err, StepError::CommandFailed { .. }));
        assert_eq!(runner.count("linefind"), 0);
        assert!(f.store.exists(ArtifactKind::Project(ProjectStage::WithPoints)));
    }
}
