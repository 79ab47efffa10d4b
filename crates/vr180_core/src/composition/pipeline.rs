//! Render execution and output verification.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::graph::{blend_mask_input, border_input, build_filter_graph, video_input};
use super::request::CompositionRequest;
use crate::artifacts::ArtifactStore;
use crate::config::ToolSettings;
use crate::logging::JobLogger;
use crate::models::{Eye, VideoSource};
use crate::orchestrator::{StepError, StepResult};
use crate::tools::ffmpeg::{self, InputSpec};
use crate::tools::ffprobe::{self, StreamSummary};
use crate::tools::ToolRunner;

/// Probe results of a rendered file against what was asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderVerification {
    /// Shorter of the two eye sources, in seconds.
    pub source_duration: f64,
    pub expected_frames: u64,
    pub stream: StreamSummary,
}

/// Result of one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeOutput {
    pub output_path: PathBuf,
    pub filter_graph: String,
    pub command: String,
    /// ffconcat lists written for segmented sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concat_lists: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<RenderVerification>,
}

/// Projects, blends and stacks both eyes into one frame-packed file.
pub struct CompositionPipeline<'a> {
    runner: &'a dyn ToolRunner,
    tools: &'a ToolSettings,
    show_filter_graph: bool,
}

impl<'a> CompositionPipeline<'a> {
    pub fn new(runner: &'a dyn ToolRunner, tools: &'a ToolSettings) -> Self {
        Self {
            runner,
            tools,
            show_filter_graph: false,
        }
    }

    /// Log the filter graph one chain per line before rendering.
    pub fn with_filter_graph_logging(mut self, enabled: bool) -> Self {
        self.show_filter_graph = enabled;
        self
    }

    pub fn compose(
        &self,
        request: CompositionRequest,
        store: &ArtifactStore,
        logger: &JobLogger,
    ) -> StepResult<ComposeOutput> {
        let mut inputs = vec![InputSpec::File(PathBuf::new()); 6];
        let mut concat_lists = Vec::new();

        for eye in Eye::BOTH {
            let stream = request.stream(eye);
            inputs[video_input(eye)] = match &stream.source {
                VideoSource::Single(path) => InputSpec::File(path.clone()),
                VideoSource::Concat(segments) => {
                    let list = store
                        .write_concat_list(eye, segments.iter().map(PathBuf::as_path))?;
                    logger.info(&format!(
                        "{} eye: {} segments listed in {}",
                        eye,
                        segments.len(),
                        list.display()
                    ));
                    concat_lists.push(list.clone());
                    InputSpec::ConcatList(list)
                }
            };
            let masks = request.masks.get(eye);
            inputs[blend_mask_input(eye)] = InputSpec::File(masks.normalized_alpha.clone());
            inputs[border_input(eye)] = InputSpec::File(masks.border_alpha.clone());
        }

        let graph = build_filter_graph(&request);
        let rendered_graph = graph.render();
        if self.show_filter_graph {
            logger.log_filter_graph(&rendered_graph);
        }

        let invocation = ffmpeg::render(
            &self.tools.ffmpeg,
            &inputs,
            &rendered_graph,
            graph.output_label,
            &request.encode,
            request.render.output_fps,
            &request.output,
        );
        self.runner.run(&invocation, logger)?;

        let verification = match request.render.frame_tolerance {
            Some(tolerance) => Some(self.verify(&request, tolerance, logger)?),
            None => None,
        };

        Ok(ComposeOutput {
            output_path: request.output,
            filter_graph: rendered_graph,
            command: invocation.command_line(),
            concat_lists,
            verification,
        })
    }

    /// Probe the rendered file and compare it with the request.
    fn verify(
        &self,
        request: &CompositionRequest,
        tolerance: u64,
        logger: &JobLogger,
    ) -> StepResult<RenderVerification> {
        let mut durations = Vec::with_capacity(2);
        for eye in Eye::BOTH {
            durations.push(ffprobe::probe_source_duration(
                self.runner,
                logger,
                &self.tools.ffprobe,
                &request.stream(eye).source,
            )?);
        }
        let source_duration = durations.into_iter().fold(f64::INFINITY, f64::min);
        let expected_frames = ffprobe::expected_frame_count(
            source_duration,
            request.render.pts_multiplier,
            request.render.output_fps,
        );

        let stream = ffprobe::probe_stream(self.runner, logger, &self.tools.ffprobe, &request.output)?;
        logger.validation(&format!(
            "{} frames ({} expected), {} {}",
            stream.frames, expected_frames, stream.pix_fmt, stream.profile
        ));

        if stream.frames.abs_diff(expected_frames) > tolerance {
            return Err(StepError::invalid_output(format!(
                "rendered {} frames, expected {} ±{}",
                stream.frames, expected_frames, tolerance
            )));
        }
        if stream.pix_fmt != request.encode.pix_fmt {
            return Err(StepError::invalid_output(format!(
                "rendered pixel format {}, expected {}",
                stream.pix_fmt, request.encode.pix_fmt
            )));
        }
        if !stream.profile.is_empty() && !stream.profile.eq_ignore_ascii_case(&request.encode.profile) {
            return Err(StepError::invalid_output(format!(
                "rendered profile {}, expected {}",
                stream.profile, request.encode.profile
            )));
        }

        Ok(RenderVerification {
            source_duration,
            expected_frames,
            stream,
        })
    }
}
