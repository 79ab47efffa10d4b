//! Failures of steps and of whole runs, and the exit codes they map to.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Process exit status per failure class.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Bad arguments or unusable inputs.
    pub const USAGE: i32 = 1;
    /// Configuration or log setup failed before any step ran.
    pub const SETUP: i32 = 2;
    /// An external tool or a verification failed.
    pub const STAGE_FAILURE: i32 = 3;
    /// A reuse flag named an artifact that is not on disk.
    pub const MISSING_CACHED_ARTIFACT: i32 = 4;
    /// The calibration cannot be rendered.
    pub const DEGENERATE_CALIBRATION: i32 = 5;
}

/// Why a run ended early.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("run '{job}' stopped in {step}: {source}")]
    StepFailed {
        job: String,
        step: String,
        #[source]
        source: StepError,
    },

    #[error("run '{job}' could not start: {reason}")]
    SetupFailed { job: String, reason: String },
}

impl PipelineError {
    pub fn step_failed(job: impl Into<String>, step: impl Into<String>, source: StepError) -> Self {
        let (job, step) = (job.into(), step.into());
        Self::StepFailed { job, step, source }
    }

    pub fn setup_failed(job: impl Into<String>, reason: impl Into<String>) -> Self {
        let (job, reason) = (job.into(), reason.into());
        Self::SetupFailed { job, reason }
    }

    pub fn step_name(&self) -> Option<&str> {
        if let Self::StepFailed { step, .. } = self {
            Some(step.as_str())
        } else {
            None
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StepFailed { source, .. } => source.exit_code(),
            Self::SetupFailed { .. } => exit_codes::SETUP,
        }
    }
}

/// Failure inside one step.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("required file not found: {path}")]
    FileNotFound { path: String },

    #[error("unusable input: {0}")]
    InvalidInput(String),

    #[error("{tool} exited with {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// Output missing after a tool reported success, or failing verification.
    #[error("bad output: {0}")]
    InvalidOutput(String),

    #[error("{kind} was to be reused but {} does not exist", path.display())]
    MissingCachedArtifact { kind: String, path: PathBuf },

    #[error("degenerate calibration: {0}")]
    DegenerateCalibration(String),

    #[error("could not parse {what}: {message}")]
    ParseError { what: String, message: String },

    #[error("{operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Steps ran out of order.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().display().to_string();
        Self::FileNotFound { path }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn command_failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        let (tool, message) = (tool.into(), message.into());
        Self::CommandFailed { tool, exit_code, message }
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn missing_cached(kind: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let (kind, path) = (kind.into(), path.as_ref().to_path_buf());
        Self::MissingCachedArtifact { kind, path }
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateCalibration(message.into())
    }

    pub fn parse_error(what: impl Into<String>, message: impl Into<String>) -> Self {
        let (what, message) = (what.into(), message.into());
        Self::ParseError { what, message }
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        let operation = operation.into();
        Self::IoError { operation, source }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        use exit_codes::*;
        match self {
            Self::FileNotFound { .. } | Self::InvalidInput(_) => USAGE,
            Self::MissingCachedArtifact { .. } => MISSING_CACHED_ARTIFACT,
            Self::DegenerateCalibration(_) => DEGENERATE_CALIBRATION,
            Self::CommandFailed { .. }
            | Self::InvalidOutput(_)
            | Self::ParseError { .. }
            | Self::IoError { .. }
            | Self::PreconditionFailed(_)
            | Self::Other(_) => STAGE_FAILURE,
        }
    }
}

pub type StepResult<T> = Result<T, StepError>;

pub type PipelineResult<T> = Result<T, PipelineError>;
