//! Run logs and process-wide tracing.
//!
//! Every job writes a human-readable [`JobLogger`] file next to the
//! process-wide `tracing` output set up by [`init_tracing`].
//!
//! ```no_run
//! use vr180_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("take1", "/shoot/logs", LogConfig::default(), None).unwrap();
//! logger.phase("Masks");
//! logger.command("ffmpeg -i left.mp4 ...");
//! logger.success("Masks built");
//! ```

mod job_logger;
mod types;

pub use job_logger::{JobLogger, JobLoggerBuilder};
pub use types::{LineKind, LogCallback, LogConfig, LogLevel};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Installs the global subscriber: stderr always, plus a daily
/// `vr180.log` under `log_dir` when one is given.
///
/// `RUST_LOG` overrides `default_level`. Keep the returned guard alive
/// until exit or buffered file lines are lost. Call once per process.
pub fn init_tracing(default_level: LogLevel, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(default_level).into())
        .from_env_lossy();

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "vr180.log"));
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_onto_filters() {
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
        assert_eq!(LevelFilter::from(LogLevel::Error), LevelFilter::ERROR);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }
}
