//! The run log: one file per job, optionally echoed to a callback.
//!
//! Tool output goes into a bounded tail so a failing stage can dump the
//! last lines it produced even when tool chatter is otherwise suppressed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineKind, LogCallback, LogConfig, LogLevel, TailBuffer};

/// Mutable state shared by every writer of the log.
struct Sink {
    file: Option<BufWriter<File>>,
    tail: TailBuffer,
}

/// Log of a single run, shared by all steps (and both eyes) through an `Arc`.
pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    config: LogConfig,
    echo: Option<LogCallback>,
    sink: Mutex<Sink>,
}

impl JobLogger {
    /// Creates `<log_dir>/<job_name>.log`, truncating an older log of the same run.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        echo: Option<LogCallback>,
    ) -> io::Result<Self> {
        let job_name = job_name.into();
        fs::create_dir_all(log_dir.as_ref())?;
        let log_path = log_dir.as_ref().join(log_file_name(&job_name));
        let file = File::create(&log_path)?;

        let sink = Sink {
            file: Some(BufWriter::new(file)),
            tail: TailBuffer::new(config.tail_lines),
        };
        Ok(Self {
            job_name,
            log_path,
            config,
            echo,
            sink: Mutex::new(sink),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, LineKind::Plain, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, LineKind::Plain, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, LineKind::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, LineKind::Failure, message);
    }

    /// A tool command line about to run.
    pub fn command(&self, command: &str) {
        self.emit(LogLevel::Info, LineKind::Command, command);
    }

    /// Start of a pipeline step.
    pub fn phase(&self, name: &str) {
        self.emit(LogLevel::Info, LineKind::Stage, name);
    }

    /// Start of a sub-stage inside a step.
    pub fn section(&self, name: &str) {
        self.emit(LogLevel::Info, LineKind::Detail, name);
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, LineKind::Done, message);
    }

    pub fn validation(&self, message: &str) {
        self.emit(LogLevel::Info, LineKind::Check, message);
    }

    /// One line of tool output. Always kept in the tail.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        self.sink.lock().tail.push(line);
        if self.config.quiet_tools {
            return;
        }
        let tagged = if is_stderr {
            format!("[stderr] {line}")
        } else {
            line.to_string()
        };
        self.write_line(&self.stamp(&tagged));
    }

    /// Writes the tail under a header, e.g. after a tool failed.
    pub fn show_tail(&self, header: &str) {
        let lines = self.get_tail();
        if lines.is_empty() {
            return;
        }
        self.write_line(&self.stamp(&format!("[{header}/tail]")));
        for line in &lines {
            self.write_line(&self.stamp(line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.sink.lock().tail.snapshot()
    }

    pub fn clear_tail(&self) {
        self.sink.lock().tail.clear();
    }

    /// Writes a `;`-separated filter graph with one chain per line.
    pub fn log_filter_graph(&self, graph: &str) {
        self.section("filter graph");
        for chain in graph.split(';').filter(|c| !c.is_empty()) {
            self.info(&format!("  {chain}"));
        }
    }

    pub fn flush(&self) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = file.flush();
        }
    }

    /// Flushes and closes the file; later lines only reach the callback.
    pub fn close(&self) {
        if let Some(mut file) = self.sink.lock().file.take() {
            let _ = file.flush();
        }
    }

    fn emit(&self, level: LogLevel, kind: LineKind, text: &str) {
        if level >= self.config.level {
            self.write_line(&self.stamp(&kind.decorate(text)));
        }
    }

    fn stamp(&self, text: &str) -> String {
        if self.config.timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), text)
        } else {
            text.to_string()
        }
    }

    fn write_line(&self, line: &str) {
        if let Some(file) = self.sink.lock().file.as_mut() {
            let _ = writeln!(file, "{line}");
        }
        if let Some(echo) = &self.echo {
            echo(line);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Job name with characters that are unsafe in file names replaced.
fn log_file_name(job_name: &str) -> String {
    let stem: String = job_name
        .chars()
        .map(|c| {
            if c.is_control() || "/\\:*?\"<>|".contains(c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("{stem}.log")
}

/// Fluent construction of a [`JobLogger`].
pub struct JobLoggerBuilder {
    job_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    echo: Option<LogCallback>,
}

impl JobLoggerBuilder {
    pub fn new(job_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_name: job_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            echo: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn callback(mut self, echo: LogCallback) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn build(self) -> io::Result<JobLogger> {
        JobLogger::new(self.job_name, self.log_dir, self.config, self.echo)
    }
}
