//! Levels, run-log configuration and the small buffers behind the run log.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::LoggingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// How a run log behaves.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Tool stdout/stderr only lands in the tail, not in the log.
    pub quiet_tools: bool,
    /// Tool output lines kept for failure reports.
    pub tail_lines: usize,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl LogConfig {
    /// Everything, including tool chatter.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            quiet_tools: false,
            tail_lines: 50,
            timestamps: true,
        }
    }

    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            quiet_tools: settings.compact,
            tail_lines: settings.error_tail as usize,
            timestamps: true,
        }
    }
}

/// Receives every line written to the run log.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Decoration applied to a run-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Plain,
    Command,
    Stage,
    Detail,
    Check,
    Done,
    Warning,
    Failure,
}

impl LineKind {
    pub fn decorate(self, text: &str) -> String {
        match self {
            LineKind::Plain => text.to_string(),
            LineKind::Command => format!("$ {text}"),
            LineKind::Stage => format!("=== {text} ==="),
            LineKind::Detail => format!("--- {text} ---"),
            LineKind::Check => format!("[check] {text}"),
            LineKind::Done => format!("[ok] {text}"),
            LineKind::Warning => format!("[warn] {text}"),
            LineKind::Failure => format!("[fail] {text}"),
        }
    }
}

/// Bounded window over the most recent tool output.
#[derive(Debug)]
pub(crate) struct TailBuffer {
    capacity: usize,
    lines: VecDeque<String>,
}

impl TailBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_owned());
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}
