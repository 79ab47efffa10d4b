//! Tool invocations and the runner that executes them.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::logging::JobLogger;
use crate::orchestrator::{StepError, StepResult};

/// A fully built external command and the files it must produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Human-readable stage name used in logs.
    pub stage: String,
    /// Executable name or path.
    pub program: String,
    pub args: Vec<String>,
    /// Files that must exist once the command succeeds.
    pub outputs: Vec<PathBuf>,
}

impl ToolInvocation {
    pub fn new(stage: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            program: program.into(),
            args: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path(self, path: &Path) -> Self {
        let rendered = path.display().to_string();
        self.arg(rendered)
    }

    /// Append an output path argument and declare it as produced.
    pub fn output(mut self, path: &Path) -> Self {
        self.outputs.push(path.to_path_buf());
        self.path(path)
    }

    /// Declare a produced file without adding it to the arguments.
    pub fn produces(mut self, path: &Path) -> Self {
        self.outputs.push(path.to_path_buf());
        self
    }

    /// Short tool name for error messages (`/usr/bin/ffmpeg` -> `ffmpeg`).
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_for_log)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_for_log(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | ';' | '(' | ')' | '[' | ']'));
    if needs_quotes {
        format!("\"{}\"", token.replace('"', "\\\""))
    } else {
        token.to_string()
    }
}

/// Lines of stderr kept for [`ToolOutput::stderr`] and failure messages.
const STDERR_KEEP: usize = 50;

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: i32,
    /// Everything the tool printed on stdout.
    pub stdout: String,
    /// The last lines of stderr, newline-joined.
    pub stderr: String,
}

/// Executes tool invocations.
///
/// Implementations block until the command finishes. A non-zero exit or a
/// missing declared output is an error; nothing is retried.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: &ToolInvocation, logger: &JobLogger) -> StepResult<ToolOutput>;
}

/// Runs invocations as child processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation, logger: &JobLogger) -> StepResult<ToolOutput> {
        let tool = invocation.tool_name();
        logger.command(&invocation.command_line());
        tracing::debug!(stage = %invocation.stage, "Running {}", tool);

        for output in &invocation.outputs {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| StepError::io_error("creating output directory", e))?;
            }
        }

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StepError::io_error(format!("executing {}", tool), e))?;
        let child_out = child.stdout.take();
        let child_err = child.stderr.take();

        // Lines reach the job log while the tool is still running
        let (stdout, stderr) = thread::scope(|scope| {
            let err_reader = scope.spawn(|| {
                let mut kept = VecDeque::with_capacity(STDERR_KEEP);
                if let Some(pipe) = child_err {
                    for_each_line(pipe, |line| {
                        logger.output_line(line, true);
                        if kept.len() == STDERR_KEEP {
                            kept.pop_front();
                        }
                        kept.push_back(line.to_string());
                    })?;
                }
                Ok::<_, io::Error>(Vec::from(kept).join("\n"))
            });

            let mut stdout = String::new();
            let read_out = match child_out {
                Some(pipe) => for_each_line(pipe, |line| {
                    logger.output_line(line, false);
                    stdout.push_str(line);
                    stdout.push('\n');
                }),
                None => Ok(()),
            };
            let stderr = err_reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "stderr reader panicked")));
            (read_out.map(|()| stdout), stderr)
        });
        let status = child
            .wait()
            .map_err(|e| StepError::io_error(format!("waiting for {}", tool), e))?;
        let read_error = |e| StepError::io_error(format!("reading {} output", tool), e);
        let stdout = stdout.map_err(read_error)?;
        let stderr = stderr.map_err(read_error)?;
        // Killed by a signal has no code
        let exit_code = status.code().unwrap_or(-1);

        if !status.success() {
            logger.show_tail(&format!("{} output", tool));
            return Err(StepError::command_failed(
                tool,
                exit_code,
                format!("{}: {}", invocation.stage, last_lines(&stderr, 5)),
            ));
        }

        for output in &invocation.outputs {
            let produced = fs::metadata(output)
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false);
            if !produced {
                logger.show_tail(&format!("{} output", tool));
                return Err(StepError::invalid_output(format!(
                    "{} did not produce {}",
                    invocation.stage,
                    output.display()
                )));
            }
        }

        Ok(ToolOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Feeds `emit` every non-empty line of `pipe`, splitting on `\n` and `\r`
/// so carriage-return progress updates arrive one at a time.
fn for_each_line(pipe: impl Read, mut emit: impl FnMut(&str)) -> io::Result<()> {
    let mut reader = BufReader::new(pipe);
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                flush_line(&mut pending, &mut emit);
            } else {
                pending.push(byte);
            }
        }
        reader.consume(consumed);
    }
    flush_line(&mut pending, &mut emit);
    Ok(())
}

fn flush_line(pending: &mut Vec<u8>, emit: &mut impl FnMut(&str)) {
    if !pending.is_empty() {
        emit(&String::from_utf8_lossy(pending));
        pending.clear();
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use tempfile::tempdir;

    #[test]
    fn builder_collects_args_and_outputs() {
        let inv = ToolInvocation::new("still (left)", "/usr/bin/ffmpeg")
            .args(["-y", "-i"])
            .path(Path::new("/in/left.mp4"))
            .output(Path::new("/out/left still.jpg"));

        assert_eq!(inv.tool_name(), "ffmpeg");
        assert_eq!(inv.args.len(), 4);
        assert_eq!(inv.outputs, vec![PathBuf::from("/out/left still.jpg")]);
        assert_eq!(
            inv.command_line(),
            "/usr/bin/ffmpeg -y -i /in/left.mp4 \"/out/left still.jpg\""
        );
    }

    #[test]
    fn last_lines_keeps_tail() {
        assert_eq!(last_lines("a\nb\n\nc\nd", 2), "c | d");
        assert_eq!(last_lines("", 3), "");
    }

    #[test]
    fn carriage_returns_split_lines() {
        let mut seen = Vec::new();
        let text = b"frame=1\rframe=2\r\nDone\n\nlast";
        for_each_line(&text[..], |l| seen.push(l.to_string())).unwrap();
        assert_eq!(seen, vec!["frame=1", "frame=2", "Done", "last"]);
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_streams_both_pipes() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("runner", dir.path(), LogConfig::default(), None).unwrap();

        let inv = ToolInvocation::new("chatty stage", "sh")
            .args(["-c", "printf 'frame=1\\rframe=2\\n' >&2; echo '{\"ok\": 1}'"]);
        let output = ProcessRunner::new().run(&inv, &logger).unwrap();

        assert_eq!(output.stdout, "{\"ok\": 1}\n");
        assert_eq!(output.stderr, "frame=1\nframe=2");
        let tail = logger.get_tail();
        assert!(tail.contains(&"frame=2".to_string()));
        assert!(tail.contains(&"{\"ok\": 1}".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_reports_failure() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("runner", dir.path(), LogConfig::default(), None).unwrap();

        let inv = ToolInvocation::new("failing stage", "sh").args(["-c", "echo boom >&2; exit 3"]);
        let err = ProcessRunner::new().run(&inv, &logger).unwrap_err();

        match err {
            StepError::CommandFailed {
                tool,
                exit_code,
                message,
            } => {
                assert_eq!(tool, "sh");
                assert_eq!(exit_code, 3);
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(logger.get_tail(), vec!["boom".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn process_runner_checks_declared_outputs() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("runner", dir.path(), LogConfig::default(), None).unwrap();
        let missing = dir.path().join("never.png");

        let inv = ToolInvocation::new("silent stage", "true").produces(&missing);
        let err = ProcessRunner::new().run(&inv, &logger).unwrap_err();
        assert!(matches!(err, StepError::InvalidOutput(_)));

        let made = dir.path().join("made.txt");
        let inv = ToolInvocation::new("writing stage", "sh")
            .arg("-c")
            .arg(format!("echo ok > '{}'", made.display()))
            .produces(&made);
        let output = ProcessRunner::new().run(&inv, &logger).unwrap();
        assert_eq!(output.exit_code, 0);
    }
}
