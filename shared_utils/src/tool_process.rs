//! External tool process runner
//!
//! Every encoder call (mogrify, gifsicle, ffmpeg, du) goes through
//! [`run_tool`]. The runner:
//!
//! - logs the full command line before spawning and the outcome afterwards
//! - drains stderr (and stdout, when captured) on helper threads so a chatty
//!   tool can never fill the 64KB pipe buffer and deadlock against us
//! - optionally streams stdout straight into a file (gifsicle writes the GIF
//!   to stdout)
//! - enforces a per-call timeout, killing the child when it expires
//!
//! ```ignore
//! use shared_utils::tool_process::{run_tool, ToolInvocation};
//! use std::time::Duration;
//!
//! let output = run_tool(
//!     &ToolInvocation::new("du")
//!         .arg("-k")
//!         .arg("out.gif")
//!         .timeout(Duration::from_secs(10)),
//! )?;
//! println!("{}", output.stdout);
//! ```

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::logging::log_external_tool;

/// Per-call timeout used when the caller does not configure one.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ═══════════════════════════════════════════════════════════════
// ToolError
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("External tool not found: {tool}")]
    NotFound { tool: String, command: String },

    #[error("Failed to run {tool}: {source}")]
    Io {
        tool: String,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed (exit code: {}): {}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()), format_tool_error(.stderr))]
    Failed {
        tool: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {}s", .timeout.as_secs_f64())]
    TimedOut {
        tool: String,
        command: String,
        timeout: Duration,
        stderr: String,
    },
}

impl ToolError {
    pub fn tool(&self) -> &str {
        match self {
            ToolError::NotFound { tool, .. }
            | ToolError::Io { tool, .. }
            | ToolError::Failed { tool, .. }
            | ToolError::TimedOut { tool, .. } => tool,
        }
    }

    pub fn command(&self) -> &str {
        match self {
            ToolError::NotFound { command, .. }
            | ToolError::Io { command, .. }
            | ToolError::Failed { command, .. }
            | ToolError::TimedOut { command, .. } => command,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Captured diagnostic output of the tool, empty when it never ran.
    pub fn diagnostic(&self) -> &str {
        match self {
            ToolError::Failed { stderr, .. } | ToolError::TimedOut { stderr, .. } => stderr,
            ToolError::NotFound { .. } | ToolError::Io { .. } => "",
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// ToolInvocation
// ═══════════════════════════════════════════════════════════════

/// A fully described external command.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    program: String,
    args: Vec<OsString>,
    stdout_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout_path: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Stream the tool's stdout into `path` (created or truncated).
    pub fn stdout_to_file(mut self, path: impl AsRef<Path>) -> Self {
        self.stdout_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Shell-like rendering for logs, not meant to be executed.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        if let Some(path) = &self.stdout_path {
            line.push_str(" > ");
            line.push_str(&path.to_string_lossy());
        }
        line
    }
}

/// Result of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    /// Empty when stdout was redirected to a file.
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

// ═══════════════════════════════════════════════════════════════
// run_tool
// ═══════════════════════════════════════════════════════════════

/// Run an external tool to completion, blocking the calling thread.
///
/// Non-zero exit, spawn failure and timeout are all reported as
/// [`ToolError`] with the captured stderr attached. On any error the
/// `stdout_to_file` target is removed, so no empty or truncated file is
/// left under the requested name.
pub fn run_tool(invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
    let result = execute(invocation);
    if result.is_err() {
        if let Some(path) = &invocation.stdout_path {
            remove_partial_output(path);
        }
    }
    result
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial tool output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial tool output"),
    }
}

fn execute(invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
    let tool = invocation.program.clone();
    let command_line = invocation.command_line();
    let timeout = invocation.timeout.unwrap_or(DEFAULT_TOOL_TIMEOUT);

    info!(tool = %tool, command = %command_line, "###> Executing external command");

    let io_error = |source: io::Error| ToolError::Io {
        tool: tool.clone(),
        command: command_line.clone(),
        source,
    };

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args).stdin(Stdio::null()).stderr(Stdio::piped());
    match &invocation.stdout_path {
        Some(path) => {
            let file = File::create(path).map_err(io_error)?;
            cmd.stdout(Stdio::from(file));
        }
        None => {
            cmd.stdout(Stdio::piped());
        }
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ToolError::NotFound {
                tool: tool.clone(),
                command: command_line.clone(),
            }
        } else {
            io_error(e)
        }
    })?;

    let stderr_thread = child.stderr.take().map(drain_lines);
    let stdout_thread = child.stdout.take().map(drain_all);

    let status = wait_with_timeout(&mut child, timeout).map_err(io_error)?;
    let duration = start.elapsed();

    let stderr = join_output(stderr_thread);
    let stdout = join_output(stdout_thread);

    let Some(status) = status else {
        log_external_tool(&tool, &command_line, &stderr, None, duration);
        return Err(ToolError::TimedOut {
            tool,
            command: command_line,
            timeout,
            stderr,
        });
    };

    let combined = combine_output(&stdout, &stderr);
    log_external_tool(&tool, &command_line, &combined, status.code(), duration);

    if !status.success() {
        return Err(ToolError::Failed {
            tool,
            command: command_line,
            exit_code: status.code(),
            stderr,
        });
    }

    Ok(ToolOutput {
        exit_code: status.code(),
        stdout,
        stderr,
        duration,
    })
}

/// `Ok(None)` means the child was killed after `timeout`.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                debug!(pid = child.id(), error = %e, "Killing external tool after failed wait");
                let _ = kill_and_reap(child);
                return Err(e);
            }
        }
        if Instant::now() >= deadline {
            debug!(pid = child.id(), "Killing external tool after timeout");
            kill_and_reap(child)?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) -> io::Result<()> {
    // The child may exit between try_wait and kill.
    let _ = child.kill();
    child.wait().map(|_| ())
}

fn drain_lines<R: Read + Send + 'static>(pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            buf.push_str(&line);
            buf.push('\n');
        }
        buf
    })
}

fn drain_all<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle
        .map(|t| t.join().unwrap_or_default())
        .unwrap_or_default()
}

fn combine_output(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (false, false) => format!("STDOUT:\n{}\n\nSTDERR:\n{}", stdout, stderr),
        (false, true) => stdout.to_string(),
        _ => stderr.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════
// Error formatting
// ═══════════════════════════════════════════════════════════════

/// Pick the most meaningful line of a tool's stderr.
///
/// 1. the last line mentioning "error" (any case)
/// 2. otherwise the last non-empty line
/// 3. otherwise "Unknown error"
pub fn format_tool_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.to_ascii_lowercase().contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown error".to_string())
}
