//! External program execution behind an injectable [`Executor`] seam.
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::error::ToolError;

/// Interval between child-process status polls when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not terminated by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl ExecResult {
    /// Convert an unsuccessful result into [`ToolError::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Failed`] if the process exited non-zero.
    pub fn check(self, program: &str) -> Result<Self, ToolError> {
        if self.success {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                program: program.to_string(),
                code: self.code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Capability interface over external programs.
///
/// Probes and restore operations depend on this trait rather than on
/// [`std::process::Command`] so that tests can substitute fakes.  Only
/// [`which`](Self::which) and [`run_unchecked`](Self::run_unchecked) are
/// required; the checked and timed variants build on them.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;

    /// Run a command, allowing failure (returns the result without checking
    /// the exit status).
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult, ToolError>;

    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult, ToolError> {
        self.run_unchecked(program, args)?.check(program)
    }

    /// Run a command with an optional deadline, allowing failure.
    ///
    /// The default implementation ignores the timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or does not finish
    /// before the deadline.
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, ToolError> {
        let _ = timeout;
        self.run_unchecked(program, args)
    }
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult, ToolError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| spawn_error(program, source))?;
        Ok(ExecResult::from(output))
    }

    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, ToolError> {
        let Some(timeout) = timeout else {
            return self.run_unchecked(program, args);
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| spawn_error(program, source))?;

        // Drain both pipes on helper threads so a chatty child cannot block
        // on a full pipe while we poll for exit.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || read_pipe(stdout));
        let stderr_reader = std::thread::spawn(move || read_pipe(stderr));

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(ToolError::TimedOut {
                        program: program.to_string(),
                        secs: timeout.as_secs(),
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    return Err(ToolError::Io {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        };

        Ok(ExecResult {
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
            success: status.success(),
            code: status.code(),
        })
    }
}

fn spawn_error(program: &str, source: std::io::Error) -> ToolError {
    if source.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotFound {
            program: program.to_string(),
        }
    } else {
        ToolError::Io {
            program: program.to_string(),
            source,
        }
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).ok();
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// First non-empty trimmed line of a command's stdout, falling back to stderr.
///
/// Many `--version` commands (notably `java -version`) print to stderr.
#[must_use]
pub fn first_output_line(result: &ExecResult) -> Option<String> {
    [&result.stdout, &result.stderr]
        .into_iter()
        .flat_map(|s| s.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_echo() {
        let result = SystemExecutor.run("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failure_is_tool_failed() {
        let err = SystemExecutor.run("false", &[]).unwrap_err();
        assert!(
            matches!(err, ToolError::Failed { .. }),
            "non-zero exit should produce ToolError::Failed, got {err:?}"
        );
    }

    #[test]
    fn run_unchecked_failure() {
        let result = SystemExecutor.run_unchecked("false", &[]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = SystemExecutor
            .run_unchecked("this-program-does-not-exist-12345", &[])
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn which_finds_known_program() {
        assert!(SystemExecutor.which("sh"), "sh should be found on Unix");
    }

    #[test]
    fn which_missing_program() {
        assert!(
            !SystemExecutor.which("this-program-does-not-exist-12345"),
            "non-existent program should not be found"
        );
    }

    #[test]
    fn run_with_timeout_collects_output() {
        let result = SystemExecutor
            .run_with_timeout("echo", &["timed"], Some(Duration::from_secs(10)))
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "timed");
    }

    #[test]
    fn run_with_timeout_kills_slow_child() {
        let err = SystemExecutor
            .run_with_timeout("sleep", &["5"], Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }), "got {err:?}");
    }

    #[test]
    fn check_maps_exit_code_and_stderr() {
        let result = ExecResult {
            stdout: String::new(),
            stderr: "  bad things  \n".to_string(),
            success: false,
            code: Some(3),
        };
        let err = result.check("brew").unwrap_err();
        assert_eq!(err.to_string(), "brew failed (exit 3): bad things");
    }

    #[test]
    fn first_output_line_prefers_stdout() {
        let result = ExecResult {
            stdout: "\ngit version 2.44.0\nextra\n".to_string(),
            stderr: "ignored".to_string(),
            success: true,
            code: Some(0),
        };
        assert_eq!(
            first_output_line(&result).as_deref(),
            Some("git version 2.44.0")
        );
    }

    #[test]
    fn first_output_line_falls_back_to_stderr() {
        let result = ExecResult {
            stdout: "   \n".to_string(),
            stderr: "openjdk version \"21\"\n".to_string(),
            success: true,
            code: Some(0),
        };
        assert_eq!(
            first_output_line(&result).as_deref(),
            Some("openjdk version \"21\"")
        );
    }
}
