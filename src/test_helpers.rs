//! Shared fakes for unit tests.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::context::Context;
use crate::error::ToolError;
use crate::exec::{ExecResult, Executor};
use crate::logging::Logger;
use crate::platform::{Os, Platform};

/// Canned outcome of one fake invocation.
#[derive(Debug, Clone)]
enum Response {
    Exit(ExecResult),
    TimedOut,
}

/// Scriptable [`Executor`] for unit tests.
///
/// Programs are "installed" with [`with_tool`](Self::with_tool) or by
/// queueing a response.  Queued responses are consumed in order and the
/// last one repeats.  An installed program with no queued response exits
/// successfully with empty output; anything else is
/// [`ToolError::NotFound`].
///
/// Every invocation is recorded, together with the contents of any argument
/// that named an existing file at call time.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    installed: HashSet<String>,
    responses: Mutex<HashMap<String, VecDeque<Response>>>,
    calls: Mutex<Vec<Vec<String>>>,
    file_args: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `program` as present on `PATH`.
    pub fn with_tool(mut self, program: &str) -> Self {
        self.installed.insert(program.to_string());
        self
    }

    /// Queue a response with the given exit status and stdout.
    pub fn with_response(self, program: &str, success: bool, stdout: &str) -> Self {
        self.with_output(program, success, stdout, "")
    }

    /// Queue a response with explicit stdout and stderr.
    pub fn with_output(mut self, program: &str, success: bool, stdout: &str, stderr: &str) -> Self {
        self.installed.insert(program.to_string());
        self.push(
            program,
            Response::Exit(ExecResult {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                success,
                code: Some(i32::from(!success)),
            }),
        );
        self
    }

    /// Queue a timeout for `program`.
    pub fn with_timeout(mut self, program: &str) -> Self {
        self.installed.insert(program.to_string());
        self.push(program, Response::TimedOut);
        self
    }

    fn push(&self, program: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every recorded invocation as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded invocations.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Invocations of `program`, as argument lists.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c[0] == program)
            .map(|c| c[1..].to_vec())
            .collect()
    }

    /// `(path, contents)` of each argument that named an existing file.
    pub fn file_args(&self) -> Vec<(PathBuf, String)> {
        self.file_args.lock().unwrap().clone()
    }

    fn next_response(&self, program: &str) -> Option<Response> {
        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(program)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn record(&self, program: &str, args: &[&str]) {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| (*a).to_string()));
        self.calls.lock().unwrap().push(call);
        for arg in args {
            let path = Path::new(arg);
            if path.is_file()
                && let Ok(contents) = std::fs::read_to_string(path)
            {
                self.file_args
                    .lock()
                    .unwrap()
                    .push((path.to_path_buf(), contents));
            }
        }
    }
}

impl Executor for FakeExecutor {
    fn which(&self, program: &str) -> bool {
        self.installed.contains(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult, ToolError> {
        self.run_with_timeout(program, args, None)
    }

    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<ExecResult, ToolError> {
        self.record(program, args);
        match self.next_response(program) {
            Some(Response::Exit(result)) => Ok(result),
            Some(Response::TimedOut) => Err(ToolError::TimedOut {
                program: program.to_string(),
                secs: timeout.map_or(0, |t| t.as_secs()),
            }),
            None if self.installed.contains(program) => Ok(ExecResult {
                stdout: String::new(),
                stderr: String::new(),
                success: true,
                code: Some(0),
            }),
            None => Err(ToolError::NotFound {
                program: program.to_string(),
            }),
        }
    }
}

/// A [`Context`] over a fresh temporary home directory.
#[derive(Debug)]
pub struct TestEnv {
    /// Temporary home directory (deleted on drop).
    pub home: tempfile::TempDir,
    /// The fake executor the context uses.
    pub executor: Arc<FakeExecutor>,
    /// Logger collecting recorded steps.
    pub log: Arc<Logger>,
    /// Context pointing at `home`, on macOS, sequential.
    pub ctx: Context,
}

impl TestEnv {
    pub fn new(executor: FakeExecutor) -> Self {
        Self::with_config(executor, Config::default())
    }

    pub fn with_config(executor: FakeExecutor, config: Config) -> Self {
        let home = tempfile::tempdir().expect("create temp home");
        let executor = Arc::new(executor);
        let log = Arc::new(Logger::with_log_file(None));
        let ctx = Context {
            config: Arc::new(config),
            platform: Arc::new(Platform::new(Os::MacOs)),
            log: Arc::clone(&log) as Arc<dyn crate::logging::Log>,
            home: home.path().to_path_buf(),
            executor: Arc::clone(&executor) as Arc<dyn Executor>,
            parallel: false,
        };
        Self {
            home,
            executor,
            log,
            ctx,
        }
    }

    /// Path beneath the temporary home.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.home.path().join(rel)
    }

    /// Write `contents` to `rel` under the home directory, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }
}
