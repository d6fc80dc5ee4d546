// Shared helpers for integration tests.
//
// Provides a temporary home directory, a scripted executor standing in for
// `mas`, `brew` and friends, and a context wired to both, so each
// integration test can run a full backup or restore in isolation.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use macbac::config::Config;
use macbac::context::Context;
use macbac::error::ToolError;
use macbac::exec::{ExecResult, Executor};
use macbac::logging::{Log, Logger};
use macbac::platform::{Os, Platform};

/// [`Executor`] that answers each program with one canned result.
///
/// Programs without a script are not installed.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    scripts: HashMap<String, ExecResult>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `program`, answering every invocation with `stdout`.
    pub fn with(mut self, program: &str, success: bool, stdout: &str) -> Self {
        self.scripts.insert(
            program.to_string(),
            ExecResult {
                stdout: stdout.to_string(),
                stderr: if success { String::new() } else { format!("{program} failed") },
                success,
                code: Some(i32::from(!success)),
            },
        );
        self
    }

    /// Every invocation as a single `program arg…` string.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Executor for ScriptedExecutor {
    fn which(&self, program: &str) -> bool {
        self.scripts.contains_key(program)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult, ToolError> {
        let mut call = vec![program];
        call.extend_from_slice(args);
        self.calls.lock().expect("calls lock").push(call.join(" "));
        self.scripts
            .get(program)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                program: program.to_string(),
            })
    }
}

/// An isolated home directory plus a context pointing at it.
pub struct IntegrationTestContext {
    /// Temporary home directory.
    pub home: tempfile::TempDir,
    /// Logger shared with the context.
    pub log: Arc<Logger>,
    /// Executor shared with the context.
    pub executor: Arc<ScriptedExecutor>,
    /// Context on macOS over `home`.
    pub ctx: Context,
}

impl IntegrationTestContext {
    /// Create a context with default configuration, except that only
    /// `~/Applications` is scanned for apps.
    pub fn new(executor: ScriptedExecutor, parallel: bool) -> Self {
        let mut config = Config::default();
        config.applications.directories = vec!["~/Applications".to_string()];
        Self::with_config(executor, config, parallel)
    }

    pub fn with_config(executor: ScriptedExecutor, config: Config, parallel: bool) -> Self {
        let home = tempfile::tempdir().expect("create temp home");
        let log = Arc::new(Logger::new("integration"));
        let executor = Arc::new(executor);
        let ctx = Context {
            config: Arc::new(config),
            platform: Arc::new(Platform::new(Os::MacOs)),
            log: Arc::clone(&log) as Arc<dyn Log>,
            home: home.path().to_path_buf(),
            executor: Arc::clone(&executor) as Arc<dyn Executor>,
            parallel,
        };
        Self {
            home,
            log,
            executor,
            ctx,
        }
    }

    /// Path beneath the temporary home.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.home.path().join(rel)
    }

    /// Write `contents` to `rel` beneath the home, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        write_file(&path, contents);
        path
    }
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, contents).expect("write file");
}

/// Executor for a typical Mac with `mas`, `brew` and `git` installed.
pub fn typical_mac() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .with("sw_vers", true, "14.4.1\n")
        .with("mas", true, "497799835 Xcode\n409183694 Keynote\n")
        .with("brew", true, "tap \"homebrew/bundle\"\nbrew \"git\"\ncask \"firefox\"\n")
        .with("git", true, "git version 2.44.0\n")
}
