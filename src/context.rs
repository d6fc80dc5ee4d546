use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::{Config, expand_home};
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::Platform;

/// Shared context for probes and restore operations.
pub struct Context {
    /// Loaded configuration (defaults when no file exists).
    pub config: Arc<Config>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and step recording.
    pub log: Arc<dyn Log>,
    /// User's home directory path; `~/` in configured paths expands here.
    pub home: PathBuf,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Whether to run probes in parallel using Rayon.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("home", &self.home)
            .field("executor", &self.executor)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl Context {
    /// Creates a new context rooted at `$HOME`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HOME environment variable is not set.
    pub fn new(
        config: Arc<Config>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        parallel: bool,
    ) -> Result<Self> {
        let home = home_dir()?;
        Ok(Self {
            config,
            platform,
            log,
            home,
            executor,
            parallel,
        })
    }

    /// Expand a configured path against [`home`](Self::home).
    #[must_use]
    pub fn expand(&self, raw: &str) -> PathBuf {
        expand_home(raw, &self.home)
    }

    /// Directories scanned for fonts.
    #[must_use]
    pub fn font_dirs(&self) -> Vec<PathBuf> {
        self.config
            .fonts
            .directories
            .iter()
            .map(|d| self.expand(d))
            .collect()
    }

    /// Directories scanned for `.app` bundles.
    #[must_use]
    pub fn app_dirs(&self) -> Vec<PathBuf> {
        self.config
            .applications
            .directories
            .iter()
            .map(|d| self.expand(d))
            .collect()
    }

    /// Directory fonts are restored into.
    #[must_use]
    pub fn restore_fonts_dir(&self) -> PathBuf {
        self.expand(&self.config.restore.fonts_dir)
    }

    /// Deadline for applying the package bundle, if one is configured.
    #[must_use]
    pub fn bundle_timeout(&self) -> Option<Duration> {
        self.config
            .restore
            .bundle_timeout_secs
            .map(Duration::from_secs)
    }

    /// Create a copy of this context with a different logger.
    ///
    /// Used by the parallel aggregator to give each probe its own buffered
    /// logger while sharing the rest of the context.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            config: Arc::clone(&self.config),
            platform: Arc::clone(&self.platform),
            log,
            home: self.home.clone(),
            executor: Arc::clone(&self.executor),
            parallel: self.parallel,
        }
    }
}

/// Resolve the user's home directory from `$HOME`.
///
/// # Errors
///
/// Returns an error if HOME is unset or empty.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeExecutor, TestEnv};

    #[test]
    fn paths_expand_against_home() {
        let env = TestEnv::new(FakeExecutor::new());
        let home = env.ctx.home.clone();
        assert_eq!(env.ctx.font_dirs(), vec![home.join("Library/Fonts")]);
        assert_eq!(
            env.ctx.app_dirs(),
            vec![PathBuf::from("/Applications"), home.join("Applications")]
        );
        assert_eq!(env.ctx.restore_fonts_dir(), home.join("Library/Fonts"));
    }

    #[test]
    fn bundle_timeout_from_config() {
        let mut config = Config::default();
        config.restore.bundle_timeout_secs = Some(90);
        let env = TestEnv::with_config(FakeExecutor::new(), config);
        assert_eq!(env.ctx.bundle_timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn with_log_shares_everything_else() {
        let env = TestEnv::new(FakeExecutor::new());
        let other: Arc<dyn Log> = Arc::new(crate::logging::Logger::with_log_file(None));
        let copy = env.ctx.with_log(other);
        assert_eq!(copy.home, env.ctx.home);
        assert!(Arc::ptr_eq(&copy.config, &env.ctx.config));
        assert_eq!(copy.parallel, env.ctx.parallel);
    }
}
