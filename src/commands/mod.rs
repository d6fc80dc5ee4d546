pub mod backup;
pub mod completions;
pub mod restore;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::context::{Context, home_dir};
use crate::exec::Executor;
use crate::logging::{Log, Logger};
use crate::platform::Platform;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection, home resolution, and configuration
/// loading so that each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Loaded configuration, defaults when no file exists.
    pub config: Config,
    /// `$HOME`.
    pub home: PathBuf,
}

impl CommandSetup {
    /// Detect the platform and load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `$HOME` is unset or the config file cannot be read
    /// or parsed.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let platform = Platform::detect();
        log.debug(&format!("platform: {}", platform.os));
        if !platform.is_macos() {
            log.warn("not running on macOS; most probes will find nothing");
        }

        let home = home_dir()?;
        log.stage("Loading configuration");
        let config = Config::load(global.config.as_deref(), &home)
            .context("failed to load configuration")?;
        log.debug(&format!(
            "{} font directories, {} application directories",
            config.fonts.directories.len(),
            config.applications.directories.len()
        ));
        log.debug(&format!(
            "{} config files, {} tools",
            config.environment.config_files.len(),
            config.environment.tools.len()
        ));

        Ok(Self {
            platform,
            config,
            home,
        })
    }

    /// Build the shared [`Context`] for this command.
    #[must_use]
    pub fn into_context(
        self,
        log: &Arc<Logger>,
        executor: Arc<dyn Executor>,
        parallel: bool,
    ) -> Context {
        Context {
            config: Arc::new(self.config),
            platform: Arc::new(self.platform),
            log: Arc::clone(log) as Arc<dyn Log>,
            home: self.home,
            executor,
            parallel,
        }
    }
}
