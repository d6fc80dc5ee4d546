//! Optional TOML configuration: scan locations, environment checks and
//! restore destinations.
//!
//! Every section and field has a default, so a missing file (or an empty
//! one) yields the stock macOS layout.  Paths may start with `~/`, which is
//! expanded against the run's home directory by [`expand_home`].
pub mod toml_loader;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV: &str = "MACBAC_CONFIG";

/// All loaded configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[backup]` section.
    pub backup: BackupSection,
    /// `[fonts]` section.
    pub fonts: FontsSection,
    /// `[applications]` section.
    pub applications: ApplicationsSection,
    /// `[environment]` section.
    pub environment: EnvironmentSection,
    /// `[restore]` section.
    pub restore: RestoreSection,
}

/// Where new backup directories are created.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BackupSection {
    /// Root under which `macbac_backup_<timestamp>` directories are created.
    pub output: String,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            output: "~/macbac_backups".to_string(),
        }
    }
}

/// Font directories scanned during backup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FontsSection {
    /// Directories scanned recursively for font files.
    pub directories: Vec<String>,
}

impl Default for FontsSection {
    fn default() -> Self {
        Self {
            directories: vec!["~/Library/Fonts".to_string()],
        }
    }
}

/// Application directories scanned for `.app` bundles.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ApplicationsSection {
    /// Directories whose direct children are inspected.
    pub directories: Vec<String>,
}

impl Default for ApplicationsSection {
    fn default() -> Self {
        Self {
            directories: vec!["/Applications".to_string(), "~/Applications".to_string()],
        }
    }
}

/// A dotfile the environment probe looks for.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileSpec {
    /// Display name, usually the home-relative path.
    pub name: String,
    /// Location, typically starting with `~/`.
    pub path: String,
    /// One-line description for the inventory report.
    #[serde(default)]
    pub description: String,
}

/// A developer tool whose version the environment probe records.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolSpec {
    /// Program name looked up on `PATH`.
    pub name: String,
    /// One-line description for the inventory report.
    #[serde(default)]
    pub description: String,
    /// Arguments that make the program print its version.
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
}

fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// Dotfiles and tools checked by the environment probe.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentSection {
    /// Config files recorded and copied into `configs/`.
    pub config_files: Vec<ConfigFileSpec>,
    /// Tools whose presence and version are recorded.
    pub tools: Vec<ToolSpec>,
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        let config_files = [
            (".gitconfig", "Git global configuration"),
            (".zshrc", "Zsh shell configuration"),
            (".bashrc", "Bash shell configuration"),
            (".bash_profile", "Bash profile configuration"),
            (".vimrc", "Vim editor configuration"),
            (".tmux.conf", "Tmux terminal multiplexer configuration"),
            (".ssh/config", "SSH client configuration"),
            (".aws/config", "AWS CLI configuration"),
            (".aws/credentials", "AWS CLI credentials (sensitive)"),
            (".npmrc", "NPM configuration"),
            (".pypirc", "PyPI configuration"),
            (".gitignore_global", "Global Git ignore patterns"),
        ]
        .into_iter()
        .map(|(name, description)| ConfigFileSpec {
            name: name.to_string(),
            path: format!("~/{name}"),
            description: description.to_string(),
        })
        .collect();

        let tools = [
            ("git", "Version control system", "--version"),
            ("python3", "Python interpreter", "--version"),
            ("node", "Node.js runtime", "--version"),
            ("npm", "Node package manager", "--version"),
            ("go", "Go toolchain", "version"),
            ("rustc", "Rust compiler", "--version"),
            ("cargo", "Rust package manager", "--version"),
            ("java", "Java runtime", "-version"),
            ("ruby", "Ruby interpreter", "--version"),
            ("docker", "Container runtime", "--version"),
            ("xcodebuild", "Xcode command line tools", "-version"),
        ]
        .into_iter()
        .map(|(name, description, arg)| ToolSpec {
            name: name.to_string(),
            description: description.to_string(),
            version_args: vec![arg.to_string()],
        })
        .collect();

        Self {
            config_files,
            tools,
        }
    }
}

/// Restore destinations and limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RestoreSection {
    /// Directory fonts are restored into.
    pub fonts_dir: String,
    /// Deadline for `brew bundle`, in seconds; `None` waits indefinitely.
    pub bundle_timeout_secs: Option<u64>,
}

impl Default for RestoreSection {
    fn default() -> Self {
        Self {
            fonts_dir: "~/Library/Fonts".to_string(),
            bundle_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration using the standard lookup order.
    ///
    /// `explicit` (from `--config`) must exist.  Otherwise `$MACBAC_CONFIG`
    /// and then `~/.config/macbac/config.toml` are tried, and a missing file
    /// yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed, or if an
    /// explicit path does not exist.
    pub fn load(explicit: Option<&Path>, home: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            return toml_loader::load_config(path);
        }
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        toml_loader::load_config(&default_path(env_path, home))
    }
}

/// Resolve the implicit config location: `$MACBAC_CONFIG` if set, else
/// `~/.config/macbac/config.toml`.
fn default_path(env_path: Option<PathBuf>, home: &Path) -> PathBuf {
    env_path
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| home.join(".config").join("macbac").join("config.toml"))
}

/// Expand a leading `~` or `~/` against `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}
