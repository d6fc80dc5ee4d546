use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::restore::RestoreCategory;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "macbac",
    about = "Back up and restore a macOS software inventory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Path to the TOML config file (default: $MACBAC_CONFIG, then ~/.config/macbac/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run probes one at a time (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the system and write a backup directory
    Backup(BackupOpts),
    /// Restore software from a backup directory
    Restore(RestoreOpts),
    /// Print version information
    Version,
    /// Generate shell completions
    Completions(CompletionsOpts),
}

impl Command {
    /// Subcommand name, used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Backup(_) => "backup",
            Self::Restore(_) => "restore",
            Self::Version => "version",
            Self::Completions(_) => "completions",
        }
    }
}

/// Options for the `backup` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct BackupOpts {
    /// Directory the backup is created in (default from config, else ~/macbac_backups)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

/// Options for the `restore` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RestoreOpts {
    /// Backup directory containing manifest.json
    #[arg(short, long, value_name = "DIR")]
    pub source: PathBuf,

    /// What to restore
    #[arg(value_enum)]
    pub category: RestoreTarget,

    /// Give up on `brew bundle` after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Restore target selected on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTarget {
    /// App Store applications
    Appstore,
    /// Homebrew formulae, casks and taps
    #[value(alias = "bundle")]
    Homebrew,
    /// Custom fonts
    Fonts,
    /// Shell and tool config files
    Configs,
    /// Show what the backup contains
    Summary,
    /// Every category
    All,
}

impl RestoreTarget {
    /// Categories this target runs; empty for [`Summary`](Self::Summary).
    #[must_use]
    pub fn categories(self) -> Vec<RestoreCategory> {
        match self {
            Self::Appstore => vec![RestoreCategory::StoreApps],
            Self::Homebrew => vec![RestoreCategory::PackageBundle],
            Self::Fonts => vec![RestoreCategory::Fonts],
            Self::Configs => vec![RestoreCategory::Configs],
            Self::Summary => Vec::new(),
            Self::All => RestoreCategory::ALL.to_vec(),
        }
    }
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
#[command(after_help = "EXAMPLES:\n  \
                  macbac completions zsh > ~/.zfunc/_macbac\n  \
                  macbac completions fish > ~/.config/fish/completions/macbac.fish")]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
