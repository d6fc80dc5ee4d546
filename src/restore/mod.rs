//! Reinstall software from a backup directory.
//!
//! A [`RestoreEngine`] reads `manifest.json` once when it is opened and then
//! serves any number of independent category operations.  Each operation
//! either completes, folding per-item failures into [`RestoreStats`], or is
//! aborted up front when a whole-category precondition (a missing tool or
//! payload directory) does not hold.
mod appstore;
mod bundle;
mod payload;
mod summary;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::backup::{Manifest, load_manifest};
use crate::context::Context;
use crate::error::ManifestError;

pub use summary::{CategorySummary, RestoreSummary};

/// Restorable categories, in `restore all` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestoreCategory {
    /// App Store apps via `mas install`.
    StoreApps,
    /// Homebrew bundle via `brew bundle`.
    PackageBundle,
    /// Font files into the user font directory.
    Fonts,
    /// Config files into the home directory.
    Configs,
}

impl RestoreCategory {
    /// Every category, in the order `restore all` runs them.
    pub const ALL: [Self; 4] = [
        Self::StoreApps,
        Self::PackageBundle,
        Self::Fonts,
        Self::Configs,
    ];

    /// Human-readable label used for step names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StoreApps => "App Store apps",
            Self::PackageBundle => "Homebrew bundle",
            Self::Fonts => "Fonts",
            Self::Configs => "Config files",
        }
    }
}

impl fmt::Display for RestoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One item that could not be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Item identifier (app name, font file, config path).
    pub item: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.reason)
    }
}

/// Counters for a completed restore operation.
///
/// # Examples
///
/// ```
/// use macbac::restore::RestoreStats;
///
/// let mut stats = RestoreStats::default();
/// stats.restored = 3;
/// stats.skipped = 1;
///
/// assert_eq!(stats.summary(), "3 restored, 1 skipped, 0 failed");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreStats {
    /// Items installed or copied.
    pub restored: usize,
    /// Items left alone (already present, or not restorable).
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Failure details, one per failed item.
    pub errors: Vec<ItemError>,
    /// Informational message, e.g. "nothing to restore".
    pub notice: Option<String>,
}

impl RestoreStats {
    /// Completed stats carrying only a notice.
    #[must_use]
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            notice: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record a failed item.
    pub fn fail(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        self.failed += 1;
        self.errors.push(ItemError {
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// Format the counters, e.g. `"3 restored, 1 skipped, 0 failed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} restored, {} skipped, {} failed",
            self.restored, self.skipped, self.failed
        )
    }
}

/// Why a whole category was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abort {
    /// What is wrong.
    pub reason: String,
    /// What the user can do about it, if anything.
    pub remediation: Option<String>,
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remediation {
            Some(fix) => write!(f, "{} (to fix: {fix})", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Outcome of one restore operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreStatus {
    /// The operation ran; individual items may still have failed.
    Completed(RestoreStats),
    /// A precondition failed and nothing was attempted.
    Aborted(Abort),
}

impl RestoreStatus {
    pub(crate) fn aborted(reason: impl Into<String>, remediation: Option<&str>) -> Self {
        Self::Aborted(Abort {
            reason: reason.into(),
            remediation: remediation.map(String::from),
        })
    }

    /// Whether the operation aborted or recorded failed items.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        match self {
            Self::Completed(stats) => stats.failed > 0,
            Self::Aborted(_) => true,
        }
    }
}

/// Restore session over one backup directory.
#[derive(Debug, Clone)]
pub struct RestoreEngine {
    source: PathBuf,
    manifest: Manifest,
}

impl RestoreEngine {
    /// Open `source_dir` and read its manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::NotFound`] when the directory has no
    /// `manifest.json` and [`ManifestError::Corrupt`] when it cannot be
    /// parsed.
    pub fn open(source_dir: &Path) -> Result<Self, ManifestError> {
        let manifest = load_manifest(source_dir)?;
        Ok(Self {
            source: source_dir.to_path_buf(),
            manifest,
        })
    }

    /// The backup directory.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The loaded manifest.
    #[must_use]
    pub const fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Run one category.
    pub fn restore(&self, category: RestoreCategory, ctx: &Context) -> RestoreStatus {
        ctx.log.stage(&format!("Restoring {}", category.label()));
        match category {
            RestoreCategory::StoreApps => self.restore_store_apps(ctx),
            RestoreCategory::PackageBundle => self.restore_package_bundle(ctx),
            RestoreCategory::Fonts => self.restore_fonts(ctx),
            RestoreCategory::Configs => self.restore_config_files(ctx),
        }
    }
}
