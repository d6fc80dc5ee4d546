//! Independent scanners, one per software category.
//!
//! Each probe queries a single subsystem and returns a typed
//! [`ProbeOutput`].  Expected unavailability (a missing tool or directory,
//! a permission error) is folded into the output as an empty list plus a
//! warning; only a tool that is present but fails returns [`ProbeError`].
pub mod appstore;
pub mod environment;
pub mod fonts;
pub mod homebrew;
pub mod manual_apps;

use std::fmt;

use crate::context::Context;
use crate::error::ProbeError;

pub use appstore::{ScanStoreApps, StoreApp, StoreAppsScan};
pub use environment::{ConfigFile, EnvironmentScan, ScanEnvironment, ToolInfo};
pub use fonts::{FontFile, FontsScan, ScanFonts, ScannedDir};
pub use homebrew::{BundleScan, BundleStats, DumpPackageBundle};
pub use manual_apps::{ManualApp, ManualAppsScan, ScanManualApps};

/// Closed set of probe categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProbeKind {
    /// Apps installed from the Mac App Store.
    StoreApps,
    /// The Homebrew bundle (taps, formulae, casks).
    PackageBundle,
    /// Shell and tool config files plus developer tool versions.
    Environment,
    /// User-installed fonts.
    Fonts,
    /// `.app` bundles installed by hand.
    ManualApps,
}

impl ProbeKind {
    /// Every kind, in report order.
    pub const ALL: [Self; 5] = [
        Self::StoreApps,
        Self::PackageBundle,
        Self::Environment,
        Self::Fonts,
        Self::ManualApps,
    ];

    /// Stable key string.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::StoreApps => "store_apps",
            Self::PackageBundle => "package_bundle",
            Self::Environment => "environment",
            Self::Fonts => "fonts",
            Self::ManualApps => "manual_apps",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StoreApps => "App Store apps",
            Self::PackageBundle => "Homebrew bundle",
            Self::Environment => "Development environment",
            Self::Fonts => "Fonts",
            Self::ManualApps => "Manual apps",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Typed result of one probe, one variant per [`ProbeKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutput {
    /// Output of [`ScanStoreApps`].
    StoreApps(StoreAppsScan),
    /// Output of [`DumpPackageBundle`].
    PackageBundle(BundleScan),
    /// Output of [`ScanEnvironment`].
    Environment(EnvironmentScan),
    /// Output of [`ScanFonts`].
    Fonts(FontsScan),
    /// Output of [`ScanManualApps`].
    ManualApps(ManualAppsScan),
}

impl ProbeOutput {
    /// The kind this output belongs to.
    #[must_use]
    pub const fn kind(&self) -> ProbeKind {
        match self {
            Self::StoreApps(_) => ProbeKind::StoreApps,
            Self::PackageBundle(_) => ProbeKind::PackageBundle,
            Self::Environment(_) => ProbeKind::Environment,
            Self::Fonts(_) => ProbeKind::Fonts,
            Self::ManualApps(_) => ProbeKind::ManualApps,
        }
    }

    /// Number of discovered items, for progress and summary lines.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::StoreApps(s) => s.apps.len(),
            Self::PackageBundle(s) => s.stats.total_lines,
            Self::Environment(s) => s.config_files.len() + s.tools.len(),
            Self::Fonts(s) => s.fonts.len(),
            Self::ManualApps(s) => s.apps.len(),
        }
    }

    /// Warning attached to the output, if any.
    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::StoreApps(s) => s.warning.as_deref(),
            Self::PackageBundle(s) => s.warning.as_deref(),
            Self::Environment(_) | Self::Fonts(_) | Self::ManualApps(_) => None,
        }
    }
}

/// A scanner for one software category.
#[cfg_attr(test, mockall::automock)]
pub trait Probe: Send + Sync {
    /// Which category this probe fills.
    fn kind(&self) -> ProbeKind;

    /// Query the system.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] when a required tool is present but its
    /// invocation fails.
    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError>;
}

/// The complete set of probes run by the backup command, in report order.
#[must_use]
pub fn all_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(ScanStoreApps),
        Box::new(DumpPackageBundle),
        Box::new(ScanEnvironment),
        Box::new(ScanFonts),
        Box::new(ScanManualApps),
    ]
}
