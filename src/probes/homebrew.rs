use super::{Probe, ProbeKind, ProbeOutput};
use crate::context::Context;
use crate::error::ProbeError;

/// Warning attached when `brew` is unavailable.
pub const BREW_MISSING_WARNING: &str = "Homebrew not found - brew command not available";

/// Line counts of a Brewfile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleStats {
    /// `tap "…"` lines.
    pub taps: usize,
    /// `brew "…"` lines.
    pub formulae: usize,
    /// `cask "…"` lines.
    pub casks: usize,
    /// `mas "…"` lines.
    pub mas_apps: usize,
    /// Non-blank lines.
    pub total_lines: usize,
}

impl BundleStats {
    /// Count entry kinds in Brewfile text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        text.lines().fold(Self::default(), |mut stats, line| {
            if line.starts_with("tap ") {
                stats.taps += 1;
            } else if line.starts_with("brew ") {
                stats.formulae += 1;
            } else if line.starts_with("cask ") {
                stats.casks += 1;
            } else if line.starts_with("mas ") {
                stats.mas_apps += 1;
            }
            if !line.trim().is_empty() {
                stats.total_lines += 1;
            }
            stats
        })
    }
}

/// Output of [`DumpPackageBundle`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleScan {
    /// Brewfile text, trimmed.  Empty when Homebrew is unavailable.
    pub text: String,
    /// Entry counts.
    pub stats: BundleStats,
    /// Set when Homebrew is unavailable.
    pub warning: Option<String>,
}

/// Capture the Homebrew bundle with `brew bundle dump --file=-`.
#[derive(Debug)]
pub struct DumpPackageBundle;

impl Probe for DumpPackageBundle {
    fn kind(&self) -> ProbeKind {
        ProbeKind::PackageBundle
    }

    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
        if !ctx.executor.which("brew") {
            ctx.log.warn(BREW_MISSING_WARNING);
            return Ok(ProbeOutput::PackageBundle(BundleScan {
                warning: Some(BREW_MISSING_WARNING.to_string()),
                ..BundleScan::default()
            }));
        }

        let result = ctx
            .executor
            .run("brew", &["bundle", "dump", "--file=-"])
            .map_err(|e| ProbeError::new(format!("Failed to generate Brewfile: {e}")))?;
        let text = result.stdout.trim().to_string();
        let stats = BundleStats::from_text(&text);
        ctx.log.info(&format!(
            "{} taps, {} formulae, {} casks, {} mas apps",
            stats.taps, stats.formulae, stats.casks, stats.mas_apps
        ));
        Ok(ProbeOutput::PackageBundle(BundleScan {
            text,
            stats,
            warning: None,
        }))
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeExecutor, TestEnv};

    const BREWFILE: &str = "tap \"homebrew/bundle\"\nbrew \"git\"\nbrew \"jq\"\n\ncask \"firefox\"\nmas \"Xcode\", id: 497799835\n";

    #[test]
    fn stats_count_each_kind() {
        let stats = BundleStats::from_text(BREWFILE);
        assert_eq!(
            stats,
            BundleStats {
                taps: 1,
                formulae: 2,
                casks: 1,
                mas_apps: 1,
                total_lines: 5,
            }
        );
    }

    #[test]
    fn dumps_bundle_text() {
        let env = TestEnv::new(FakeExecutor::new().with_response(
            "brew",
            true,
            &format!("\n{BREWFILE}\n"),
        ));
        let ProbeOutput::PackageBundle(scan) = DumpPackageBundle.scan(&env.ctx).unwrap() else {
            panic!("unexpected output");
        };
        assert_eq!(scan.text, BREWFILE.trim());
        assert_eq!(scan.stats.formulae, 2);
        assert_eq!(
            env.executor.calls_to("brew"),
            vec![vec!["bundle", "dump", "--file=-"]]
        );
    }

    #[test]
    fn missing_brew_is_empty_with_warning() {
        let env = TestEnv::new(FakeExecutor::new());
        let ProbeOutput::PackageBundle(scan) = DumpPackageBundle.scan(&env.ctx).unwrap() else {
            panic!("unexpected output");
        };
        assert!(scan.text.is_empty());
        assert_eq!(scan.warning.as_deref(), Some(BREW_MISSING_WARNING));
    }

    #[test]
    fn failing_dump_is_probe_error() {
        let env = TestEnv::new(FakeExecutor::new().with_output("brew", false, "", "boom"));
        let err = DumpPackageBundle.scan(&env.ctx).unwrap_err();
        assert!(err.message.contains("Failed to generate Brewfile"));
    }
}
