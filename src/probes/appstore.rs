use super::manual_apps::{app_bundles, bundle_stem, has_store_receipt};
use super::{Probe, ProbeKind, ProbeOutput};
use crate::context::Context;
use crate::error::ProbeError;

/// Placeholder id for apps found without `mas`.
pub const UNKNOWN_ID: &str = "unknown";

/// Warning attached when `mas` is unavailable.
pub const MAS_MISSING_WARNING: &str = "mas command not found - limited App Store app detection";

const FALLBACK_NOTE: &str = "App Store app (mas not installed - ID unavailable)";

/// An installed App Store application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreApp {
    /// Numeric App Store id, or [`UNKNOWN_ID`].
    pub id: String,
    /// Application name.
    pub name: String,
    /// Note explaining degraded detection.
    pub note: Option<String>,
}

/// Output of [`ScanStoreApps`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreAppsScan {
    /// Installed apps.
    pub apps: Vec<StoreApp>,
    /// Set when detection fell back to receipt scanning.
    pub warning: Option<String>,
}

/// List App Store apps via `mas list`, falling back to receipt scanning.
#[derive(Debug)]
pub struct ScanStoreApps;

impl Probe for ScanStoreApps {
    fn kind(&self) -> ProbeKind {
        ProbeKind::StoreApps
    }

    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
        if !ctx.executor.which("mas") {
            ctx.log.warn(MAS_MISSING_WARNING);
            return Ok(ProbeOutput::StoreApps(scan_receipts(ctx)));
        }

        let result = ctx
            .executor
            .run("mas", &["list"])
            .map_err(|e| ProbeError::new(format!("Failed to run mas list: {e}")))?;
        let apps = parse_mas_list(&result.stdout);
        ctx.log.info(&format!("{} App Store apps", apps.len()));
        Ok(ProbeOutput::StoreApps(StoreAppsScan {
            apps,
            warning: None,
        }))
    }
}

/// Parse `mas list` output: `<id> <name...>` per line.
///
/// `mas` pads its columns, so each line is trimmed and runs of whitespace in
/// the name collapse to one space.  Blank lines and lines with a single
/// token are ignored.
#[must_use]
pub fn parse_mas_list(output: &str) -> Vec<StoreApp> {
    output
        .lines()
        .filter_map(|line| line.trim().split_once(char::is_whitespace))
        .map(|(id, name)| StoreApp {
            id: id.to_string(),
            name: name.split_whitespace().collect::<Vec<_>>().join(" "),
            note: None,
        })
        .collect()
}

/// Find apps with an App Store receipt in the application directories.
fn scan_receipts(ctx: &Context) -> StoreAppsScan {
    let apps = ctx
        .app_dirs()
        .iter()
        .flat_map(|dir| app_bundles(dir))
        .filter(|bundle| has_store_receipt(bundle))
        .map(|bundle| StoreApp {
            id: UNKNOWN_ID.to_string(),
            name: bundle_stem(&bundle),
            note: Some(FALLBACK_NOTE.to_string()),
        })
        .collect();
    StoreAppsScan {
        apps,
        warning: Some(MAS_MISSING_WARNING.to_string()),
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_helpers::{FakeExecutor, TestEnv};

    fn scan(env: &TestEnv) -> StoreAppsScan {
        match ScanStoreApps.scan(&env.ctx).unwrap() {
            ProbeOutput::StoreApps(s) => s,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn parses_mas_list_lines() {
        let apps = parse_mas_list("497799835 Xcode (15.3)\n\n409183694 Keynote\nlonely\n");
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].id, "497799835");
        assert_eq!(apps[0].name, "Xcode (15.3)");
        assert_eq!(apps[1].name, "Keynote");
    }

    #[test]
    fn parses_padded_mas_columns() {
        let apps = parse_mas_list(
            "497799835  Xcode          (15.3)\n  409183694  Keynote        (13.1)\n   \n",
        );
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].id, "497799835");
        assert_eq!(apps[0].name, "Xcode (15.3)");
        assert_eq!(apps[1].id, "409183694");
        assert_eq!(apps[1].name, "Keynote (13.1)");
    }

    #[test]
    fn uses_mas_when_installed() {
        let env = TestEnv::new(FakeExecutor::new().with_response(
            "mas",
            true,
            "497799835 Xcode\n",
        ));
        let scan = scan(&env);
        assert_eq!(scan.apps.len(), 1);
        assert_eq!(scan.warning, None);
        assert_eq!(env.executor.calls_to("mas"), vec![vec!["list".to_string()]]);
    }

    #[test]
    fn mas_failure_is_probe_error() {
        let env = TestEnv::new(
            FakeExecutor::new().with_output("mas", false, "", "not signed in"),
        );
        let err = ScanStoreApps.scan(&env.ctx).unwrap_err();
        assert!(err.message.starts_with("Failed to run mas list"), "{err}");
        assert!(err.message.contains("not signed in"));
    }

    #[test]
    fn falls_back_to_receipts_without_mas() {
        let mut config = Config::default();
        config.applications.directories = vec!["~/Applications".to_string()];
        let env = TestEnv::with_config(FakeExecutor::new(), config);
        env.write("Applications/Pages.app/Contents/_MASReceipt/receipt", "r");
        std::fs::create_dir_all(env.path("Applications/Other.app/Contents")).unwrap();

        let scan = scan(&env);
        assert_eq!(scan.warning.as_deref(), Some(MAS_MISSING_WARNING));
        assert_eq!(scan.apps.len(), 1);
        assert_eq!(scan.apps[0].id, UNKNOWN_ID);
        assert_eq!(scan.apps[0].name, "Pages");
        assert!(scan.apps[0].note.is_some());
        assert_eq!(env.executor.call_count(), 0);
    }
}
