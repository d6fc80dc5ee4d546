use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::fonts::ScannedDir;
use super::{Probe, ProbeKind, ProbeOutput};
use crate::context::Context;
use crate::error::ProbeError;
use crate::fs::resolve;

const UNKNOWN: &str = "unknown";
const SANDBOX_KEY: &str = "com.apple.security.app-sandbox";
const HOMEBREW_PREFIXES: [&str; 2] = ["/opt/homebrew/", "/usr/local/"];
const HOMEBREW_BUNDLE_IDS: [&str; 2] = ["org.homebrew.", "homebrew."];

/// An application bundle installed outside the App Store and Homebrew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualApp {
    /// `CFBundleName`, or the bundle stem.
    pub name: String,
    /// Location of the `.app` directory.
    pub path: PathBuf,
    /// `CFBundleIdentifier`, or `unknown`.
    pub bundle_id: String,
    /// `CFBundleShortVersionString`, or `unknown`.
    pub version: String,
    /// `CFBundleDisplayName`, or the name.
    pub display_name: String,
}

/// Output of [`ScanManualApps`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualAppsScan {
    /// Bundles that passed the App Store and Homebrew filters.
    pub apps: Vec<ManualApp>,
    /// Every `.app` bundle with an `Info.plist`, before filtering.
    pub total_bundles: usize,
    /// Application directories and whether they existed.
    pub scanned_dirs: Vec<ScannedDir>,
}

/// Find applications that were dragged into an Applications folder.
#[derive(Debug)]
pub struct ScanManualApps;

impl Probe for ScanManualApps {
    fn kind(&self) -> ProbeKind {
        ProbeKind::ManualApps
    }

    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
        let mut scan = ManualAppsScan::default();

        for dir in ctx.app_dirs() {
            let found = dir.is_dir();
            if found {
                for bundle in app_bundles(&dir) {
                    let Some(info) = read_bundle(ctx, &bundle) else {
                        continue;
                    };
                    scan.total_bundles += 1;
                    if info.is_store_app || is_homebrew_app(&info.app) {
                        ctx.log.debug(&format!("excluded: {}", bundle.display()));
                        continue;
                    }
                    scan.apps.push(info.app);
                }
            } else {
                ctx.log.debug(&format!("not found: {}", dir.display()));
            }
            scan.scanned_dirs.push(ScannedDir { path: dir, found });
        }

        ctx.log.info(&format!(
            "{} manual apps ({} bundles seen)",
            scan.apps.len(),
            scan.total_bundles
        ));
        Ok(ProbeOutput::ManualApps(scan))
    }
}

/// A bundle's metadata plus whether it came from the App Store.
struct BundleInfo {
    app: ManualApp,
    is_store_app: bool,
}

/// `*.app` directories directly inside `dir`, sorted by path.
///
/// An unreadable directory yields nothing.
pub(crate) fn app_bundles(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut bundles: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "app") && p.is_dir())
        .collect();
    bundles.sort();
    bundles
}

/// Whether the bundle carries an App Store purchase receipt.
pub(crate) fn has_store_receipt(bundle: &Path) -> bool {
    bundle
        .join("Contents")
        .join("_MASReceipt")
        .join("receipt")
        .exists()
}

/// Bundle name without the `.app` extension.
pub(crate) fn bundle_stem(bundle: &Path) -> String {
    bundle
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a bundle's metadata.  `None` when it has no `Info.plist`.
fn read_bundle(ctx: &Context, bundle: &Path) -> Option<BundleInfo> {
    let plist = bundle.join("Contents").join("Info.plist");
    if !plist.exists() {
        return None;
    }
    let stem = bundle_stem(bundle);

    let Some(data) = read_plist(ctx, &plist) else {
        return Some(BundleInfo {
            app: ManualApp {
                name: stem.clone(),
                path: bundle.to_path_buf(),
                bundle_id: UNKNOWN.to_string(),
                version: UNKNOWN.to_string(),
                display_name: stem,
            },
            is_store_app: has_store_receipt(bundle),
        });
    };

    let field = |key: &str| data.get(key).and_then(Value::as_str).map(String::from);
    let name = field("CFBundleName").unwrap_or(stem);
    let app = ManualApp {
        display_name: field("CFBundleDisplayName").unwrap_or_else(|| name.clone()),
        bundle_id: field("CFBundleIdentifier").unwrap_or_else(|| UNKNOWN.to_string()),
        version: field("CFBundleShortVersionString").unwrap_or_else(|| UNKNOWN.to_string()),
        path: bundle.to_path_buf(),
        name,
    };
    let sandboxed = data.get(SANDBOX_KEY).is_some_and(is_truthy);
    Some(BundleInfo {
        app,
        is_store_app: sandboxed || has_store_receipt(bundle),
    })
}

/// Convert a property list to JSON with `plutil` and parse the top-level dict.
fn read_plist(ctx: &Context, plist: &Path) -> Option<Map<String, Value>> {
    let path = plist.to_string_lossy();
    let result = ctx
        .executor
        .run("plutil", &["-convert", "json", "-o", "-", &path])
        .ok()?;
    match serde_json::from_str(&result.stdout) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

/// Whether the bundle was installed by Homebrew Cask.
fn is_homebrew_app(app: &ManualApp) -> bool {
    let linked_from_brew = std::fs::symlink_metadata(&app.path)
        .is_ok_and(|m| m.file_type().is_symlink())
        && {
            let real = resolve(&app.path);
            let real = real.to_string_lossy();
            HOMEBREW_PREFIXES.iter().any(|p| real.contains(p))
        };
    linked_from_brew
        || HOMEBREW_BUNDLE_IDS
            .iter()
            .any(|marker| app.bundle_id.contains(marker))
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

    fn env_with_apps_dir(executor: FakeExecutor) -> TestEnv {
        let mut config = Config::default();
        config.applications.directories = vec!["~/Applications".to_string()];
        TestEnv::with_config(executor, config)
    }

    fn make_bundle(env: &TestEnv, name: &str) -> PathBuf {
        env.write(&format!("Applications/{name}.app/Contents/Info.plist"), "<plist/>");
        env.path(&format!("Applications/{name}.app"))
    }

    fn scan(env: &TestEnv) -> ManualAppsScan {
        match ScanManualApps.scan(&env.ctx).unwrap() {
            ProbeOutput::ManualApps(s) => s,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn reads_plist_fields() {
        let env = env_with_apps_dir(FakeExecutor::new().with_response(
            "plutil",
            true,
            r#"{"CFBundleName":"Tool","CFBundleIdentifier":"com.example.tool","CFBundleShortVersionString":"2.1","CFBundleDisplayName":"Tool Pro"}"#,
        ));
        let bundle = make_bundle(&env, "Tool");
        let scan = scan(&env);
        assert_eq!(scan.total_bundles, 1);
        assert_eq!(
            scan.apps,
            vec![ManualApp {
                name: "Tool".to_string(),
                path: bundle,
                bundle_id: "com.example.tool".to_string(),
                version: "2.1".to_string(),
                display_name: "Tool Pro".to_string(),
            }]
        );
        let plutil = env.executor.calls_to("plutil");
        assert_eq!(plutil[0][..4], ["-convert", "json", "-o", "-"]);
    }

    #[test]
    fn unreadable_plist_falls_back_to_stem() {
        let env = env_with_apps_dir(FakeExecutor::new().with_response("plutil", false, ""));
        make_bundle(&env, "Odd");
        let scan = scan(&env);
        assert_eq!(scan.apps.len(), 1);
        assert_eq!(scan.apps[0].name, "Odd");
        assert_eq!(scan.apps[0].display_name, "Odd");
        assert_eq!(scan.apps[0].bundle_id, "unknown");
        assert_eq!(scan.apps[0].version, "unknown");
    }

    #[test]
    fn bundle_without_info_plist_is_ignored() {
        let env = env_with_apps_dir(FakeExecutor::new());
        std::fs::create_dir_all(env.path("Applications/Empty.app/Contents")).unwrap();
        let scan = scan(&env);
        assert!(scan.apps.is_empty());
        assert_eq!(scan.total_bundles, 0);
    }

    #[test]
    fn store_receipt_excludes_app() {
        let env = env_with_apps_dir(FakeExecutor::new().with_response("plutil", true, "{}"));
        make_bundle(&env, "Pages");
        env.write("Applications/Pages.app/Contents/_MASReceipt/receipt", "r");
        let scan = scan(&env);
        assert!(scan.apps.is_empty());
        assert_eq!(scan.total_bundles, 1);
    }

    #[test]
    fn sandboxed_app_is_excluded() {
        let env = env_with_apps_dir(FakeExecutor::new().with_response(
            "plutil",
            true,
            r#"{"CFBundleName":"Boxed","com.apple.security.app-sandbox":true}"#,
        ));
        make_bundle(&env, "Boxed");
        assert!(scan(&env).apps.is_empty());
    }

    #[test]
    fn homebrew_bundle_id_is_excluded() {
        let env = env_with_apps_dir(FakeExecutor::new().with_response(
            "plutil",
            true,
            r#"{"CFBundleIdentifier":"org.homebrew.thing"}"#,
        ));
        make_bundle(&env, "Thing");
        assert!(scan(&env).apps.is_empty());
    }

    #[test]
    fn missing_directory_recorded_not_found() {
        let env = env_with_apps_dir(FakeExecutor::new());
        let scan = scan(&env);
        assert_eq!(scan.scanned_dirs.len(), 1);
        assert!(!scan.scanned_dirs[0].found);
    }

    #[test]
    fn non_app_entries_ignored() {
        let env = env_with_apps_dir(FakeExecutor::new());
        env.write("Applications/readme.txt", "x");
        std::fs::create_dir_all(env.path("Applications/Folder")).unwrap();
        assert!(app_bundles(&env.path("Applications")).is_empty());
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&Value::Bool(true)));
        assert!(!is_truthy(&Value::Bool(false)));
        assert!(is_truthy(&serde_json::json!(1)));
        assert!(!is_truthy(&serde_json::json!(0)));
        assert!(!is_truthy(&Value::Null));
    }
}
