//! `manifest.json`: the durable record restore works from.
//!
//! Every key is always written and every key is optional on read, so a
//! restore never has to distinguish "absent" from "empty".
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::BackupRun;
use crate::error::ManifestError;
use crate::probes::ProbeOutput;

/// File name of the manifest inside a backup directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// When and where a backup was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupInfo {
    /// ISO-8601 local timestamp.
    pub date: String,
    /// `sw_vers -productVersion`, or `Unknown`.
    pub macos_version: String,
    /// Version of the tool that wrote the backup.
    pub macbac_version: String,
}

/// An App Store app to reinstall.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestStoreApp {
    /// App Store id, or `unknown`.
    pub id: String,
    /// Application name.
    pub name: String,
}

/// The Brewfile captured at backup time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestBundle {
    /// Verbatim Brewfile text; empty when Homebrew was unavailable.
    #[serde(rename = "brewfile")]
    pub raw_bundle_text: String,
}

/// A manually installed app, recorded for reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestManualApp {
    /// Application name.
    pub name: String,
    /// Original install location.
    pub path: String,
}

/// Canonical backup record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Backup metadata.
    pub backup_info: BackupInfo,
    /// App Store apps.
    #[serde(rename = "appstore")]
    pub store_apps: Vec<ManifestStoreApp>,
    /// Homebrew bundle.
    #[serde(rename = "homebrew")]
    pub package_bundle: ManifestBundle,
    /// Font file names, copied under `fonts/`.
    pub fonts: Vec<String>,
    /// Manually installed apps.
    pub manual_apps: Vec<ManifestManualApp>,
    /// Names of developer tools found at backup time.
    #[serde(rename = "dev_tools")]
    pub environment_tools: Vec<String>,
    /// Home-relative config file paths, copied under `configs/`.
    pub config_files: Vec<String>,
}

/// Derive the manifest from a run.
///
/// Failed or absent probes contribute empty values.
#[must_use]
pub fn build_manifest(run: &BackupRun) -> Manifest {
    let mut manifest = Manifest {
        backup_info: run.info.clone(),
        ..Manifest::default()
    };

    for output in run.outputs() {
        match output {
            ProbeOutput::StoreApps(scan) => {
                manifest.store_apps = scan
                    .apps
                    .iter()
                    .map(|a| ManifestStoreApp {
                        id: a.id.clone(),
                        name: a.name.clone(),
                    })
                    .collect();
            }
            ProbeOutput::PackageBundle(scan) => {
                manifest.package_bundle.raw_bundle_text.clone_from(&scan.text);
            }
            ProbeOutput::Environment(scan) => {
                manifest.environment_tools = scan.tools.iter().map(|t| t.name.clone()).collect();
                manifest.config_files = scan
                    .config_files
                    .iter()
                    .filter_map(|c| c.relative.as_deref())
                    .map(|rel| rel.to_string_lossy().into_owned())
                    .collect();
            }
            ProbeOutput::Fonts(scan) => {
                // Only the first font with a given name is archived.
                let mut seen = HashSet::new();
                manifest.fonts = scan
                    .fonts
                    .iter()
                    .filter(|f| seen.insert(f.name.as_str()))
                    .map(|f| f.name.clone())
                    .collect();
            }
            ProbeOutput::ManualApps(scan) => {
                manifest.manual_apps = scan
                    .apps
                    .iter()
                    .map(|a| ManifestManualApp {
                        name: a.name.clone(),
                        path: a.path.to_string_lossy().into_owned(),
                    })
                    .collect();
            }
        }
    }

    manifest
}

/// Write `dest_dir/manifest.json` as pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub fn write_manifest(manifest: &Manifest, dest_dir: &Path) -> Result<PathBuf, ManifestError> {
    let path = dest_dir.join(MANIFEST_FILE);
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');
    std::fs::write(&path, json).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Read `dir/manifest.json`.
///
/// # Errors
///
/// Returns [`ManifestError::NotFound`] if the file is absent,
/// [`ManifestError::Corrupt`] if it does not match the schema, and
/// [`ManifestError::Io`] on other read failures.
pub fn load_manifest(dir: &Path) -> Result<Manifest, ManifestError> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound { path: path.clone() }
        } else {
            ManifestError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|e| ManifestError::Corrupt {
        path,
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backup::test_support::{font, sample_run, store_apps};
    use crate::error::ProbeError;
    use crate::probes::{FontsScan, ProbeKind};

    #[test]
    fn empty_run_has_every_key() {
        let run = BackupRun::new(chrono::Local::now(), BackupInfo::default());
        let manifest = build_manifest(&run);
        assert_eq!(manifest.store_apps, vec![]);
        assert_eq!(manifest.package_bundle.raw_bundle_text, "");

        let value = serde_json::to_value(&manifest).unwrap();
        for key in [
            "backup_info",
            "appstore",
            "homebrew",
            "fonts",
            "manual_apps",
            "dev_tools",
            "config_files",
        ] {
            assert!(
                value.get(key).is_some_and(|v| !v.is_null()),
                "{key} should be present and non-null"
            );
        }
        assert_eq!(value["homebrew"]["brewfile"], "");
    }

    #[test]
    fn failed_probe_maps_to_empty() {
        let sample = sample_run();
        let mut run = BackupRun::new(sample.started_at, sample.info.clone());
        run.insert(ProbeKind::StoreApps, Err(ProbeError::new("mas exploded")));
        for kind in ProbeKind::ALL {
            if let Some(result) = sample.result(kind) {
                run.insert(kind, result.clone());
            }
        }
        assert!(run.result(ProbeKind::StoreApps).is_some_and(Result::is_err));

        let manifest = build_manifest(&run);
        assert!(manifest.store_apps.is_empty());
        assert_eq!(manifest.fonts, vec!["A.ttf", "B.otf"]);
    }

    #[test]
    fn duplicate_font_names_listed_once() {
        let mut run = BackupRun::new(chrono::Local::now(), BackupInfo::default());
        run.insert(
            ProbeKind::Fonts,
            Ok(ProbeOutput::Fonts(FontsScan {
                fonts: vec![
                    font(PathBuf::from("/Users/me/Library/Fonts/Same.otf")),
                    font(PathBuf::from("/Users/me/Library/Fonts/sub/Same.otf")),
                    font(PathBuf::from("/Users/me/Library/Fonts/Other.ttf")),
                ],
                ..FontsScan::default()
            })),
        );
        assert_eq!(build_manifest(&run).fonts, vec!["Same.otf", "Other.ttf"]);
    }

    #[test]
    fn maps_every_category() {
        let manifest = build_manifest(&sample_run());
        assert_eq!(
            manifest.store_apps,
            vec![ManifestStoreApp {
                id: "497799835".to_string(),
                name: "Xcode".to_string(),
            }]
        );
        assert_eq!(manifest.package_bundle.raw_bundle_text, "brew \"git\"");
        assert_eq!(manifest.environment_tools, vec!["git"]);
        assert_eq!(manifest.config_files, vec![".ssh/config"]);
        assert_eq!(manifest.manual_apps[0].name, "Tool");
        assert_eq!(manifest.manual_apps[0].path, "/Applications/Tool.app");
        assert_eq!(manifest.backup_info.macos_version, "14.4.1");
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = build_manifest(&sample_run());
        let path = write_manifest(&manifest, dir.path()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"backup_info\": {"), "two-space indent");
        assert_eq!(load_manifest(dir.path()).unwrap(), manifest);
    }

    #[test]
    fn field_order_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(&Manifest::default(), dir.path()).unwrap();
        let text = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let positions: Vec<usize> = [
            "\"backup_info\"",
            "\"appstore\"",
            "\"homebrew\"",
            "\"fonts\"",
            "\"manual_apps\"",
            "\"dev_tools\"",
            "\"config_files\"",
        ]
        .iter()
        .map(|k| text.find(k).expect("key present"))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn load_invalid_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        let err = load_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Corrupt { .. }), "got {err:?}");
    }

    #[test]
    fn load_null_collection_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), r#"{"fonts": null}"#).unwrap();
        assert!(matches!(
            load_manifest(dir.path()),
            Err(ManifestError::Corrupt { .. })
        ));
    }

    #[test]
    fn load_sparse_manifest_defaults_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"appstore": [{"id": "497799835", "name": "Xcode"}], "extra": 1}"#,
        )
        .unwrap();
        let manifest = load_manifest(dir.path()).unwrap();
        assert_eq!(manifest.store_apps.len(), 1);
        assert!(manifest.fonts.is_empty());
        assert!(manifest.config_files.is_empty());
        assert_eq!(manifest.package_bundle.raw_bundle_text, "");
    }

    #[test]
    fn store_apps_keep_only_id_and_name() {
        let mut run = BackupRun::new(chrono::Local::now(), BackupInfo::default());
        run.insert(ProbeKind::StoreApps, Ok(store_apps(&[("unknown", "Pages")])));
        let json = serde_json::to_value(build_manifest(&run)).unwrap();
        assert_eq!(
            json["appstore"],
            serde_json::json!([{"id": "unknown", "name": "Pages"}])
        );
    }
}
