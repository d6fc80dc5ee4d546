#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing
)]
//! Integration tests for the `backup` command.
//!
//! These tests run the registered probes against a scripted executor and a
//! temporary home, then check the backup directory the command leaves
//! behind.

mod common;

use std::path::Path;

use common::{IntegrationTestContext, ScriptedExecutor, typical_mac};
use macbac::backup::{BackupInfo, Manifest, load_manifest};
use macbac::commands::backup::execute;
use macbac::probes::{self, ProbeKind};

fn backup(env: &IntegrationTestContext, out: &Path) -> std::path::PathBuf {
    execute(&probes::all_probes(), &env.ctx, &env.log, out).expect("backup succeeds")
}

// ---------------------------------------------------------------------------
// Snapshot: registered probes
// ---------------------------------------------------------------------------

/// Snapshot of the probe keys in registration order.
///
/// Any addition, removal, or reorder of a probe changes the report layout,
/// so it should be a deliberate snapshot update.
#[test]
fn probe_keys() {
    let keys: Vec<&str> = probes::all_probes()
        .iter()
        .map(|p| p.kind().key())
        .collect();
    insta::assert_snapshot!("probe_keys", keys.join("\n"));
}

#[test]
fn every_kind_has_exactly_one_probe() {
    let mut kinds: Vec<ProbeKind> = probes::all_probes().iter().map(|p| p.kind()).collect();
    kinds.sort();
    assert_eq!(kinds, ProbeKind::ALL.to_vec());
}

// ---------------------------------------------------------------------------
// End-to-end backup
// ---------------------------------------------------------------------------

#[test]
fn writes_complete_backup_directory() {
    let env = IntegrationTestContext::new(typical_mac(), false);
    env.write("Library/Fonts/Inter.ttf", "inter");
    env.write("Library/Fonts/mono/Fira.otf", "fira");
    env.write(".gitconfig", "[user]\n\tname = me\n");
    env.write(".ssh/config", "Host *\n");
    let out = tempfile::tempdir().unwrap();

    let dir = backup(&env, out.path());

    assert!(
        dir.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("macbac_backup_")
    );
    let manifest = load_manifest(&dir).unwrap();
    assert_eq!(manifest.backup_info.macos_version, "14.4.1");
    assert_eq!(manifest.store_apps.len(), 2);
    assert_eq!(manifest.store_apps[0].id, "497799835");
    assert!(manifest.package_bundle.raw_bundle_text.contains("cask \"firefox\""));
    assert_eq!(manifest.fonts, vec!["Inter.ttf", "Fira.otf"]);
    assert_eq!(manifest.environment_tools, vec!["git"]);
    assert_eq!(manifest.config_files, vec![".gitconfig", ".ssh/config"]);

    assert_eq!(std::fs::read_to_string(dir.join("fonts/Fira.otf")).unwrap(), "fira");
    assert_eq!(
        std::fs::read_to_string(dir.join("configs/.ssh/config")).unwrap(),
        "Host *\n"
    );

    let report = std::fs::read_to_string(dir.join("inventory.md")).unwrap();
    assert!(report.starts_with("# macbac Backup Inventory"));
    assert!(report.contains("| 409183694 | Keynote |"));
}

#[test]
fn parallel_backup_matches_sequential() {
    let sequential = IntegrationTestContext::new(typical_mac(), false);
    let parallel = IntegrationTestContext::new(typical_mac(), true);
    for env in [&sequential, &parallel] {
        env.write("Library/Fonts/Inter.ttf", "inter");
    }
    let out = tempfile::tempdir().unwrap();

    let a = load_manifest(&backup(&sequential, &out.path().join("seq"))).unwrap();
    let b = load_manifest(&backup(&parallel, &out.path().join("par"))).unwrap();

    let strip = |m: Manifest| Manifest {
        backup_info: BackupInfo::default(),
        ..m
    };
    assert_eq!(strip(a), strip(b));
    assert_eq!(parallel.log.step_entries().len(), 5);
}

#[test]
fn bare_machine_still_produces_backup() {
    let env = IntegrationTestContext::new(ScriptedExecutor::new(), false);
    let out = tempfile::tempdir().unwrap();

    let dir = backup(&env, out.path());
    let manifest = load_manifest(&dir).unwrap();
    assert!(manifest.store_apps.is_empty());
    assert_eq!(manifest.package_bundle.raw_bundle_text, "");
    assert_eq!(manifest.backup_info.macos_version, "Unknown");

    let report = std::fs::read_to_string(dir.join("inventory.md")).unwrap();
    assert!(report.contains("⚠️ mas command not found"));
    assert!(report.contains("⚠️ Homebrew not found"));
}

#[test]
fn failing_probe_is_reported_not_fatal() {
    let executor = ScriptedExecutor::new()
        .with("mas", true, "497799835 Xcode\n")
        .with("brew", false, "");
    let env = IntegrationTestContext::new(executor, false);
    let out = tempfile::tempdir().unwrap();

    let dir = backup(&env, out.path());
    let manifest = load_manifest(&dir).unwrap();
    assert_eq!(manifest.store_apps.len(), 1);
    assert_eq!(manifest.package_bundle.raw_bundle_text, "");

    let report = std::fs::read_to_string(dir.join("inventory.md")).unwrap();
    assert!(report.contains("❌ Error: Failed to generate Brewfile"));
    assert_eq!(env.log.failure_count(), 1);
}

#[test]
fn unwritable_output_root_fails() {
    let env = IntegrationTestContext::new(ScriptedExecutor::new(), false);
    let out = tempfile::tempdir().unwrap();
    let blocker = out.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();

    let err = execute(&probes::all_probes(), &env.ctx, &env.log, &blocker).unwrap_err();
    assert!(err.to_string().contains("failed to create backup directory"));
}
