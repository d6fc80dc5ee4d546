//! Backup pipeline: run the probes, then archive what they found.
//!
//! [`run_all`] (or [`run_all_parallel`]) produces a [`BackupRun`], which the
//! archiver turns into a backup directory:
//!
//! ```text
//! <root>/macbac_backup_<YYYYMMDD_HHMMSS>/
//! ├── manifest.json
//! ├── inventory.md
//! ├── fonts/<file name>
//! └── configs/<home-relative path>
//! ```
pub mod archive;
pub mod manifest;
pub mod report;

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::context::Context;
use crate::error::ProbeError;
use crate::logging::{BufferedLog, Log, Logger, StepStatus};
use crate::probes::{Probe, ProbeKind, ProbeOutput};

pub use archive::{MaterializeStats, materialize};
pub use manifest::{BackupInfo, Manifest, build_manifest, load_manifest, write_manifest};
pub use report::build_report;

/// Prefix of every backup directory name.
pub const BACKUP_DIR_PREFIX: &str = "macbac_backup_";

/// Version string recorded in manifests.
pub const VERSION: &str = match option_env!("MACBAC_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Everything the probes found during one backup invocation.
#[derive(Debug, Clone)]
pub struct BackupRun {
    /// When aggregation started.
    pub started_at: DateTime<Local>,
    /// Metadata recorded in the manifest.
    pub info: BackupInfo,
    /// Per-probe outcome.  A kind with no entry was never scanned.
    pub results: BTreeMap<ProbeKind, Result<ProbeOutput, ProbeError>>,
}

impl BackupRun {
    /// Create an empty run.
    #[must_use]
    pub const fn new(started_at: DateTime<Local>, info: BackupInfo) -> Self {
        Self {
            started_at,
            info,
            results: BTreeMap::new(),
        }
    }

    /// Record a probe result, keeping an earlier result for the same kind.
    ///
    /// Returns `false` if the kind was already present.
    pub fn insert(&mut self, kind: ProbeKind, result: Result<ProbeOutput, ProbeError>) -> bool {
        if self.results.contains_key(&kind) {
            return false;
        }
        self.results.insert(kind, result);
        true
    }

    /// The outcome recorded for `kind`, if it was scanned.
    #[must_use]
    pub fn result(&self, kind: ProbeKind) -> Option<&Result<ProbeOutput, ProbeError>> {
        self.results.get(&kind)
    }

    /// Successful outputs, in kind order.
    pub fn outputs(&self) -> impl Iterator<Item = &ProbeOutput> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    /// Kinds whose probe failed.
    #[must_use]
    pub fn failed_kinds(&self) -> Vec<ProbeKind> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_err())
            .map(|(k, _)| *k)
            .collect()
    }
}

/// Collect [`BackupInfo`] for a run starting at `started_at`.
#[must_use]
pub fn collect_info(ctx: &Context, started_at: &DateTime<Local>) -> BackupInfo {
    BackupInfo {
        date: started_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        macos_version: ctx.platform.product_version(ctx.executor.as_ref()),
        macbac_version: VERSION.to_string(),
    }
}

/// Run every probe sequentially and collect their results.
///
/// A probe that panics is recorded as a [`ProbeError`] carrying the panic
/// message; the remaining probes still run.
#[must_use]
pub fn run_all(probes: &[Box<dyn Probe>], ctx: &Context) -> BackupRun {
    let started_at = Local::now();
    let mut run = BackupRun::new(started_at, collect_info(ctx, &started_at));
    for probe in probes {
        let result = run_probe(probe.as_ref(), ctx);
        merge(&mut run, probe.kind(), result, ctx.log.as_ref());
    }
    run
}

/// Run every probe on the Rayon pool.
///
/// Each probe logs into its own [`BufferedLog`], flushed when it finishes,
/// while the status line lists the probes still running.  Results are
/// collected per worker and merged into the run in probe order.
#[must_use]
pub fn run_all_parallel(probes: &[Box<dyn Probe>], ctx: &Context, log: &Arc<Logger>) -> BackupRun {
    use rayon::prelude::*;

    let started_at = Local::now();
    let mut run = BackupRun::new(started_at, collect_info(ctx, &started_at));

    let results: Vec<(ProbeKind, Result<ProbeOutput, ProbeError>)> = probes
        .par_iter()
        .map(|probe| {
            let kind = probe.kind();
            log.notify_step_start(kind.label());
            let buf = Arc::new(BufferedLog::new(Arc::clone(log)));
            let probe_ctx = ctx.with_log(Arc::clone(&buf) as Arc<dyn Log>);
            let result = run_probe(probe.as_ref(), &probe_ctx);
            buf.flush_and_complete(kind.label());
            (kind, result)
        })
        .collect();

    for (kind, result) in results {
        merge(&mut run, kind, result, ctx.log.as_ref());
    }
    run
}

/// Scan one probe with panic isolation and record a summary step.
fn run_probe(probe: &dyn Probe, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
    let kind = probe.kind();
    ctx.log.stage(&format!("Scanning {}", kind.label()));

    let result = panic::catch_unwind(AssertUnwindSafe(|| probe.scan(ctx)))
        .unwrap_or_else(|payload| {
            Err(ProbeError::new(format!(
                "probe panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
        .and_then(|output| {
            if output.kind() == kind {
                Ok(output)
            } else {
                Err(ProbeError::new(format!(
                    "probe returned {} output",
                    output.kind()
                )))
            }
        });

    match &result {
        Ok(output) => {
            if let Some(warning) = output.warning() {
                ctx.log.warn(warning);
            }
            let message = format!("{} found", output.item_count());
            ctx.log
                .record_step(kind.label(), StepStatus::Ok, Some(&message));
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e}", kind.label()));
            ctx.log
                .record_step(kind.label(), StepStatus::Failed, Some(&e.message));
        }
    }
    result
}

/// Insert a result, warning about a duplicate kind.
fn merge(
    run: &mut BackupRun,
    kind: ProbeKind,
    result: Result<ProbeOutput, ProbeError>,
    log: &dyn Log,
) {
    if !run.insert(kind, result) {
        log.warn(&format!(
            "duplicate probe for {kind}; keeping the first result"
        ));
    }
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Create a fresh backup directory under `root`.
///
/// The name is `macbac_backup_<YYYYMMDD_HHMMSS>`; if that already exists a
/// numeric suffix `_2`, `_3`, … is appended.  An existing directory is never
/// reused.
///
/// # Errors
///
/// Returns an error if `root` cannot be created or no fresh name can be
/// claimed.
pub fn create_backup_dir(root: &Path, started_at: &DateTime<Local>) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    let base = format!(
        "{BACKUP_DIR_PREFIX}{}",
        started_at.format("%Y%m%d_%H%M%S")
    );
    for attempt in 1..=1000u32 {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{base}_{attempt}")
        };
        let candidate = root.join(name);
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("no free backup directory name for {base}"),
    ))
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
    use crate::probes::{FontsScan, MockProbe};
    use crate::test_helpers::{FakeExecutor, TestEnv};
    use test_support::store_apps;

    fn mock(kind: ProbeKind, result: Result<ProbeOutput, ProbeError>) -> Box<dyn Probe> {
        let mut probe = MockProbe::new();
        probe.expect_kind().return_const(kind);
        probe
            .expect_scan()
            .times(1)
            .return_once(move |_| result);
        Box::new(probe)
    }

    #[derive(Debug)]
    struct PanickingProbe;

    impl Probe for PanickingProbe {
        fn kind(&self) -> ProbeKind {
            ProbeKind::Environment
        }

        #[allow(clippy::panic)]
        fn scan(&self, _ctx: &Context) -> Result<ProbeOutput, ProbeError> {
            panic!("disk on fire");
        }
    }

    #[test]
    fn collects_every_probe() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes = vec![
            mock(ProbeKind::StoreApps, Ok(store_apps(&[("1", "A")]))),
            mock(ProbeKind::Fonts, Ok(ProbeOutput::Fonts(FontsScan::default()))),
        ];
        let run = run_all(&probes, &env.ctx);
        assert_eq!(run.results.len(), 2);
        assert!(run.result(ProbeKind::StoreApps).unwrap().is_ok());
        assert!(run.result(ProbeKind::ManualApps).is_none());
    }

    #[test]
    fn panicking_probe_is_isolated() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes: Vec<Box<dyn Probe>> = vec![
            mock(ProbeKind::StoreApps, Ok(store_apps(&[]))),
            Box::new(PanickingProbe),
            mock(ProbeKind::Fonts, Ok(ProbeOutput::Fonts(FontsScan::default()))),
        ];
        let run = run_all(&probes, &env.ctx);
        assert_eq!(run.results.len(), 3);
        let err = run.result(ProbeKind::Environment).unwrap().as_ref().unwrap_err();
        assert!(err.message.contains("disk on fire"), "{err}");
        assert!(run.result(ProbeKind::Fonts).unwrap().is_ok());
        assert_eq!(run.failed_kinds(), vec![ProbeKind::Environment]);
        assert_eq!(env.log.failure_count(), 1);
    }

    #[test]
    fn probe_error_is_recorded_not_propagated() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes = vec![
            mock(ProbeKind::PackageBundle, Err(ProbeError::new("brew broke"))),
            mock(ProbeKind::StoreApps, Ok(store_apps(&[]))),
        ];
        let run = run_all(&probes, &env.ctx);
        assert_eq!(
            run.result(ProbeKind::PackageBundle).unwrap().as_ref().unwrap_err().message,
            "brew broke"
        );
        assert!(run.result(ProbeKind::StoreApps).unwrap().is_ok());
    }

    #[test]
    fn mismatched_output_kind_is_error() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes = vec![mock(ProbeKind::Fonts, Ok(store_apps(&[])))];
        let run = run_all(&probes, &env.ctx);
        let err = run.result(ProbeKind::Fonts).unwrap().as_ref().unwrap_err();
        assert!(err.message.contains("store_apps"), "{err}");
    }

    #[test]
    fn duplicate_kind_keeps_first() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes = vec![
            mock(ProbeKind::StoreApps, Ok(store_apps(&[("1", "First")]))),
            mock(ProbeKind::StoreApps, Ok(store_apps(&[("2", "Second")]))),
        ];
        let run = run_all(&probes, &env.ctx);
        let Ok(ProbeOutput::StoreApps(scan)) = run.result(ProbeKind::StoreApps).unwrap() else {
            panic!("store apps missing");
        };
        assert_eq!(scan.apps[0].name, "First");
    }

    #[test]
    fn parallel_run_matches_sequential_semantics() {
        let env = TestEnv::new(FakeExecutor::new());
        let probes: Vec<Box<dyn Probe>> = vec![
            mock(ProbeKind::StoreApps, Ok(store_apps(&[("1", "A")]))),
            Box::new(PanickingProbe),
            mock(ProbeKind::Fonts, Ok(ProbeOutput::Fonts(FontsScan::default()))),
        ];
        let run = run_all_parallel(&probes, &env.ctx, &env.log);
        assert_eq!(run.results.len(), 3);
        assert!(run.result(ProbeKind::Environment).unwrap().is_err());
        assert_eq!(env.log.step_entries().len(), 3);
    }

    #[test]
    fn info_records_versions() {
        let env = TestEnv::new(FakeExecutor::new().with_response("sw_vers", true, "14.4.1\n"));
        let run = run_all(&[], &env.ctx);
        assert_eq!(run.info.macos_version, "14.4.1");
        assert_eq!(run.info.macbac_version, VERSION);
        assert!(run.info.date.contains('T'));
    }

    #[test]
    fn backup_dir_name_and_collision_suffix() {
        let root = tempfile::tempdir().unwrap();
        let at = chrono::Local::now();
        let first = create_backup_dir(root.path(), &at).unwrap();
        let second = create_backup_dir(root.path(), &at).unwrap();
        let third = create_backup_dir(root.path(), &at).unwrap();

        let expected = format!("macbac_backup_{}", at.format("%Y%m%d_%H%M%S"));
        assert_eq!(first.file_name().unwrap().to_string_lossy(), expected);
        assert_eq!(
            second.file_name().unwrap().to_string_lossy(),
            format!("{expected}_2")
        );
        assert_eq!(
            third.file_name().unwrap().to_string_lossy(),
            format!("{expected}_3")
        );
        assert!(first.is_dir() && second.is_dir() && third.is_dir());
    }

    #[test]
    fn backup_dir_creates_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested/backups");
        let dir = create_backup_dir(&root, &chrono::Local::now()).unwrap();
        assert!(dir.starts_with(&root));
    }
}
