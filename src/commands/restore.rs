use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::cli::{GlobalOpts, RestoreOpts, RestoreTarget};
use crate::context::Context;
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger, StepStatus};
use crate::restore::{RestoreCategory, RestoreEngine, RestoreStatus};

/// Run the restore command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded, or if any selected
/// category was aborted or had failed items.
pub fn run(global: &GlobalOpts, opts: &RestoreOpts, log: &Arc<Logger>) -> Result<()> {
    let mut setup = CommandSetup::init(global, log)?;
    if let Some(secs) = opts.timeout {
        setup.config.restore.bundle_timeout_secs = Some(secs);
    }
    let ctx = setup.into_context(log, Arc::new(SystemExecutor), global.parallel);

    let engine = RestoreEngine::open(&opts.source)
        .with_context(|| format!("cannot restore from {}", opts.source.display()))?;
    execute(&engine, opts.category, &ctx, log)
}

/// Run `target` against an opened backup.
///
/// Every selected category runs even if an earlier one aborted.
///
/// # Errors
///
/// Returns an error naming the categories that aborted or had failed items.
pub fn execute(
    engine: &RestoreEngine,
    target: RestoreTarget,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    if target == RestoreTarget::Summary {
        log.stage("Backup summary");
        for line in engine.summary().render() {
            log.info(&line);
        }
        return Ok(());
    }

    let mut failed = Vec::new();
    for category in target.categories() {
        let status = engine.restore(category, ctx);
        record(category, &status, ctx.log.as_ref());
        if status.is_failure() {
            failed.push(category.label());
        }
    }

    log.print_summary();
    if !failed.is_empty() {
        anyhow::bail!("restore failed for: {}", failed.join(", "));
    }
    Ok(())
}

/// Record a category outcome as a summary step.
///
/// Per-item failures were already logged by the engine as they happened.
fn record(category: RestoreCategory, status: &RestoreStatus, log: &dyn Log) {
    let name = category.label();
    match status {
        RestoreStatus::Completed(stats) => {
            if let Some(notice) = &stats.notice {
                log.info(notice);
                log.record_step(name, StepStatus::Skipped, Some(notice));
                return;
            }
            let step = match (stats.failed, stats.restored + stats.skipped) {
                (0, _) => StepStatus::Ok,
                (_, 0) => StepStatus::Failed,
                _ => StepStatus::Partial,
            };
            log.record_step(name, step, Some(&stats.summary()));
        }
        RestoreStatus::Aborted(abort) => {
            log.error(&abort.reason);
            if let Some(fix) = &abort.remediation {
                log.info(&format!("to fix: {fix}"));
            }
            log.record_step(name, StepStatus::Failed, Some(&abort.reason));
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backup::manifest::{Manifest, ManifestStoreApp};
    use crate::restore::tests::engine_with;
    use crate::test_helpers::{FakeExecutor, TestEnv};

    fn manifest_with_app_and_font() -> Manifest {
        Manifest {
            store_apps: vec![ManifestStoreApp {
                id: "497799835".to_string(),
                name: "Xcode".to_string(),
            }],
            fonts: vec!["A.ttf".to_string()],
            ..Manifest::default()
        }
    }

    #[test]
    fn all_continues_past_abort_then_fails() {
        let env = TestEnv::new(FakeExecutor::new());
        let (engine, dir) = engine_with(&manifest_with_app_and_font());
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join("fonts/A.ttf"), "a").unwrap();

        let err = execute(&engine, RestoreTarget::All, &env.ctx, &env.log).unwrap_err();
        assert!(err.to_string().contains("App Store apps"), "{err}");
        assert!(env.path("Library/Fonts/A.ttf").is_file(), "fonts still restored");

        let steps = env.log.step_entries();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].status, StepStatus::Failed);
        assert_eq!(steps[1].status, StepStatus::Skipped);
        assert_eq!(steps[2].status, StepStatus::Ok);
    }

    #[test]
    fn summary_touches_nothing() {
        let env = TestEnv::new(FakeExecutor::new().with_tool("mas"));
        let (engine, _dir) = engine_with(&manifest_with_app_and_font());
        execute(&engine, RestoreTarget::Summary, &env.ctx, &env.log).unwrap();
        assert_eq!(env.executor.call_count(), 0);
        assert!(env.log.step_entries().is_empty());
    }

    #[test]
    fn single_category_success() {
        let env = TestEnv::new(FakeExecutor::new().with_tool("mas"));
        let (engine, _dir) = engine_with(&manifest_with_app_and_font());
        execute(&engine, RestoreTarget::Appstore, &env.ctx, &env.log).unwrap();
        assert_eq!(env.executor.calls_to("mas"), vec![vec!["install", "497799835"]]);
    }

    #[test]
    fn item_failure_logged_once() {
        let (log, _tmp, _guard) = crate::logging::isolated_logger();
        let log = Arc::new(log);
        let env = TestEnv::new(FakeExecutor::new().with_output("mas", false, "", "not purchased"));
        let ctx = env.ctx.with_log(Arc::clone(&log) as Arc<dyn Log>);
        let (engine, _dir) = engine_with(&manifest_with_app_and_font());

        assert!(execute(&engine, RestoreTarget::Appstore, &ctx, &log).is_err());
        let contents = std::fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert_eq!(contents.matches("not purchased").count(), 1, "{contents}");
    }

    #[test]
    fn failed_items_fail_the_command() {
        let env = TestEnv::new(FakeExecutor::new().with_output("mas", false, "", "nope"));
        let (engine, _dir) = engine_with(&manifest_with_app_and_font());
        assert!(execute(&engine, RestoreTarget::Appstore, &env.ctx, &env.log).is_err());
        assert_eq!(env.log.step_entries()[0].status, StepStatus::Failed);
    }
}
