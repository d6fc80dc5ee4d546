use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::CommandSetup;
use crate::backup::report::REPORT_FILE;
use crate::backup::{
    VERSION, build_manifest, build_report, create_backup_dir, materialize, run_all,
    run_all_parallel, write_manifest,
};
use crate::cli::{BackupOpts, GlobalOpts};
use crate::context::Context;
use crate::exec::SystemExecutor;
use crate::logging::Logger;
use crate::probes::{self, Probe};

/// Run the backup command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, the backup directory
/// cannot be created, or the manifest cannot be written.  Individual probe
/// failures are reported in the summary and do not fail the command.
pub fn run(global: &GlobalOpts, opts: &BackupOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("macbac {VERSION}"));
    let setup = CommandSetup::init(global, log)?;
    let ctx = setup.into_context(log, Arc::new(SystemExecutor), global.parallel);

    let output_root = opts
        .output
        .clone()
        .unwrap_or_else(|| ctx.expand(&ctx.config.backup.output));

    execute(&probes::all_probes(), &ctx, log, &output_root)?;
    Ok(())
}

/// Scan with `probes` and write a new backup directory under `output_root`.
///
/// Returns the path of the backup directory.
///
/// # Errors
///
/// Returns an error if the backup directory cannot be created or the
/// manifest cannot be written.
pub fn execute(
    probes: &[Box<dyn Probe>],
    ctx: &Context,
    log: &Arc<Logger>,
    output_root: &Path,
) -> Result<PathBuf> {
    let run = if ctx.parallel {
        run_all_parallel(probes, ctx, log)
    } else {
        run_all(probes, ctx)
    };

    log.stage("Writing backup");
    let dir = create_backup_dir(output_root, &run.started_at).with_context(|| {
        format!(
            "failed to create backup directory under {}",
            output_root.display()
        )
    })?;
    log.info(&format!("backup directory: {}", dir.display()));

    let stats = materialize(&run, &dir);
    for warning in &stats.warnings {
        log.warn(warning);
    }
    log.info(&format!(
        "copied {} fonts, {} config files",
        stats.fonts_copied, stats.configs_copied
    ));

    let manifest_path = write_manifest(&build_manifest(&run), &dir)?;
    log.debug(&format!("wrote {}", manifest_path.display()));

    let report_path = dir.join(REPORT_FILE);
    if let Err(e) = std::fs::write(&report_path, build_report(&run)) {
        log.warn(&format!("failed to write {}: {e}", report_path.display()));
    }

    log.print_summary();
    let failed = run.failed_kinds();
    if !failed.is_empty() {
        log.warn(&format!(
            "{} probe(s) failed; their sections are empty in the backup",
            failed.len()
        ));
    }
    log.info(&format!("backup complete: {}", dir.display()));
    Ok(dir)
}
