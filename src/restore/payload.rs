use std::path::Path;

use super::{RestoreEngine, RestoreStats, RestoreStatus};
use crate::backup::archive::{CONFIGS_DIR, FONTS_DIR};
use crate::context::Context;
use crate::fs::{copy_into, is_contained};
use crate::logging::Log;

impl RestoreEngine {
    /// Copy backed-up fonts into the configured fonts directory.
    ///
    /// Existing fonts are never overwritten, so running this twice is safe.
    pub fn restore_fonts(&self, ctx: &Context) -> RestoreStatus {
        let fonts = &self.manifest.fonts;
        if fonts.is_empty() {
            return RestoreStatus::Completed(RestoreStats::notice(
                "No custom fonts found in backup",
            ));
        }
        let payload = self.source.join(FONTS_DIR);
        if !payload.is_dir() {
            return RestoreStatus::aborted(
                format!("Fonts backup directory not found: {}", payload.display()),
                Some("the backup is incomplete; run macbac backup again"),
            );
        }
        let dest = ctx.restore_fonts_dir();
        if let Err(e) = std::fs::create_dir_all(&dest) {
            return RestoreStatus::aborted(
                format!("cannot create {}: {e}", dest.display()),
                None,
            );
        }

        ctx.log.info(&format!(
            "restoring {} fonts to {}",
            fonts.len(),
            dest.display()
        ));
        RestoreStatus::Completed(copy_payload(fonts, &payload, &dest, ctx.log.as_ref()))
    }

    /// Copy backed-up config files back to their home-relative locations.
    ///
    /// Same policy as [`restore_fonts`](Self::restore_fonts); parent
    /// directories are created as needed.
    pub fn restore_config_files(&self, ctx: &Context) -> RestoreStatus {
        let files = &self.manifest.config_files;
        if files.is_empty() {
            return RestoreStatus::Completed(RestoreStats::notice(
                "No config files found in backup",
            ));
        }
        let payload = self.source.join(CONFIGS_DIR);
        if !payload.is_dir() {
            return RestoreStatus::aborted(
                format!("Configs backup directory not found: {}", payload.display()),
                Some("the backup is incomplete; run macbac backup again"),
            );
        }

        ctx.log.info(&format!(
            "restoring {} config files to {}",
            files.len(),
            ctx.home.display()
        ));
        RestoreStatus::Completed(copy_payload(files, &payload, &ctx.home, ctx.log.as_ref()))
    }
}

/// Copy each named entry from `payload` to `dest`, skipping entries that
/// already exist at the destination.
fn copy_payload(names: &[String], payload: &Path, dest: &Path, log: &dyn Log) -> RestoreStats {
    let mut stats = RestoreStats::default();
    for name in names {
        let rel = Path::new(name);
        if !is_contained(rel) {
            log.error(&format!("refusing to restore {name}: path escapes the target"));
            stats.fail(name, "path escapes the target directory");
            continue;
        }
        let source = payload.join(rel);
        let target = dest.join(rel);

        if !source.is_file() {
            log.error(&format!("file not found in backup: {name}"));
            stats.fail(name, "missing from backup");
            continue;
        }
        if target.exists() {
            log.debug(&format!("skipped (already exists): {name}"));
            stats.skipped += 1;
            continue;
        }
        match copy_into(&source, &target) {
            Ok(_) => {
                log.debug(&format!("copied: {name}"));
                stats.restored += 1;
            }
            Err(e) => {
                log.error(&format!("failed to copy {name}: {e}"));
                stats.fail(name, e.to_string());
            }
        }
    }
    log.info(&stats.summary());
    stats
}
