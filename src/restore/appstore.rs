use super::{RestoreEngine, RestoreStats, RestoreStatus};
use crate::context::Context;
use crate::probes::appstore::UNKNOWN_ID;

const MAS_REMEDIATION: &str = "brew install mas";

impl RestoreEngine {
    /// Reinstall App Store apps with `mas install <id>`.
    ///
    /// Apps recorded without an id are skipped.  An install that fails is
    /// counted and the remaining apps are still attempted.
    pub fn restore_store_apps(&self, ctx: &Context) -> RestoreStatus {
        let apps = &self.manifest.store_apps;
        if apps.is_empty() {
            return RestoreStatus::Completed(RestoreStats::notice(
                "No App Store applications found in backup",
            ));
        }
        if !ctx.executor.which("mas") {
            return RestoreStatus::aborted("mas-cli is not installed", Some(MAS_REMEDIATION));
        }

        ctx.log
            .info(&format!("installing {} App Store apps", apps.len()));
        let mut stats = RestoreStats::default();
        for app in apps {
            if app.id.is_empty() || app.id == UNKNOWN_ID {
                ctx.log
                    .warn(&format!("skipped {}: no App Store id recorded", app.name));
                stats.skipped += 1;
                continue;
            }
            match ctx.executor.run("mas", &["install", &app.id]) {
                Ok(_) => {
                    ctx.log.info(&format!("installed: {}", app.name));
                    stats.restored += 1;
                }
                Err(e) => {
                    ctx.log
                        .error(&format!("failed to install {}: {e}", app.name));
                    stats.fail(&app.name, e.to_string());
                }
            }
        }
        RestoreStatus::Completed(stats)
    }
}
