use std::io::Write;

use tempfile::NamedTempFile;

use super::{RestoreEngine, RestoreStats, RestoreStatus};
use crate::context::Context;
use crate::error::ToolError;

const BREW_REMEDIATION: &str = r#"/bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)""#;

/// Item name used in stats for the single bundle apply.
const BUNDLE_ITEM: &str = "Brewfile";

impl RestoreEngine {
    /// Apply the captured Brewfile with `brew bundle --file <tmp>`.
    ///
    /// The bundle text is written to a temporary `.Brewfile` which is removed
    /// when this function returns, whatever the outcome.
    pub fn restore_package_bundle(&self, ctx: &Context) -> RestoreStatus {
        let text = &self.manifest.package_bundle.raw_bundle_text;
        if text.trim().is_empty() {
            return RestoreStatus::Completed(RestoreStats::notice(
                "No Homebrew data found in backup",
            ));
        }
        if !ctx.executor.which("brew") {
            return RestoreStatus::aborted("Homebrew is not installed", Some(BREW_REMEDIATION));
        }

        let mut stats = RestoreStats::default();
        let brewfile = match write_brewfile(text) {
            Ok(file) => file,
            Err(e) => {
                let reason = format!("failed to write temporary Brewfile: {e}");
                ctx.log.error(&reason);
                stats.fail(BUNDLE_ITEM, reason);
                return RestoreStatus::Completed(stats);
            }
        };
        let path = brewfile.path().to_string_lossy().into_owned();
        ctx.log.debug(&format!("temporary Brewfile: {path}"));
        ctx.log.info("running brew bundle");

        let outcome = ctx
            .executor
            .run_with_timeout("brew", &["bundle", "--file", &path], ctx.bundle_timeout())
            .and_then(|result| result.check("brew"));
        match outcome {
            Ok(_) => {
                ctx.log.info("Homebrew restoration completed");
                stats.restored = 1;
            }
            Err(ToolError::Failed { stderr, .. }) => {
                ctx.log.error("Homebrew restoration failed");
                for line in stderr.lines() {
                    ctx.log.error(&format!("  {line}"));
                }
                stats.fail(BUNDLE_ITEM, stderr);
            }
            Err(e) => {
                ctx.log.error(&format!("Homebrew restoration failed: {e}"));
                stats.fail(BUNDLE_ITEM, e.to_string());
            }
        }
        RestoreStatus::Completed(stats)
    }
}

fn write_brewfile(text: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("macbac-")
        .suffix(".Brewfile")
        .tempfile()?;
    file.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.flush()?;
    Ok(file)
}
