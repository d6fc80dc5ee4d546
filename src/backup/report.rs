//! Human-readable `inventory.md`.
use std::fmt::Write as _;

use chrono::{DateTime, Local};

use super::BackupRun;
use crate::error::ProbeError;
use crate::probes::{
    BundleScan, EnvironmentScan, FontsScan, ManualAppsScan, ProbeKind, ProbeOutput, StoreAppsScan,
};

/// File name of the report inside a backup directory.
pub const REPORT_FILE: &str = "inventory.md";

const SEPARATOR: &str = "\n---\n\n";

/// Render the Markdown inventory for a run.
///
/// Sections always appear in the same order.  A failed probe renders its
/// error in place of the section body; a probe that was never run renders
/// as empty.
#[must_use]
pub fn build_report(run: &BackupRun) -> String {
    let mut out = String::new();
    write_header(&mut out, &run.started_at, &run.info.macos_version);

    for (index, kind) in ProbeKind::ALL.iter().enumerate() {
        out.push_str(section_title(*kind));
        out.push_str("\n\n");
        match run.result(*kind) {
            Some(Err(e)) => write_error(&mut out, e),
            Some(Ok(output)) => write_body(&mut out, output),
            None => out.push_str(empty_message(*kind)),
        }
        if index + 1 < ProbeKind::ALL.len() {
            out.push_str(SEPARATOR);
        }
    }
    out
}

fn write_header(out: &mut String, started_at: &DateTime<Local>, macos_version: &str) {
    out.push_str("# macbac Backup Inventory\n\n");
    let _ = writeln!(
        out,
        "- **Backup Date:** {}",
        started_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "- **macOS Version:** {macos_version}");
    out.push_str(SEPARATOR);
}

const fn section_title(kind: ProbeKind) -> &'static str {
    match kind {
        ProbeKind::StoreApps => "## 🍎 App Store & Sandboxed Applications",
        ProbeKind::PackageBundle => "## 🍺 Homebrew Ecosystem (Brewfile)",
        ProbeKind::Environment => "## 🛠️ Development Environment & Toolchain",
        ProbeKind::Fonts => "## ✍️ Custom Fonts",
        ProbeKind::ManualApps => "## 📦 Manually Installed Applications",
    }
}

const fn empty_message(kind: ProbeKind) -> &'static str {
    match kind {
        ProbeKind::StoreApps => "No App Store applications found.\n",
        ProbeKind::PackageBundle => "No Homebrew packages found.\n",
        ProbeKind::Environment => "No development tools detected.\n",
        ProbeKind::Fonts => "No custom fonts found.\n",
        ProbeKind::ManualApps => "No manually installed applications found.\n",
    }
}

fn write_error(out: &mut String, e: &ProbeError) {
    let _ = writeln!(out, "❌ Error: {e}");
}

fn write_body(out: &mut String, output: &ProbeOutput) {
    if let Some(warning) = output.warning() {
        let _ = writeln!(out, "⚠️ {warning}\n");
    }
    match output {
        ProbeOutput::StoreApps(scan) => write_store_apps(out, scan),
        ProbeOutput::PackageBundle(scan) => write_bundle(out, scan),
        ProbeOutput::Environment(scan) => write_environment(out, scan),
        ProbeOutput::Fonts(scan) => write_fonts(out, scan),
        ProbeOutput::ManualApps(scan) => write_manual_apps(out, scan),
    }
}

fn write_store_apps(out: &mut String, scan: &StoreAppsScan) {
    if scan.apps.is_empty() {
        out.push_str(empty_message(ProbeKind::StoreApps));
        return;
    }
    out.push_str("| ID | Name |\n|----|------|\n");
    for app in &scan.apps {
        let _ = writeln!(out, "| {} | {} |", app.id, app.name);
    }
}

fn write_bundle(out: &mut String, scan: &BundleScan) {
    if scan.text.is_empty() {
        out.push_str(empty_message(ProbeKind::PackageBundle));
        return;
    }
    let _ = writeln!(out, "```brewfile\n{}\n```", scan.text);
}

fn write_environment(out: &mut String, scan: &EnvironmentScan) {
    if !scan.config_files.is_empty() {
        let _ = writeln!(
            out,
            "### Config files ({}/{} found)\n",
            scan.config_files.len(),
            scan.total_checked
        );
        for file in &scan.config_files {
            let _ = writeln!(out, "- `{}` - {}", file.name, file.description);
        }
        out.push('\n');
    }

    if scan.tools.is_empty() {
        out.push_str(empty_message(ProbeKind::Environment));
        return;
    }
    out.push_str("### Installed tools\n\n");
    for tool in &scan.tools {
        match &tool.version {
            Some(version) => {
                let _ = writeln!(out, "- **{}** - {} ({version})", tool.name, tool.description);
            }
            None => {
                let _ = writeln!(out, "- **{}** - {}", tool.name, tool.description);
            }
        }
    }
}

fn write_fonts(out: &mut String, scan: &FontsScan) {
    if scan.fonts.is_empty() {
        out.push_str(empty_message(ProbeKind::Fonts));
        return;
    }
    for font in &scan.fonts {
        let _ = writeln!(out, "- `{}`", font.name);
    }
}

fn write_manual_apps(out: &mut String, scan: &ManualAppsScan) {
    if scan.apps.is_empty() {
        out.push_str(empty_message(ProbeKind::ManualApps));
        return;
    }
    out.push_str("| Application Name | Path |\n|------------------|------|\n");
    for app in &scan.apps {
        let _ = writeln!(out, "| {} | {} |", app.name, app.path.display());
    }
}
