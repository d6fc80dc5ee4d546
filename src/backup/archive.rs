//! Copy font and config payloads into a backup directory.
use std::collections::HashSet;
use std::path::Path;

use super::BackupRun;
use crate::fs::{copy_into, is_contained};
use crate::probes::ProbeOutput;

/// Payload directory for font files.
pub const FONTS_DIR: &str = "fonts";

/// Payload directory for config files.
pub const CONFIGS_DIR: &str = "configs";

/// What [`materialize`] copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    /// Font files copied into `fonts/`.
    pub fonts_copied: usize,
    /// Config files copied into `configs/`.
    pub configs_copied: usize,
    /// Files that were skipped, one message each.
    pub warnings: Vec<String>,
}

/// Copy every font and home-relative config file found by the run into
/// `dest`.
///
/// Sources are copied with their modification time.  A source that has
/// disappeared since the scan, a font whose file name was already copied,
/// or a copy that fails is skipped and recorded as a warning; nothing here
/// aborts the backup.
pub fn materialize(run: &BackupRun, dest: &Path) -> MaterializeStats {
    let mut stats = MaterializeStats::default();

    for output in run.outputs() {
        match output {
            ProbeOutput::Fonts(scan) => {
                let mut seen = HashSet::new();
                for font in &scan.fonts {
                    if !seen.insert(font.name.as_str()) {
                        stats.warnings.push(format!(
                            "duplicate font name {} at {}, keeping the first",
                            font.name,
                            font.path.display()
                        ));
                        continue;
                    }
                    let target = dest.join(FONTS_DIR).join(&font.name);
                    if copy_one(&font.path, &target, &mut stats.warnings) {
                        stats.fonts_copied += 1;
                    }
                }
            }
            ProbeOutput::Environment(scan) => {
                for file in &scan.config_files {
                    let Some(relative) = file.relative.as_deref() else {
                        continue;
                    };
                    if !is_contained(relative) {
                        stats.warnings.push(format!(
                            "refusing to archive {}: path escapes the backup",
                            relative.display()
                        ));
                        continue;
                    }
                    let target = dest.join(CONFIGS_DIR).join(relative);
                    if copy_one(&file.source, &target, &mut stats.warnings) {
                        stats.configs_copied += 1;
                    }
                }
            }
            ProbeOutput::StoreApps(_) | ProbeOutput::PackageBundle(_) | ProbeOutput::ManualApps(_) => {}
        }
    }

    stats
}

fn copy_one(src: &Path, dst: &Path, warnings: &mut Vec<String>) -> bool {
    if !src.is_file() {
        warnings.push(format!("{} no longer exists, skipped", src.display()));
        return false;
    }
    match copy_into(src, dst) {
        Ok(_) => true,
        Err(e) => {
            warnings.push(format!("failed to copy {}: {e}", src.display()));
            false
        }
    }
}
