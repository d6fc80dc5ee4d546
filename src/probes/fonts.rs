use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Probe, ProbeKind, ProbeOutput};
use crate::context::Context;
use crate::error::ProbeError;

/// Recognised font extensions (lowercase, with dot) and their kind.
pub const FONT_EXTENSIONS: [(&str, &str); 13] = [
    (".ttf", "TrueType Font"),
    (".otf", "OpenType Font"),
    (".ttc", "TrueType Collection"),
    (".otc", "OpenType Collection"),
    (".woff", "Web Open Font Format"),
    (".woff2", "Web Open Font Format 2"),
    (".eot", "Embedded OpenType"),
    (".pfb", "PostScript Type 1"),
    (".pfm", "PostScript Type 1 Metrics"),
    (".afm", "Adobe Font Metrics"),
    (".bdf", "Bitmap Distribution Format"),
    (".pcf", "Portable Compiled Format"),
    (".snf", "Server Normal Format"),
];

/// A font file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFile {
    /// File name.
    pub name: String,
    /// Full path.
    pub path: PathBuf,
    /// Lowercase extension including the dot.
    pub extension: String,
    /// Font kind derived from the extension.
    pub kind: String,
    /// File size at scan time.
    pub size_bytes: u64,
}

/// A directory a probe looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDir {
    /// Directory path.
    pub path: PathBuf,
    /// Whether it existed.
    pub found: bool,
}

impl std::fmt::Display for ScannedDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.found {
            write!(f, "{}", self.path.display())
        } else {
            write!(f, "{} (not found)", self.path.display())
        }
    }
}

/// Output of [`ScanFonts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontsScan {
    /// Font files, in walk order per directory.
    pub fonts: Vec<FontFile>,
    /// Directories scanned.
    pub scanned_dirs: Vec<ScannedDir>,
    /// Sum of font sizes.
    pub total_size: u64,
    /// Font file names grouped by kind.
    pub by_kind: BTreeMap<String, Vec<String>>,
}

/// Find user-installed font files.
#[derive(Debug)]
pub struct ScanFonts;

impl Probe for ScanFonts {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Fonts
    }

    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
        let mut scan = FontsScan::default();

        for dir in ctx.font_dirs() {
            let found = dir.is_dir();
            if found {
                scan.fonts.extend(scan_directory(&dir));
            }
            scan.scanned_dirs.push(ScannedDir { path: dir, found });
        }

        scan.total_size = scan.fonts.iter().map(|f| f.size_bytes).sum();
        for font in &scan.fonts {
            scan.by_kind
                .entry(font.kind.clone())
                .or_default()
                .push(font.name.clone());
        }

        ctx.log.info(&format!(
            "{} fonts ({} KiB)",
            scan.fonts.len(),
            scan.total_size / 1024
        ));
        Ok(ProbeOutput::Fonts(scan))
    }
}

/// Kind for a lowercase dotted extension, if it is a font.
fn font_kind(extension: &str) -> Option<&'static str> {
    FONT_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, kind)| *kind)
}

/// Recursively collect font files under `dir`, skipping unreadable entries.
fn scan_directory(dir: &Path) -> Vec<FontFile> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let extension = entry
                .path()
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))?;
            let kind = font_kind(&extension)?;
            let size_bytes = entry.metadata().ok()?.len();
            Some(FontFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_path_buf(),
                extension,
                kind: kind.to_string(),
                size_bytes,
            })
        })
        .collect()
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
    use crate::test_helpers::{FakeExecutor, TestEnv};

    fn scan(env: &TestEnv) -> FontsScan {
        match ScanFonts.scan(&env.ctx).unwrap() {
            ProbeOutput::Fonts(s) => s,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn finds_fonts_recursively_case_insensitive() {
        let env = TestEnv::new(FakeExecutor::new());
        env.write("Library/Fonts/A.ttf", "aaaa");
        env.write("Library/Fonts/nested/B.OTF", "bb");
        env.write("Library/Fonts/readme.txt", "not a font");

        let scan = scan(&env);
        let names: Vec<&str> = scan.fonts.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A.ttf", "B.OTF"]);
        assert_eq!(scan.fonts[1].extension, ".otf");
        assert_eq!(scan.fonts[1].kind, "OpenType Font");
        assert_eq!(scan.total_size, 6);
        assert_eq!(scan.by_kind["TrueType Font"], vec!["A.ttf"]);
        assert!(scan.scanned_dirs[0].found);
    }

    #[test]
    fn missing_directory_is_not_found() {
        let env = TestEnv::new(FakeExecutor::new());
        let scan = scan(&env);
        assert!(scan.fonts.is_empty());
        assert_eq!(scan.scanned_dirs.len(), 1);
        assert!(scan.scanned_dirs[0].to_string().ends_with("(not found)"));
    }

    #[test]
    fn every_extension_has_a_kind() {
        assert_eq!(font_kind(".woff2"), Some("Web Open Font Format 2"));
        assert_eq!(font_kind(".txt"), None);
    }
}
