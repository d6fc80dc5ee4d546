//! Filesystem helpers shared by the archiver and restore engine.
use std::fs::{self, FileTimes};
use std::io;
use std::path::{Path, PathBuf};

/// Copy `src` to `dst`, carrying over the modification time.
///
/// Returns the number of bytes copied.
///
/// # Errors
///
/// Returns an error if the copy fails or the timestamp cannot be applied.
pub fn copy_preserving_mtime(src: &Path, dst: &Path) -> io::Result<u64> {
    let bytes = fs::copy(src, dst)?;
    let modified = fs::metadata(src)?.modified()?;
    let file = fs::OpenOptions::new().write(true).open(dst)?;
    file.set_times(FileTimes::new().set_modified(modified))?;
    Ok(bytes)
}

/// Copy `src` to `dst`, creating `dst`'s parent directories first.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or the copy fails.
pub fn copy_into(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    copy_preserving_mtime(src, dst)
}

/// Express `path` relative to `home`, if it lies beneath it.
#[must_use]
pub fn home_relative(path: &Path, home: &Path) -> Option<PathBuf> {
    path.strip_prefix(home)
        .ok()
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Whether `rel` is a plain relative path that cannot escape its base
/// directory (no root, no `..`).
#[must_use]
pub fn is_contained(rel: &Path) -> bool {
    use std::path::Component;
    !rel.as_os_str().is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Canonical form of `path`, without the `\\?\` prefix on Windows.
///
/// Falls back to `path` itself when it cannot be resolved.
#[must_use]
pub fn resolve(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
