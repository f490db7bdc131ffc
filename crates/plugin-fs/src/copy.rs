//! Recursive directory copy for durable plugin source caches

use std::fs;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// Directories never carried into a cached copy.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Copy the directory tree at `src` to `dest`, replacing whatever was there.
///
/// The tree is first copied into a staging sibling of `dest` and only swapped
/// in once complete, so an interrupted copy never leaves a half-written
/// cache behind. Returns the number of files copied.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    if !src.is_dir() {
        return Err(Error::SourceNotFound {
            path: src.to_path_buf(),
        });
    }

    let staging_name = format!(
        ".{}.{}.staging",
        dest.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let staging = dest.with_file_name(staging_name);
    if staging.exists() {
        remove_dir(&staging)?;
    }

    let mut copied = 0;
    for entry in WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            Error::io(path, std::io::Error::other(e.to_string()))
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = staging.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(entry.path(), e))?;
            copied += 1;
        }
    }

    if dest.exists() {
        remove_dir(dest)?;
    }
    fs::rename(&staging, dest).map_err(|e| Error::io(dest, e))?;

    tracing::debug!(src = %src.display(), dest = %dest.display(), files = copied, "Copied directory");
    Ok(copied)
}

/// Remove a directory tree. Missing directories are not an error.
pub fn remove_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Move the directory at `from` to `to`. `to` must not exist.
pub fn move_dir(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::rename(from, to).map_err(|e| Error::io(from, e))
}
