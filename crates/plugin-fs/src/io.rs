//! Atomic I/O operations with file locking

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result};

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename so readers never observe a partial file.
/// The temp file lives in the same directory to keep the rename on one
/// filesystem.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
    drop(temp_file);

    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Read text content, returning `None` when the file does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Path of the advisory lock file guarding `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.lock"))
}

fn open_lock(path: &Path) -> Result<File> {
    let lock = lock_path(path);
    if let Some(parent) = lock.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock)
        .map_err(|e| Error::io(&lock, e))
}

/// Read a file under a shared lock.
///
/// Returns `None` when the file does not exist yet.
pub fn read_locked(path: &Path) -> Result<Option<String>> {
    let lock = open_lock(path)?;
    lock.lock_shared().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    let content = match File::open(path) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)
                .map_err(|e| Error::io(path, e))?;
            Some(content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(path, e)),
    };

    // Lock released when `lock` is dropped
    Ok(content)
}

/// Read-modify-write a file under an exclusive lock.
///
/// `apply` receives the current content (`None` if the file is missing) and
/// returns the new content, or `None` to leave the file untouched. The
/// closure's output value is passed back to the caller.
pub fn update_locked<T, E, F>(path: &Path, apply: F) -> std::result::Result<T, E>
where
    E: From<Error>,
    F: FnOnce(Option<String>) -> std::result::Result<(Option<String>, T), E>,
{
    let lock = open_lock(path)?;
    lock.lock_exclusive().map_err(|_| Error::LockFailed {
        path: path.to_path_buf(),
    })?;

    let current = read_optional(path)?;
    let (next, output) = apply(current)?;
    if let Some(next) = next {
        write_atomic(path, next.as_bytes())?;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_is_sibling() {
        let path = Path::new("/data/store/plugins.json");
        assert_eq!(lock_path(path), PathBuf::from("/data/store/plugins.json.lock"));
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");

        write_atomic(&path, b"[]").unwrap();

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn update_locked_skips_write_when_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");

        let seen: Option<String> =
            update_locked::<_, Error, _>(&path, |current| Ok((None, current))).unwrap();

        assert!(seen.is_none());
        assert!(!path.exists());
    }
}
