//! Crash-safe whole-file writes.
//!
//! Sequence: temp file in the target directory → exclusive lock → write →
//! fsync → close → rename over the target → fsync the directory.
//! A reader of the target path sees either the old file or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use uuid::Uuid;

use crate::cache::CacheError;

/// Replace `path` with `data` atomically. Blocking.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let (dir, name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir, name),
        _ => return Err(CacheError::InvalidPath(path.display().to_string())),
    };

    fs::create_dir_all(dir).map_err(|e| CacheError::io("create directory", dir, e))?;

    let temp = dir.join(format!(
        ".{}.{}.tmp",
        name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    replace(&temp, path, data)?;
    sync_dir(dir)
}

/// Write `data` to `temp`, then rename it over `path`.
fn replace(temp: &Path, path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let result = write_temp(temp, data)
        .and_then(|()| fs::rename(temp, path).map_err(|e| CacheError::io("rename", path, e)));
    if result.is_err() {
        let _ = fs::remove_file(temp);
    }
    result
}

fn write_temp(temp: &Path, data: &[u8]) -> Result<(), CacheError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)
        .map_err(|e| CacheError::io("create temp file", temp, e))?;

    file.lock_exclusive()
        .map_err(|e| CacheError::io("lock", temp, e))?;
    file.write_all(data)
        .map_err(|e| CacheError::io("write", temp, e))?;
    file.sync_all()
        .map_err(|e| CacheError::io("sync", temp, e))?;

    // Closing releases the lock.
    drop(file);
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), CacheError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| CacheError::io("sync directory", dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), CacheError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_write_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("main.site/a/b/c.js");

        write_atomic(&target, b"console.log(1)").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"console.log(1)");
        assert!(temp_files(target.parent().unwrap()).is_empty());
    }

    #[test]
    fn test_overwrite_replaces_whole_file() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("index.html");

        write_atomic(&target, &vec![b'x'; 4096]).unwrap();
        write_atomic(&target, b"short").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"short");
    }

    #[test]
    fn test_empty_and_large_bodies() {
        let root = tempfile::tempdir().unwrap();
        let empty = root.path().join("empty.bin");
        let large = root.path().join("large.bin");
        let payload: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

        write_atomic(&empty, b"").unwrap();
        write_atomic(&large, &payload).unwrap();

        assert!(fs::read(&empty).unwrap().is_empty());
        assert_eq!(fs::read(&large).unwrap(), payload);
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), b"keep").unwrap();

        let err = write_atomic(&target, b"new").unwrap_err();

        assert!(matches!(err, CacheError::Io { stage: "rename", .. }));
        assert!(temp_files(root.path()).is_empty());
        assert_eq!(fs::read(target.join("inner")).unwrap(), b"keep");
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("app.css");
        write_atomic(&target, b"first").unwrap();

        // A directory squatting on the temp name makes the write fail early.
        let temp = root.path().join(".app.css.blocked.tmp");
        fs::create_dir(&temp).unwrap();
        let err = replace(&temp, &target, b"second").unwrap_err();

        assert!(matches!(err, CacheError::Io { stage: "create temp file", .. }));
        assert_eq!(fs::read(&target).unwrap(), b"first");
    }
}
