//! Cache store.
//!
//! # Responsibilities
//! - Probe, read and write cache files under the cache root
//! - Collapse concurrent writes of one key into a single physical write
//! - Delete a site subtree or a single file on request
//!
//! # Design Decisions
//! - Blocking file work (locks, fsync) runs on the blocking pool
//! - Physical writes are counted so deduplication can be observed

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;

use crate::cache::atomic::write_atomic;
use crate::cache::{CacheError, CacheKey, SingleFlight};
use crate::observability::metrics;

/// Metadata of a cached file found by [`CacheStore::lookup`].
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub len: u64,
}

pub struct CacheStore {
    root: PathBuf,
    inflight: SingleFlight<PathBuf, Result<(), CacheError>>,
    writes: Arc<AtomicU64>,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inflight: SingleFlight::new(),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, key: &CacheKey) -> PathBuf {
        key.resolve(&self.root)
    }

    /// Metadata of the cached file for `key`, if a regular file exists there.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedFile> {
        let path = self.path_of(key);
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(CachedFile {
            path,
            modified,
            len: meta.len(),
        })
    }

    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        let path = self.path_of(key);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CacheError::io("read", &path, e))
    }

    /// Persist `data` at `key`.
    ///
    /// Concurrent calls for the same key wait for the one already running
    /// and return its outcome.
    pub async fn write(&self, key: &CacheKey, data: Bytes) -> Result<(), CacheError> {
        let path = self.path_of(key);
        let writes = self.writes.clone();

        let result = self
            .inflight
            .run(path.clone(), move || async move {
                writes.fetch_add(1, Ordering::Relaxed);
                metrics::record_physical_write();
                tokio::task::spawn_blocking(move || write_atomic(&path, &data))
                    .await
                    .map_err(|e| CacheError::Task(e.to_string()))?
            })
            .await;

        metrics::record_cache_write(result.is_ok());
        result
    }

    /// Remove a whole site directory, or one file below it.
    ///
    /// A missing site directory is not an error; a missing file is.
    pub async fn purge(&self, site: &str, file: Option<&str>) -> Result<PathBuf, CacheError> {
        let target = self.purge_target(site, file)?;

        match file {
            None => match tokio::fs::remove_dir_all(&target).await {
                Ok(()) => Ok(target),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(target),
                Err(e) => Err(CacheError::io("remove directory", &target, e)),
            },
            Some(_) => tokio::fs::remove_file(&target)
                .await
                .map(|()| target.clone())
                .map_err(|e| CacheError::io("remove file", &target, e)),
        }
    }

    fn purge_target(&self, site: &str, file: Option<&str>) -> Result<PathBuf, CacheError> {
        if site.is_empty() || site.starts_with('.') || site.contains(['/', '\\', '\0']) {
            return Err(CacheError::InvalidPath(site.to_string()));
        }
        let mut target = self.root.join(format!("{}.site", site));

        if let Some(file) = file {
            let relative = Path::new(file.trim_start_matches(['/', '\\']));
            let normal = relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !normal || relative.as_os_str().is_empty() {
                return Err(CacheError::InvalidPath(file.to_string()));
            }
            target.push(relative);
        }
        Ok(target)
    }

    /// Number of physical writes performed so far.
    pub fn physical_writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}
