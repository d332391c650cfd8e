//! On-disk cache subsystem.
//!
//! # Data Flow
//! ```text
//! Lookup (fast path):
//!     (site, path, Accept) → key.rs → {site}.site/... → metadata probe
//!
//! Fill (origin path):
//!     transformed body → store.rs → singleflight.rs (one writer per key)
//!     → atomic.rs (temp file, lock, fsync, rename, dir fsync)
//!
//! Invalidation (refresh-cache API):
//!     site [+ file] → remove subtree or single file
//! ```
//!
//! # Design Decisions
//! - Presence is freshness: there is no expiry, only deletion
//! - The final path never holds a partially written file
//! - Errors are cloneable so one write outcome can be handed to every waiter

pub mod atomic;
pub mod key;
pub mod singleflight;
pub mod store;

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

pub use key::{has_extension, CacheKey};
pub use singleflight::SingleFlight;
pub use store::{CacheStore, CachedFile};

/// Cache I/O failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache {stage} failed for {}: {source}", path.display())]
    Io {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("invalid cache path '{0}'")]
    InvalidPath(String),

    #[error("cache write task failed: {0}")]
    Task(String),
}

impl CacheError {
    pub(crate) fn io(stage: &'static str, path: &Path, source: io::Error) -> Self {
        CacheError::Io {
            stage,
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    /// Whether the underlying I/O error is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
