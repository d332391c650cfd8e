//! Cache key derivation.
//!
//! A key is `{site}.site/` followed by the percent-decoded request path.
//! Directory-style requests resolve to an `index.html` below that path.

use std::fmt;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::routing::SiteClass;

const INDEX_FILE: &str = "index.html";

/// Location of a cached representation relative to the cache root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    site: SiteClass,
    relative: PathBuf,
}

impl CacheKey {
    /// Derive the key for a request path.
    ///
    /// `wants_html` is true when the client sent `Accept: text/html`.
    /// Returns `None` when a decoded segment cannot be mapped under the
    /// site directory (`.`/`..`, slashes, backslashes, NUL bytes, invalid
    /// UTF-8).
    pub fn for_request(site: SiteClass, path: &str, wants_html: bool) -> Option<Self> {
        let mut relative = PathBuf::from(site.cache_dir());
        let mut last = None;

        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = percent_decode_str(raw).decode_utf8().ok()?;
            if segment == "." || segment == ".." || segment.contains(['/', '\\', '\0']) {
                return None;
            }
            relative.push(&*segment);
            last = Some(segment);
        }

        let directory = match last {
            None => true,
            Some(_) if path.ends_with('/') => true,
            Some(segment) => wants_html && !has_extension(&segment),
        };
        if directory {
            relative.push(INDEX_FILE);
        }

        Some(Self { site, relative })
    }

    pub fn site(&self) -> SiteClass {
        self.site
    }

    /// Path relative to the cache root, starting with the site directory.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Absolute location of the cache file under `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.relative)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative.display())
    }
}

/// Whether the last segment of a URL path has a non-empty file extension.
pub fn has_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or("");
    Path::new(last)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}
