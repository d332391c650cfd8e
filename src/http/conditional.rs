//! Conditional request evaluation for cached and static files.
//!
//! The validator is a weak ETag built from the file's modification time
//! (whole seconds) and size. It is not a content hash.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

/// Slack for clocks and filesystems with one-second resolution.
const MODIFIED_TOLERANCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The client's copy is current; answer 304 with no body.
    Fresh,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    etag: String,
    modified: SystemTime,
}

impl Validator {
    pub fn new(modified: SystemTime, len: u64) -> Self {
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self {
            etag: format!("W/\"{:x}-{:x}\"", secs, len),
            modified,
        }
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Value for the Last-Modified header.
    pub fn last_modified(&self) -> String {
        httpdate::fmt_http_date(self.modified)
    }

    /// Fresh when If-None-Match names this validator, or when
    /// If-Modified-Since is not older than the file.
    pub fn evaluate(&self, headers: &HeaderMap) -> Freshness {
        let etag_match = headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| self.matches_any(v));

        let not_modified = headers
            .get(IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok())
            .is_some_and(|since| self.modified <= since + MODIFIED_TOLERANCE);

        if etag_match || not_modified {
            Freshness::Fresh
        } else {
            Freshness::Stale
        }
    }

    /// Set ETag and Last-Modified.
    pub fn write_headers(&self, headers: &mut HeaderMap) {
        if let Ok(etag) = HeaderValue::from_str(&self.etag) {
            headers.insert(ETAG, etag);
        }
        if let Ok(modified) = HeaderValue::from_str(&self.last_modified()) {
            headers.insert(LAST_MODIFIED, modified);
        }
    }

    /// Bodiless 304 carrying the validator headers.
    pub fn not_modified(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        self.write_headers(response.headers_mut());
        response
    }

    fn matches_any(&self, if_none_match: &str) -> bool {
        let ours = opaque(&self.etag);
        if_none_match
            .split(',')
            .map(str::trim)
            .any(|tag| tag == "*" || opaque(tag) == ours)
    }
}

/// Weak comparison: the `W/` prefix is ignored.
fn opaque(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
