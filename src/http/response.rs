//! Response construction.
//!
//! # Responsibilities
//! - Substitute documents for non-2xx origin responses
//! - Identify the proxy in the `Server` header of cache hits
//!
//! # Design Decisions
//! - The 404 document is read from disk on each use, so it can be edited
//!   without a restart; an unreadable file falls back to a fixed body
//! - Substituted responses carry only our own headers

use std::path::PathBuf;

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

pub const SERVER_NAME: &str = concat!("cache-proxy/", env!("CARGO_PKG_VERSION"));

const NOT_FOUND_FALLBACK: &[u8] = b"Page 404";
const STATUS_ERROR_BODY: &[u8] = b"Page Status Error";
const HTML: &str = "text/html; charset=utf-8";

/// Documents substituted for origin errors.
#[derive(Debug, Clone)]
pub struct ErrorPages {
    not_found: PathBuf,
}

impl ErrorPages {
    pub fn new(not_found: impl Into<PathBuf>) -> Self {
        Self {
            not_found: not_found.into(),
        }
    }

    /// Replacement response for an origin status outside 2xx.
    pub async fn substitute(&self, status: StatusCode) -> Response {
        let body = if status == StatusCode::NOT_FOUND {
            match tokio::fs::read(&self.not_found).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        path = %self.not_found.display(),
                        error = %e,
                        "404 page unreadable, using fallback"
                    );
                    NOT_FOUND_FALLBACK.to_vec()
                }
            }
        } else {
            STATUS_ERROR_BODY.to_vec()
        };
        html_response(status, body)
    }
}

/// A complete HTML response with an exact Content-Length.
pub fn html_response(status: StatusCode, body: Vec<u8>) -> Response {
    let len = HeaderValue::from(body.len());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(HTML));
    response.headers_mut().insert(CONTENT_LENGTH, len);
    response
}
