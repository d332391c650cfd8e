//! Host extraction from incoming requests.
//!
//! # Responsibilities
//! - Read the Host header (or the HTTP/2 authority)
//! - Strip any port suffix, IPv6 literals included
//! - Normalize to lowercase for case-insensitive lookup

use axum::http::{header, HeaderMap, Uri};

/// Strip a `:port` suffix from a Host header value.
///
/// Bracketed IPv6 literals keep their brackets: `[::1]:8080` → `[::1]`.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}

/// The raw Host value of a request, including any port.
pub fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
}

/// The lowercase hostname of a request with the port removed.
pub fn request_hostname(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    request_host(headers, uri)
        .map(strip_port)
        .filter(|h| !h.is_empty())
        .map(|h| h.to_ascii_lowercase())
}
