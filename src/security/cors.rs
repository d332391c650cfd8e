//! CORS policy.
//!
//! Applied as one middleware around every route, so cache hits, proxied
//! responses, static overrides and local errors all get the same headers.
//!
//! ```text
//! requester origin = Origin header, else scheme://host of Referer
//! response:
//!     drop Access-Control-Allow-{Origin,Methods,Headers} and X-Frame-Options
//!     origin in allow-list → Access-Control-Allow-Origin: *
//!     always               → Access-Control-Allow-{Methods,Headers}: *
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ORIGIN, REFERER, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allowed: HashSet<String>,
}

impl CorsPolicy {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: origins
                .into_iter()
                .map(|o| normalize(o.as_ref()))
                .filter(|o| !o.is_empty())
                .collect(),
        }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allowed.contains(&normalize(origin))
    }

    /// Rewrite the CORS headers of a response for a request from `origin`.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        headers.remove(ACCESS_CONTROL_ALLOW_ORIGIN);
        headers.remove(ACCESS_CONTROL_ALLOW_METHODS);
        headers.remove(ACCESS_CONTROL_ALLOW_HEADERS);
        headers.remove(X_FRAME_OPTIONS);

        if origin.is_some_and(|o| self.is_allowed(o)) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
    }
}

/// Origin of the requesting page: the Origin header, else derived from Referer.
pub fn requester_origin(headers: &HeaderMap) -> Option<String> {
    if let Some(origin) = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(origin.to_string());
    }

    let referer = headers.get(REFERER)?.to_str().ok()?;
    let url = Url::parse(referer).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn normalize(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = requester_origin(request.headers());
    let mut response = next.run(request).await;
    policy.apply(origin.as_deref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(["https://allowed.example", "http://localhost:3000/"])
    }

    fn request_headers(name: axum::http::HeaderName, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_requester_origin() {
        assert_eq!(
            requester_origin(&request_headers(ORIGIN, "https://allowed.example")).as_deref(),
            Some("https://allowed.example")
        );
        assert_eq!(
            requester_origin(&request_headers(REFERER, "http://localhost:3000/play?x=1")).as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(requester_origin(&request_headers(REFERER, "not a url")), None);
        assert_eq!(requester_origin(&HeaderMap::new()), None);
    }

    #[test]
    fn test_allowed_origin_gets_wildcard() {
        let mut response = HeaderMap::new();
        response.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("https://upstream"));
        response.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

        policy().apply(Some("https://allowed.example"), &mut response);

        assert_eq!(response[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response[ACCESS_CONTROL_ALLOW_METHODS], "*");
        assert_eq!(response[ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert!(response.get(X_FRAME_OPTIONS).is_none());
    }

    #[test]
    fn test_unlisted_origin_gets_no_allow_origin() {
        let mut response = HeaderMap::new();
        response.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

        policy().apply(Some("https://evil.example"), &mut response);
        assert!(response.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(response[ACCESS_CONTROL_ALLOW_METHODS], "*");

        let mut response = HeaderMap::new();
        policy().apply(None, &mut response);
        assert!(response.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[test]
    fn test_trailing_slash_in_allow_list() {
        assert!(policy().is_allowed("http://localhost:3000"));
        assert!(policy().is_allowed("HTTPS://Allowed.Example"));
    }
}
