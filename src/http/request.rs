//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate the request ID (UUID v4) carried in `x-request-id`
//! - Capture who asked for what, for the access log
//! - Classify requests (HTML navigation or not)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client facts are captured before the request body is consumed

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::header::{ACCEPT, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::observability::{LogRecord, LogSource};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// Facts about an inbound request, kept for its access record.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub request_id: String,
    pub addr: Option<SocketAddr>,
    pub method: String,
    pub url: String,
    pub user_agent: String,
    pub started: Instant,
}

impl ClientInfo {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();
        Self {
            request_id: header_str(headers, &X_REQUEST_ID).unwrap_or("unknown").to_string(),
            addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            method: request.method().to_string(),
            url: request.uri().to_string(),
            user_agent: header_str(headers, &USER_AGENT).unwrap_or("").to_string(),
            started: Instant::now(),
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.addr.map(|a| a.ip())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Build the access record for a finished request.
    pub fn record(&self, status: u16, source: LogSource, error: Option<String>) -> LogRecord {
        LogRecord {
            request_id: self.request_id.clone(),
            client_ip: self.addr.map(|a| a.to_string()).unwrap_or_default(),
            method: self.method.clone(),
            url: self.url.clone(),
            user_agent: self.user_agent.clone(),
            status,
            latency: self.elapsed(),
            source,
            error,
        }
    }
}

/// Whether the client accepts `text/html`.
pub fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/html"))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_ids_are_unique_uuids() {
        let request = Request::new(());
        let mut make = MakeRequestUuidV4;
        let a = make.make_request_id(&request).unwrap();
        let b = make.make_request_id(&request).unwrap();
        let a = a.header_value().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&a).is_ok());
        assert_ne!(a, b.header_value().to_str().unwrap());
    }

    #[test]
    fn test_client_info() {
        let mut request = Request::builder()
            .method("POST")
            .uri("/a?b=1")
            .header(USER_AGENT, "curl/8")
            .header(X_REQUEST_ID, "rid-1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("10.1.2.3:5555".parse().unwrap()));

        let info = ClientInfo::from_request(&request);
        assert_eq!(info.request_id, "rid-1");
        assert_eq!(info.ip(), Some("10.1.2.3".parse().unwrap()));
        assert_eq!(info.url, "/a?b=1");

        let record = info.record(201, LogSource::Local, None);
        assert_eq!(record.method, "POST");
        assert_eq!(record.user_agent, "curl/8");
        assert_eq!(record.client_ip, "10.1.2.3:5555");
    }

    #[test]
    fn test_accepts_html() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_html(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("text/html,application/xhtml+xml"));
        assert!(accepts_html(&headers));
        headers.insert(ACCEPT, HeaderValue::from_static("image/avif,*/*"));
        assert!(!accepts_html(&headers));
    }
}
