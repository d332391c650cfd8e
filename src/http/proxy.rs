//! Reverse proxy dispatcher.
//!
//! # Data Flow
//! ```text
//! Request
//!     → resolve Host (unknown → 403)
//!     → GET with a cache file at the key → cached.rs
//!     → otherwise origin fetch:
//!         2xx + cacheable GET → decode → transform → cache write → identity body
//!         2xx otherwise       → relayed as received
//!         non-2xx GET         → substituted error document
//!         non-2xx other       → status and body, no origin headers
//!     → access record + metrics
//! ```
//!
//! # Design Decisions
//! - Only GET requests touch the cache or the transform pipeline
//! - A failed cache write is logged; the client still gets the body
//! - No timeouts or retries on the origin request

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, Version};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::BodyExt;

use crate::cache::{has_extension, CacheError, CacheKey};
use crate::codec::{self, CodecError, ContentCoding};
use crate::http::cached;
use crate::http::request::{accepts_html, ClientInfo};
use crate::http::server::AppState;
use crate::observability::{metrics, LogSource};
use crate::routing::{request_host, request_hostname, Origin, RouteError};
use crate::security::headers::{forward_headers, strip_hop_by_hop};
use crate::transform::TransformError;

/// Content types stored in the cache regardless of the request path.
const CACHEABLE_TYPES: [&str; 7] = [
    "text/html",
    "text/css",
    "javascript",
    "application/octet-stream",
    "image/png",
    "image/svg+xml",
    "video/mp4",
];

/// Failure while answering a proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no virtual host for '{0}'")]
    UnknownHost(String),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("origin request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("origin body read failed: {0}")]
    UpstreamBody(#[from] hyper::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UnknownHost(_) => StatusCode::FORBIDDEN,
            ProxyError::Upstream(_)
            | ProxyError::UpstreamBody(_)
            | ProxyError::Transform(_)
            | ProxyError::Codec(CodecError::Decode { .. }) => StatusCode::BAD_GATEWAY,
            ProxyError::Route(_)
            | ProxyError::Codec(CodecError::Encode { .. })
            | ProxyError::Cache(_)
            | ProxyError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

/// Whether a 2xx origin response is decoded, transformed and cached.
pub fn should_cache(headers: &HeaderMap, path: &str) -> bool {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    CACHEABLE_TYPES.iter().any(|t| content_type.contains(t)) || has_extension(path)
}

/// Catch-all handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    dispatch(&state, request).await
}

/// Route one request through resolve → cache or origin → record.
pub async fn dispatch(state: &AppState, request: Request<Body>) -> Response {
    let info = ClientInfo::from_request(&request);

    let hostname = request_hostname(request.headers(), request.uri()).unwrap_or_default();
    let Some(vhost) = state.hosts.resolve(&hostname).cloned() else {
        tracing::warn!(request_id = %info.request_id, host = %hostname, "No virtual host");
        let error = ProxyError::UnknownHost(hostname);
        let message = error.to_string();
        return finish(state, &info, error.into_response(), LogSource::Local, Some(message), "rejected");
    };

    let key = if request.method() == Method::GET {
        CacheKey::for_request(vhost.site, request.uri().path(), accepts_html(request.headers()))
    } else {
        None
    };

    if let Some(key) = &key {
        if let Some(file) = state.cache.lookup(key).await {
            match cached::serve(&state.cache, key, &file, request.headers()).await {
                Ok(response) => {
                    let source = LogSource::Cache { path: file.path };
                    return finish(state, &info, response, source, None, "cache");
                }
                Err(ProxyError::Cache(e)) => {
                    tracing::warn!(request_id = %info.request_id, error = %e, "Cached file unreadable, fetching from origin");
                }
                Err(e) => {
                    tracing::error!(request_id = %info.request_id, error = %e, "Cache hit failed");
                    let error = e.to_string();
                    let source = LogSource::Cache { path: file.path };
                    return finish(state, &info, e.into_response(), source, Some(error), "cache");
                }
            }
        }
    }

    let upstream_uri = match vhost.origin.upstream_uri(request.uri()) {
        Ok(uri) => uri,
        Err(e) => {
            let error = ProxyError::from(e);
            let message = error.to_string();
            return finish(state, &info, error.into_response(), LogSource::Local, Some(message), "origin");
        }
    };
    let source = LogSource::Origin {
        url: upstream_uri.to_string(),
    };

    match fetch(state, &vhost.origin, upstream_uri, key.as_ref(), request, &info).await {
        Ok(response) => finish(state, &info, response, source, None, "origin"),
        Err(e) => {
            tracing::error!(request_id = %info.request_id, error = %e, "Origin fetch failed");
            let error = e.to_string();
            finish(state, &info, e.into_response(), source, Some(error), "origin")
        }
    }
}

async fn fetch(
    state: &AppState,
    origin: &Origin,
    upstream_uri: Uri,
    key: Option<&CacheKey>,
    request: Request<Body>,
    info: &ClientInfo,
) -> Result<Response, ProxyError> {
    let path = request.uri().path().to_string();
    let is_get = request.method() == Method::GET;
    let inbound_host = request_host(request.headers(), request.uri()).map(str::to_string);

    let (mut parts, body) = request.into_parts();
    parts.uri = upstream_uri;
    parts.version = Version::HTTP_11;
    forward_headers(&mut parts.headers, origin.authority(), inbound_host.as_deref(), info.ip());
    if is_get {
        codec::restrict_accept_encoding(&mut parts.headers);
    }

    tracing::debug!(request_id = %info.request_id, uri = %parts.uri, "Forwarding to origin");
    let response = state.client.request(Request::from_parts(parts, body)).await?;
    let status = response.status();

    if !status.is_success() {
        if is_get {
            return Ok(state.pages.substitute(status).await);
        }
        let mut relayed = Response::new(Body::new(response.into_body()));
        *relayed.status_mut() = status;
        return Ok(relayed);
    }

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);

    if !is_get || !should_cache(&parts.headers, &path) {
        return Ok(Response::from_parts(parts, Body::new(body)));
    }

    let raw = body.collect().await?.to_bytes();
    let coding = ContentCoding::from_headers(&parts.headers);
    let transform = state.transform.clone();
    let body = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ProxyError> {
        let decoded = codec::decode(coding, &raw)?;
        Ok(transform.apply(&path, decoded)?)
    })
    .await??;
    let body = Bytes::from(body);

    if let Some(key) = key {
        match state.cache.write(key, body.clone()).await {
            Ok(()) => tracing::debug!(request_id = %info.request_id, key = %key, "Cached"),
            Err(e) => tracing::warn!(request_id = %info.request_id, key = %key, error = %e, "Cache write failed"),
        }
    }

    parts.headers.remove(CONTENT_ENCODING);
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    Ok(Response::from_parts(parts, Body::from(body)))
}

fn finish(
    state: &AppState,
    info: &ClientInfo,
    response: Response,
    source: LogSource,
    error: Option<String>,
    metric_source: &'static str,
) -> Response {
    let status = response.status().as_u16();
    metrics::record_request(&info.method, status, metric_source, info.started);
    state.access_log.emit(info.record(status, source, error));
    response
}
