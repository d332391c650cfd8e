//! Service endpoints under `/proxy-svc/api`.
//!
//! # Endpoints
//! - `GET  /proxy-svc/api/healthz` → 200 `OK`
//! - `GET  /proxy-svc/api/readyz` → 200 `OK`
//! - `POST /proxy-svc/api/v1/refresh-cache` → 204, or 400 / 500 with a message
//!
//! Refresh-cache is only answered for Hosts on the API allow-list; any
//! other caller's request is handled as proxy traffic.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;
use crate::http::proxy::dispatch;
use crate::http::request::ClientInfo;
use crate::http::server::AppState;
use crate::observability::{metrics, LogSource};
use crate::routing::request_host;

pub const HEALTHZ_PATH: &str = "/proxy-svc/api/healthz";
pub const READYZ_PATH: &str = "/proxy-svc/api/readyz";
pub const REFRESH_CACHE_PATH: &str = "/proxy-svc/api/v1/refresh-cache";

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Body of a refresh-cache call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshCacheRequest {
    /// Site class whose `{site}.site` directory is purged.
    pub site: String,
    /// Required, otherwise informational.
    pub cache_type: String,
    /// Single file below the site directory; the whole site when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

pub async fn healthz() -> &'static str {
    "OK"
}

pub async fn readyz() -> &'static str {
    "OK"
}

pub async fn refresh_cache(State(state): State<AppState>, request: Request<Body>) -> Response {
    if !state.api.permits(request_host(request.headers(), request.uri())) {
        return dispatch(&state, request).await;
    }

    let info = ClientInfo::from_request(&request);
    let (status, message) = purge(&state, request.into_body()).await;

    metrics::record_request(&info.method, status.as_u16(), "api", info.started);
    let error = (!status.is_success()).then(|| message.clone());
    state.access_log.emit(info.record(status.as_u16(), LogSource::Local, error));

    if status == StatusCode::NO_CONTENT {
        status.into_response()
    } else {
        (status, message).into_response()
    }
}

async fn purge(state: &AppState, body: Body) -> (StatusCode, String) {
    let request = match to_bytes(body, MAX_BODY_BYTES)
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<RefreshCacheRequest>(&bytes).ok())
    {
        Some(request) => request,
        None => return (StatusCode::BAD_REQUEST, "Invalid request body".to_string()),
    };

    if request.site.is_empty() || request.cache_type.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "site and cacheType must not be empty".to_string(),
        );
    }

    let file = request.file_path.as_deref().filter(|f| !f.is_empty());
    tracing::info!(
        site = %request.site,
        cache_type = %request.cache_type,
        file = file.unwrap_or(""),
        "Refreshing cache"
    );

    match state.cache.purge(&request.site, file).await {
        Ok(path) => {
            tracing::info!(path = %path.display(), "Cache purged");
            (StatusCode::NO_CONTENT, String::new())
        }
        Err(CacheError::InvalidPath(path)) => (
            StatusCode::BAD_REQUEST,
            format!("Invalid cache path: {}", path),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Cache purge failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to delete cache: {}", e),
            )
        }
    }
}
