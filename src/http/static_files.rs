//! Override files served verbatim from a local directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::StaticFilesConfig;
use crate::http::conditional::{Freshness, Validator};
use crate::http::proxy::dispatch;
use crate::http::request::ClientInfo;
use crate::http::server::AppState;
use crate::observability::{metrics, LogSource};

/// Request path → file table.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
    routes: HashMap<String, PathBuf>,
}

impl StaticFiles {
    pub fn from_config(config: &StaticFilesConfig) -> Self {
        let dir = Path::new(&config.dir);
        Self {
            routes: config
                .routes
                .iter()
                .map(|route| (route.path.clone(), dir.join(&route.file)))
                .collect(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn file_for(&self, path: &str) -> Option<&Path> {
        self.routes.get(path).map(PathBuf::as_path)
    }
}

pub async fn static_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Some(file) = state.statics.file_for(request.uri().path()) else {
        return dispatch(&state, request).await;
    };

    let info = ClientInfo::from_request(&request);
    let (response, error) = serve_file(file, request.headers()).await;

    let status = response.status().as_u16();
    metrics::record_request(&info.method, status, "static", info.started);
    state.access_log.emit(info.record(status, LogSource::Local, error));
    response
}

/// Serve one file with conditional request support.
pub async fn serve_file(path: &Path, request_headers: &HeaderMap) -> (Response, Option<String>) {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return (StatusCode::NOT_FOUND.into_response(), None),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Static file unavailable");
            return (StatusCode::NOT_FOUND.into_response(), Some(e.to_string()));
        }
    };

    let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let validator = Validator::new(modified, meta.len());
    if validator.evaluate(request_headers) == Freshness::Fresh {
        return (validator.not_modified(), None);
    }

    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Static file read failed");
            return (StatusCode::INTERNAL_SERVER_ERROR.into_response(), Some(e.to_string()));
        }
    };

    let len = HeaderValue::from(data.len());
    let mut response = Response::new(Body::from(data));
    let headers = response.headers_mut();
    if let Some(mime) = mime_guess::from_path(path).first_raw() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime));
    }
    headers.insert(CONTENT_LENGTH, len);
    validator.write_headers(headers);
    (response, None)
}
