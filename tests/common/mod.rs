//! Shared utilities for integration testing: a programmable mock origin and
//! a proxy instance on ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_ENCODING, CONTENT_TYPE, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use cache_proxy::config::{ProxyConfig, SiteConfig};
use cache_proxy::observability::{AccessLog, LogRecord};
use cache_proxy::{HttpServer, Shutdown};

pub const MAIN_HOST: &str = "main.test";
pub const RES_HOST: &str = "res.test";
pub const API_HOST: &str = "ops.test";
pub const ALLOWED_ORIGIN: &str = "https://allowed.example";

pub const TITLE: &str = "Proxy Title";
pub const DESCRIPTION: &str = "Injected description";
pub const ANALYTICS_SRC: &str = "https://analytics.example/gtag.js";
pub const WORKER_GUARD: &str = "(null===(r=t.CORSWorkaround)||r)";
pub const NOT_FOUND_PAGE: &str = "<html><body>custom not found</body></html>";
pub const ROBOTS: &str = "User-agent: *\nDisallow:\n";

pub const ROOT_HTML: &str = r#"<!DOCTYPE html><html><head><title>Origin Title</title><meta name="description" content="origin description"><script async src="https://analytics.example/gtag.js"></script></head><body><p>origin page</p></body></html>"#;
pub const APP_CSS: &str = "body { color: red; } .a { margin: 0; } .b { margin: 0; } .c { margin: 0; }";
pub const LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"></svg>"#;

/// Request path of a resource whose name needs percent-encoding.
pub const MAP_TILE_PATH: &str = "/maps/%E5%9C%B0%E5%9B%BE%201.png";
pub const MAP_TILE: &[u8] = b"\x89PNG tile";

pub fn worker_js() -> String {
    format!("var a=1;if({}){{fetch(x)}};if({}){{go()}}", WORKER_GUARD, WORKER_GUARD)
}

type Hits = Arc<Mutex<HashMap<String, usize>>>;

/// Origin server with per-path hit counters.
pub struct MockOrigin {
    pub addr: SocketAddr,
    hits: Hits,
}

impl MockOrigin {
    pub async fn start() -> Self {
        let hits: Hits = Arc::default();
        let app = Router::new()
            .route("/", get(root))
            .route("/dist/workerHost.min.js", get(worker))
            .route("/app.css", get(app_css))
            .route("/plain", get(plain))
            .route("/echo-host", get(echo_host))
            .route("/broken", get(broken))
            .route("/api/data", post(created))
            .route("/api/fail", post(conflict))
            .route("/assets/logo.svg", get(logo))
            .route(&format!("/assets{}", MAP_TILE_PATH), get(map_tile))
            .route("/echo-encoding", get(echo_encoding))
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(hits.clone(), count));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, hits }
    }

    /// Number of requests the origin has seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

async fn count(State(hits): State<Hits>, request: Request, next: Next) -> Response {
    *hits
        .lock()
        .unwrap()
        .entry(request.uri().path().to_string())
        .or_default() += 1;
    next.run(request).await
}

async fn root() -> Response {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(ROOT_HTML.as_bytes()).unwrap();
    let body = encoder.finish().unwrap();
    (
        [
            (CONTENT_TYPE, "text/html; charset=utf-8"),
            (CONTENT_ENCODING, "gzip"),
        ],
        body,
    )
        .into_response()
}

async fn worker() -> Response {
    ([(CONTENT_TYPE, "application/javascript")], worker_js()).into_response()
}

async fn app_css() -> Response {
    (
        [
            (CONTENT_TYPE, "text/css"),
            (ACCESS_CONTROL_ALLOW_ORIGIN, "https://upstream.example"),
            (X_FRAME_OPTIONS, "DENY"),
        ],
        APP_CSS,
    )
        .into_response()
}

async fn plain() -> Response {
    ([(CONTENT_TYPE, "application/json")], r#"{"ok":true}"#).into_response()
}

async fn echo_host(headers: HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    format!("{}|{}", header("x-forwarded-host"), header("x-forwarded-for"))
}

async fn broken() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, [("x-origin", "yes")], "origin failure").into_response()
}

async fn created() -> Response {
    (StatusCode::CREATED, [("x-origin", "yes")], "created").into_response()
}

async fn conflict() -> Response {
    (StatusCode::CONFLICT, [("x-origin", "yes")], "conflict").into_response()
}

async fn logo() -> Response {
    ([(CONTENT_TYPE, "image/svg+xml")], LOGO_SVG).into_response()
}

async fn map_tile() -> Response {
    ([(CONTENT_TYPE, "image/png")], MAP_TILE).into_response()
}

async fn echo_encoding(headers: HeaderMap) -> Response {
    let accept = headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string();
    ([(CONTENT_TYPE, "text/plain")], accept).into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, [("x-origin", "yes")], "nope").into_response()
}

/// A proxy in front of a fresh mock origin, with its own cache root.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub origin: MockOrigin,
    pub client: reqwest::Client,
    cache_dir: TempDir,
    _static_dir: TempDir,
    records: mpsc::Receiver<LogRecord>,
    shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start() -> Self {
        let origin = MockOrigin::start().await;
        let cache_dir = tempfile::tempdir().unwrap();
        let static_dir = tempfile::tempdir().unwrap();
        std::fs::write(static_dir.path().join("robots.txt"), ROBOTS).unwrap();
        std::fs::write(static_dir.path().join("404.html"), NOT_FOUND_PAGE).unwrap();

        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.upstreams.main = SiteConfig {
            target_url: format!("http://{}", origin.addr),
            hosts: vec![MAIN_HOST.into()],
        };
        config.upstreams.res = SiteConfig {
            target_url: format!("http://{}/assets", origin.addr),
            hosts: vec![RES_HOST.into()],
        };
        config.cache.root_dir = cache_dir.path().to_string_lossy().into_owned();
        config.api.allowed_hosts = vec![API_HOST.into()];
        config.cors.allowed_origins = vec![ALLOWED_ORIGIN.into()];
        config.transform.title = TITLE.into();
        config.transform.description = DESCRIPTION.into();
        config.transform.removed_script_src = ANALYTICS_SRC.into();
        config.transform.worker_guards = vec![WORKER_GUARD.into()];
        config.static_files.dir = static_dir.path().to_string_lossy().into_owned();
        config.static_files.not_found_page = static_dir
            .path()
            .join("404.html")
            .to_string_lossy()
            .into_owned();
        config.observability.metrics_enabled = false;

        let (access_log, records) = AccessLog::channel(256);
        let server = HttpServer::with_access_log(config, access_log).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let receiver = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, receiver).await;
        });

        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        Self {
            addr,
            origin,
            client,
            cache_dir,
            _static_dir: static_dir,
            records,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn get(&self, host: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).header("host", host)
    }

    pub fn post(&self, host: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).header("host", host)
    }

    /// Location of a cache file, relative to the cache root.
    pub fn cache_file(&self, relative: &str) -> PathBuf {
        self.cache_dir.path().join(relative)
    }

    /// Next access record, in request order.
    pub async fn next_record(&mut self) -> LogRecord {
        tokio::time::timeout(Duration::from_secs(2), self.records.recv())
            .await
            .expect("no access record within 2s")
            .expect("access log closed")
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
