//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the configuration into shared request-time state
//! - Create the Axum Router: service API, override files, proxy fallback
//! - Wire up middleware (request ID, tracing, CORS)
//! - Serve with graceful shutdown
//!
//! # Design Decisions
//! - Every piece of state is built once at startup and never mutated
//! - Fixed routes fall back to the proxy for methods they do not answer

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::cache::CacheStore;
use crate::config::ProxyConfig;
use crate::http::api::{healthz, readyz, refresh_cache, HEALTHZ_PATH, READYZ_PATH, REFRESH_CACHE_PATH};
use crate::http::proxy::proxy_handler;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::ErrorPages;
use crate::http::static_files::{static_handler, StaticFiles};
use crate::observability::AccessLog;
use crate::routing::{RouteError, VirtualHosts};
use crate::security::{cors_middleware, ApiAccess, CorsPolicy};
use crate::transform::TransformPipeline;

/// Client used for every origin request.
pub type OriginClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Failure while compiling configuration into server state.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("TLS client setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub hosts: Arc<VirtualHosts>,
    pub cache: Arc<CacheStore>,
    pub transform: Arc<TransformPipeline>,
    pub statics: Arc<StaticFiles>,
    pub pages: Arc<ErrorPages>,
    pub api: Arc<ApiAccess>,
    pub client: OriginClient,
    pub access_log: AccessLog,
}

impl AppState {
    pub fn from_config(config: &ProxyConfig, access_log: AccessLog) -> Result<Self, ServerError> {
        Ok(Self {
            hosts: Arc::new(VirtualHosts::from_config(&config.upstreams)?),
            cache: Arc::new(CacheStore::new(&config.cache.root_dir)),
            transform: Arc::new(TransformPipeline::from_config(&config.transform)),
            statics: Arc::new(StaticFiles::from_config(&config.static_files)),
            pages: Arc::new(ErrorPages::new(&config.static_files.not_found_page)),
            api: Arc::new(ApiAccess::new(&config.api.allowed_hosts)),
            client: origin_client()?,
            access_log,
        })
    }
}

/// HTTP and HTTPS origins, HTTP/1.1 only.
///
/// The ring provider is passed explicitly so the client never depends on a
/// process-wide rustls default.
pub fn origin_client() -> Result<OriginClient, rustls::Error> {
    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .build();
    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// HTTP server for the caching proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with its own access-log writer task.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let access_log = AccessLog::spawn(config.observability.access_log_capacity);
        Self::with_access_log(config, access_log)
    }

    /// Create a server whose access records go to `access_log`.
    pub fn with_access_log(config: ProxyConfig, access_log: AccessLog) -> Result<Self, ServerError> {
        let state = AppState::from_config(&config, access_log)?;
        let cors = Arc::new(CorsPolicy::new(&config.cors.allowed_origins));

        tracing::info!(
            virtual_hosts = state.hosts.len(),
            cache_root = %state.cache.root().display(),
            static_routes = config.static_files.routes.len(),
            "Proxy state compiled"
        );

        let router = Self::build_router(state, cors);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, cors: Arc<CorsPolicy>) -> Router {
        let mut router = Router::new()
            .route(HEALTHZ_PATH, get(healthz))
            .route(READYZ_PATH, get(readyz))
            .route(REFRESH_CACHE_PATH, post(refresh_cache).fallback(proxy_handler));

        for path in state.statics.paths() {
            router = router.route(path, get(static_handler).fallback(proxy_handler));
        }

        router
            .fallback(proxy_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(cors, cors_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
    }

    /// Run the server until a value arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
