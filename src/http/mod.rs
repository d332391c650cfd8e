//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, CORS layers)
//!     → api.rs (health probes, refresh-cache)
//!     → static_files.rs (fixed override paths)
//!     → proxy.rs (everything else)
//!         → cached.rs (cache hit: conditional, content coding)
//!         → origin fetch → transform → cache write
//!     → response.rs (substituted error documents)
//!     → Send to client
//! ```

pub mod api;
pub mod cached;
pub mod conditional;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;

pub use proxy::{dispatch, ProxyError};
pub use request::{ClientInfo, MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
