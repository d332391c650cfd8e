//! Caching reverse proxy.
//!
//! Fronts two origins (a main site and a resource site) selected by the
//! request's Host, keeps a persistent on-disk copy of cacheable GET
//! responses, and serves later requests from that copy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                 CACHE PROXY                   │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!     ────────────────────┼─▶│  http   │───▶│ routing  │───▶│  cache   │  │
//!                         │  │ server  │    │  vhosts  │    │  lookup  │  │
//!                         │  └─────────┘    └──────────┘    └────┬─────┘  │
//!                         │                                 miss │  hit   │
//!                         │                                      ▼        │
//!                         │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!     Client Response     │  │  codec  │◀───│transform │◀───│  origin  │◀─┼──── Origin
//!     ◀───────────────────┼──│ + cache │    │ html/js  │    │  client  │  │
//!                         │  └─────────┘    └──────────┘    └──────────┘  │
//!                         │                                               │
//!                         │  Cross-cutting: config, security (CORS, API   │
//!                         │  allow-list), observability, lifecycle        │
//!                         └───────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod cache;
pub mod codec;
pub mod config;
pub mod http;
pub mod routing;
pub mod transform;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
