//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every response:
//!     → cors.rs (reset CORS headers from the allow-list, drop X-Frame-Options)
//!
//! Refresh-cache request:
//!     → access_control.rs (Host allow-list, else treated as proxy traffic)
//!
//! Origin request:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*, rewrite Host)
//! ```
//!
//! # Design Decisions
//! - One CORS policy for every serving path
//! - Allow-lists are fixed at startup

pub mod access_control;
pub mod cors;
pub mod headers;

pub use access_control::ApiAccess;
pub use cors::{cors_middleware, requester_origin, CorsPolicy};
