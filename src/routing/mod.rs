//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → matcher.rs (extract hostname, strip port)
//!     → router.rs (virtual host lookup)
//!     → Return: (origin, site class) or NotFound
//!
//! Table Compilation (at startup):
//!     UpstreamsConfig
//!     → Parse origin URLs
//!     → Freeze as immutable VirtualHosts
//! ```
//!
//! # Design Decisions
//! - Tables compiled at startup, immutable at runtime
//! - Unknown hosts are answered with 403, never 404
//! - Deterministic: same hostname always maps to the same origin

pub mod matcher;
pub mod router;

use serde::{Deserialize, Serialize};

pub use matcher::{request_host, request_hostname, strip_port};
pub use router::{Origin, RouteError, VirtualHost, VirtualHosts};

/// Logical grouping of virtual hosts; selects the origin and cache subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteClass {
    Main,
    Res,
}

impl SiteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteClass::Main => "main",
            SiteClass::Res => "res",
        }
    }

    /// Name of this site's directory under the cache root.
    pub fn cache_dir(&self) -> String {
        format!("{}.site", self.as_str())
    }
}

impl std::fmt::Display for SiteClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
