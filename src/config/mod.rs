//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into routing tables, policies and the cache store at startup
//! ```
//!
//! # Design Decisions
//! - Config is loaded once; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ApiConfig, CacheConfig, CorsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ProxyConfig, SiteConfig, StaticFilesConfig, StaticRoute, TransformConfig, UpstreamsConfig,
};
