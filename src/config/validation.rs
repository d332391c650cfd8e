//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every routed hostname has exactly one origin
//! - Validate value ranges and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;
use crate::http::api::{HEALTHZ_PATH, READYZ_PATH, REFRESH_CACHE_PATH};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoVirtualHosts,
    MissingTargetUrl { site: &'static str },
    InvalidTargetUrl { site: &'static str, url: String },
    DuplicateHost { host: String },
    InvalidBindAddress(String),
    InvalidStaticPath(String),
    DuplicateStaticPath(String),
    ZeroAccessLogCapacity,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoVirtualHosts => write!(f, "no virtual hosts configured"),
            ValidationError::MissingTargetUrl { site } => {
                write!(f, "site '{}' has hosts but no target_url", site)
            }
            ValidationError::InvalidTargetUrl { site, url } => {
                write!(f, "site '{}' has invalid target_url '{}'", site, url)
            }
            ValidationError::DuplicateHost { host } => {
                write!(f, "host '{}' is routed more than once", host)
            }
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "invalid bind_address '{}'", addr)
            }
            ValidationError::InvalidStaticPath(path) => {
                write!(f, "invalid static file path '{}'", path)
            }
            ValidationError::DuplicateStaticPath(path) => {
                write!(f, "static file path '{}' is declared more than once", path)
            }
            ValidationError::ZeroAccessLogCapacity => {
                write!(f, "access_log_capacity must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let mut seen_hosts = HashSet::new();
    let mut host_count = 0;
    for (class, site) in config.upstreams.sites() {
        if site.hosts.is_empty() {
            continue;
        }
        host_count += site.hosts.len();

        if site.target_url.is_empty() {
            errors.push(ValidationError::MissingTargetUrl { site: class.as_str() });
        } else if !is_origin_url(&site.target_url) {
            errors.push(ValidationError::InvalidTargetUrl {
                site: class.as_str(),
                url: site.target_url.clone(),
            });
        }

        for host in &site.hosts {
            if !seen_hosts.insert(host.to_ascii_lowercase()) {
                errors.push(ValidationError::DuplicateHost { host: host.clone() });
            }
        }
    }
    if host_count == 0 {
        errors.push(ValidationError::NoVirtualHosts);
    }

    let reserved = [HEALTHZ_PATH, READYZ_PATH, REFRESH_CACHE_PATH];
    let mut seen_paths = HashSet::new();
    for route in &config.static_files.routes {
        if !is_literal_path(&route.path) || reserved.contains(&route.path.as_str()) {
            errors.push(ValidationError::InvalidStaticPath(route.path.clone()));
        } else if !seen_paths.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateStaticPath(route.path.clone()));
        }
    }

    if config.observability.access_log_capacity == 0 {
        errors.push(ValidationError::ZeroAccessLogCapacity);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An absolute, non-root path with no router capture syntax.
fn is_literal_path(path: &str) -> bool {
    path.starts_with('/')
        && path != "/"
        && !path.contains(['{', '}'])
        && !path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
}

fn is_origin_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
