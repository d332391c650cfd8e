//! Virtual host lookup.
//!
//! # Responsibilities
//! - Store the hostname → (origin, site class) table
//! - Resolve a request hostname, or report NotFound
//! - Build upstream URIs for a resolved origin
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap
//! - Explicit NotFound rather than silent default

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;
use url::Url;

use crate::config::UpstreamsConfig;
use crate::routing::SiteClass;

/// Error building the routing table or an upstream URI.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid origin url '{url}': {reason}")]
    InvalidOrigin { url: String, reason: String },

    #[error("host '{0}' is mapped to more than one site")]
    DuplicateHost(String),

    #[error("cannot build upstream uri: {0}")]
    UpstreamUri(#[from] axum::http::Error),
}

/// An upstream origin, pre-split for URI rewriting.
#[derive(Debug, Clone)]
pub struct Origin {
    url: Url,
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl Origin {
    /// Parse an absolute http(s) URL.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidOrigin {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            "https" => Scheme::HTTPS,
            _ => return Err(invalid("scheme must be http or https")),
        };
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let authority = Authority::try_from(authority.as_str()).map_err(|e| invalid(&e.to_string()))?;
        let base_path = url.path().trim_end_matches('/').to_string();

        Ok(Self {
            url,
            scheme,
            authority,
            base_path,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Authority used as the upstream Host header.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite an inbound request URI onto this origin, joining any base path.
    pub fn upstream_uri(&self, inbound: &Uri) -> Result<Uri, RouteError> {
        let path_and_query = inbound
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/");
        let joined = format!("{}{}", self.base_path, path_and_query);

        let uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(joined)
            .build()?;
        Ok(uri)
    }
}

/// A resolved virtual host.
#[derive(Debug, Clone)]
pub struct VirtualHost {
    pub origin: Arc<Origin>,
    pub site: SiteClass,
}

/// Hostname → virtual host table.
#[derive(Debug, Default)]
pub struct VirtualHosts {
    hosts: HashMap<String, VirtualHost>,
}

impl VirtualHosts {
    /// Compile the table from configuration.
    pub fn from_config(config: &UpstreamsConfig) -> Result<Self, RouteError> {
        let mut hosts = HashMap::new();

        for (site, site_config) in config.sites() {
            if site_config.hosts.is_empty() {
                continue;
            }
            let origin = Arc::new(Origin::parse(&site_config.target_url)?);

            for host in &site_config.hosts {
                let name = host.to_ascii_lowercase();
                let entry = VirtualHost {
                    origin: origin.clone(),
                    site,
                };
                if hosts.insert(name, entry).is_some() {
                    return Err(RouteError::DuplicateHost(host.clone()));
                }
            }
            tracing::debug!(
                site = %site,
                origin = %site_config.target_url,
                hosts = site_config.hosts.len(),
                "Virtual hosts registered"
            );
        }

        Ok(Self { hosts })
    }

    /// Look up a hostname (port already stripped).
    pub fn resolve(&self, hostname: &str) -> Option<&VirtualHost> {
        self.hosts.get(&hostname.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
