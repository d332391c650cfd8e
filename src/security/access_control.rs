//! Management API access control.
//!
//! The refresh-cache endpoint only answers requests whose Host is on a
//! static allow-list. Other callers are not refused; their request is
//! handled as ordinary proxy traffic instead.

use std::collections::HashSet;

use crate::routing::strip_port;

#[derive(Debug, Clone, Default)]
pub struct ApiAccess {
    hosts: HashSet<String>,
}

impl ApiAccess {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Whether a raw Host value may call the API. Entries match either the
    /// full value (with port) or the bare hostname.
    pub fn permits(&self, host: Option<&str>) -> bool {
        let Some(host) = host.map(str::to_ascii_lowercase) else {
            return false;
        };
        self.hosts.contains(&host) || self.hosts.contains(strip_port(&host))
    }
}
