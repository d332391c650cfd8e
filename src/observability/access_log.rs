//! Asynchronous access log.
//!
//! # Responsibilities
//! - Accept one record per request without blocking the handler
//! - Drain records on a single background task as structured events
//!
//! # Design Decisions
//! - Bounded queue; when full the record is dropped, a warning is logged
//!   and the drop counter is incremented
//! - No flush on shutdown: records still queued at exit are lost

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::observability::metrics;

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// Served from the cache file at `path`.
    Cache { path: PathBuf },
    /// Relayed from the origin request to `url`.
    Origin { url: String },
    /// Answered locally (static override, API, unknown host).
    Local,
}

/// One access record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub request_id: String,
    pub client_ip: String,
    pub method: String,
    pub url: String,
    pub user_agent: String,
    pub status: u16,
    pub latency: Duration,
    pub source: LogSource,
    pub error: Option<String>,
}

impl LogRecord {
    pub fn cache_hit(&self) -> bool {
        matches!(self.source, LogSource::Cache { .. })
    }
}

/// Producer handle; cheap to clone into every request.
#[derive(Debug, Clone)]
pub struct AccessLog {
    tx: mpsc::Sender<LogRecord>,
}

impl AccessLog {
    /// A handle and the receiving end of its queue, without a drain task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LogRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create the queue and start the drain task.
    pub fn spawn(capacity: usize) -> Self {
        let (log, rx) = Self::channel(capacity);
        tokio::spawn(drain(rx));
        log
    }

    /// Enqueue a record without waiting.
    pub fn emit(&self, record: LogRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                metrics::record_log_dropped();
                tracing::warn!(
                    request_id = %record.request_id,
                    url = %record.url,
                    "Access log queue full, record dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Access log drain stopped, record discarded");
            }
        }
    }
}

/// Write every queued record until all producers are gone.
pub async fn drain(mut rx: mpsc::Receiver<LogRecord>) {
    while let Some(record) = rx.recv().await {
        write_record(&record);
    }
}

fn write_record(r: &LogRecord) {
    let latency_ms = r.latency.as_secs_f64() * 1000.0;
    let error = r.error.as_deref().unwrap_or("");

    match &r.source {
        LogSource::Cache { path } => tracing::info!(
            target: "access_log",
            request_id = %r.request_id,
            client_ip = %r.client_ip,
            method = %r.method,
            url = %r.url,
            user_agent = %r.user_agent,
            status = r.status,
            latency_ms,
            cache_hit = true,
            cache_path = %path.display(),
            error,
            "Served from cache"
        ),
        LogSource::Origin { url } => tracing::info!(
            target: "access_log",
            request_id = %r.request_id,
            client_ip = %r.client_ip,
            method = %r.method,
            url = %r.url,
            user_agent = %r.user_agent,
            status = r.status,
            latency_ms,
            cache_hit = false,
            upstream_url = %url,
            error,
            "Proxied to origin"
        ),
        LogSource::Local => tracing::info!(
            target: "access_log",
            request_id = %r.request_id,
            client_ip = %r.client_ip,
            method = %r.method,
            url = %r.url,
            user_agent = %r.user_agent,
            status = r.status,
            latency_ms,
            cache_hit = false,
            error,
            "Answered locally"
        ),
    }
}
