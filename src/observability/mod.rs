//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers produce:
//!     → access_log.rs (one LogRecord per request, bounded queue)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → access_log drain task → tracing events (target "access_log")
//!     → logging.rs subscriber → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request handlers never wait on log output
//! - Request ID flows through every record
//! - Metrics are cheap (atomic increments)

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::{AccessLog, LogRecord, LogSource};
