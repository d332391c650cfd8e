//! Content transform pipeline.
//!
//! # Data Flow
//! ```text
//! Origin 2xx body (already decoded)
//!     → path == root_path          → html.rs (title, meta, scripts, base)
//!     → path == worker_script_path → script.rs (guard literals → true)
//!     → anything else              → untouched
//!     → cache write + client response
//! ```
//!
//! # Design Decisions
//! - Exactly two fixed targets, selected by request path
//! - Runs once per fetched representation, before caching
//! - An HTML rewrite failure fails the request; nothing is cached

pub mod html;
pub mod script;

pub use html::RootDocument;
pub use script::WorkerScript;

use crate::config::TransformConfig;

/// Errors raised while rewriting a fetched body.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("root document rewrite failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),
}

/// The fixed, path-keyed rewrites.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    root_path: String,
    root: RootDocument,
    worker_path: String,
    worker: WorkerScript,
}

impl TransformPipeline {
    pub fn from_config(config: &TransformConfig) -> Self {
        Self {
            root_path: config.root_path.clone(),
            root: RootDocument::from_config(config),
            worker_path: config.worker_script_path.clone(),
            worker: WorkerScript::new(&config.worker_guards),
        }
    }

    /// Whether `path` is one of the rewritten resources.
    pub fn targets(&self, path: &str) -> bool {
        path == self.root_path || path == self.worker_path
    }

    /// Apply the rewrite registered for `path`, if any.
    pub fn apply(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        if path == self.root_path {
            return self.root.rewrite(&body);
        }
        if path == self.worker_path {
            return Ok(self.worker.patch(body));
        }
        Ok(body)
    }
}
