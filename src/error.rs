//! Error taxonomy for the watcher.
//!
//! Expected conditions (a skipped slot, a rate-limited send) are absorbed by
//! the component that sees them. Everything else surfaces as [`WatcherError`]
//! and stops the poll loop.

use crate::types::Height;
use thiserror::Error;

/// Failure talking to the chain RPC or the price feed.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(String),

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Well-formed JSON that lacks the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(e: serde_json::Error) -> Self {
        UpstreamError::Json(e.to_string())
    }
}

/// Outcome of a failed `getBlock` call.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The node had no block for this slot (skipped or empty). Not fatal.
    #[error("no block available at height {0}")]
    Missing(Height),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Failure reported by the chat sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink asked us to back off for `retry_after` seconds.
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// Sink rejected the message.
    #[error("sink rejected message ({code}): {description}")]
    Rejected { code: i64, description: String },

    #[error("sink HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(e: reqwest::Error) -> Self {
        SinkError::Http(e.to_string())
    }
}

/// Fatal error that halts the poll loop.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("delivery failed: {0}")]
    Sink(#[from] SinkError),
}
