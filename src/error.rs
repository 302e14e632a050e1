//! Error types for context-window retrieval.

use crate::context::state::FailureReason;
use thiserror::Error;

/// Search backend errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Search authentication failed: {0}")]
    AuthFailed(String),

    #[error("Search index not found: {0}")]
    IndexNotFound(String),

    #[error("Malformed search response: {0}")]
    MalformedResponse(String),
}

/// Context retrieval errors
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("No sortable tie-breaker field among candidates: {candidates:?}")]
    InvalidTieBreaker { candidates: Vec<String> },

    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    #[error("Anchor id {id} matched {count} records")]
    AnchorNotUnique { id: String, count: usize },

    #[error("Anchor {id} has no usable value for time field {field}")]
    MissingTimeValue { id: String, field: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Malformed hit {id}: {reason}")]
    MalformedHit { id: String, reason: String },

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ContextError {
    /// Section failure reason recorded by the state machine for this error.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            ContextError::InvalidTieBreaker { .. } => FailureReason::InvalidTieBreaker,
            _ => FailureReason::Unknown,
        }
    }
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::ConfigError(err.to_string())
    }
}
