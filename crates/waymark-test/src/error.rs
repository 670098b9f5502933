//! Test error types.

use thiserror::Error;

/// Errors that can occur while building test fixtures.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Header name or value is invalid.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}
