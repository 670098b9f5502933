//! Error types for OpenAPI generation.

use thiserror::Error;

/// Errors that can occur during documentation generation.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Failed to serialize the document to JSON.
    #[error("failed to serialize OpenAPI document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Two endpoints document the same method and path.
    #[error("duplicate operation {method} {path}")]
    DuplicateOperation {
        /// HTTP method.
        method: String,
        /// OpenAPI path.
        path: String,
    },

    /// Two endpoints share an operation id.
    #[error("duplicate operation id '{operation_id}'")]
    DuplicateOperationId {
        /// The repeated id.
        operation_id: String,
    },

    /// Two different resources were registered under one component name.
    #[error("component schema '{name}' is registered with two different shapes")]
    ConflictingComponent {
        /// The component name.
        name: String,
    },

    /// The endpoint cannot be expressed as an OpenAPI operation.
    #[error("invalid operation '{operation_id}': {reason}")]
    InvalidOperation {
        /// The operation id.
        operation_id: String,
        /// Why the operation is invalid.
        reason: String,
    },
}

/// Result type for documentation operations.
pub type DocsResult<T> = Result<T, DocsError>;
