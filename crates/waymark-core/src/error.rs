//! Error types for Waymark.
//!
//! This module provides [`WaymarkError`], the error type threaded through
//! middleware steps, handlers and the dispatcher, together with the
//! schema-level [`ValidationError`] produced by [`Schema::parse`].
//!
//! # Error flow
//!
//! | Variant            | Raised by                         | Recovered by dispatcher? |
//! |--------------------|-----------------------------------|--------------------------|
//! | `InvalidInput`     | input parsing step                | no (500 + error callback) |
//! | `ResponseMapping`  | resource mapping of response data | no                        |
//! | `ResponseClosed`   | legacy middleware adapter         | no                        |
//! | `StepPanicked`     | any step that panics              | no                        |
//! | `Other`            | application middleware / handlers | no                        |
//!
//! [`Schema::parse`]: crate::Schema::parse

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using [`WaymarkError`].
pub type WaymarkResult<T> = Result<T, WaymarkError>;

/// Which part of the request an input schema was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Path parameters (e.g. `/users/:id`).
    Params,
    /// Query string parameters.
    Query,
    /// Request body.
    Body,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Params => write!(f, "params"),
            Self::Query => write!(f, "query"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// A validation error from schema parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The JSON path where the error occurred (`$` is the root).
    pub path: String,
    /// The error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error at the given path.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error at '{}': {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// One failed input parse, recorded by the input parsing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFailure {
    /// The request part that failed.
    pub source: InputSource,
    /// The underlying schema error.
    pub error: ValidationError,
}

impl fmt::Display for InputFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Coarse classification of a [`WaymarkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The client sent input that did not match the declared schemas.
    Validation,
    /// The transport went away underneath a running step.
    Transport,
    /// Anything else: mapping failures, panics, application errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the HTTP status a generic error response would use.
    ///
    /// The dispatcher itself always answers failed requests with a bare 500;
    /// this mapping is for applications that install their own error callback.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Transport | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Waymark.
///
/// # Example
///
/// ```
/// use waymark_core::{ErrorCategory, WaymarkError};
///
/// let err = WaymarkError::from(anyhow::anyhow!("database unavailable"));
/// assert_eq!(err.category(), ErrorCategory::Internal);
/// assert_eq!(err.to_string(), "database unavailable");
/// ```
#[derive(Error, Debug)]
pub enum WaymarkError {
    /// One or more of path params, query or body failed schema parsing.
    #[error("invalid input for '{route}': {}", join_failures(.failures))]
    InvalidInput {
        /// The route pattern of the endpoint.
        route: String,
        /// Every failed parse, in params/query/body order.
        failures: Vec<InputFailure>,
    },

    /// A response resource mapping rejected the handler's data.
    #[error("response mapping failed for status {status}: {source}")]
    ResponseMapping {
        /// The status whose mapper failed.
        status: StatusCode,
        /// The mapping error.
        #[source]
        source: ValidationError,
    },

    /// The transport response closed before a middleware finished.
    #[error("response closed before middleware '{middleware}' finished")]
    ResponseClosed {
        /// Name of the middleware that was interrupted.
        middleware: String,
    },

    /// A step panicked while running.
    #[error("step '{step}' panicked: {message}")]
    StepPanicked {
        /// Name of the step.
        step: String,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Application-level error raised by a middleware or handler.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_failures(failures: &[InputFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WaymarkError {
    /// Creates an application error from a message.
    #[must_use]
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Other(anyhow::Error::msg(message))
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::ResponseClosed { .. } => ErrorCategory::Transport,
            Self::ResponseMapping { .. }
            | Self::StepPanicked { .. }
            | Self::Serialization(_)
            | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the input failures if this is an [`WaymarkError::InvalidInput`].
    #[must_use]
    pub fn input_failures(&self) -> &[InputFailure] {
        match self {
            Self::InvalidInput { failures, .. } => failures,
            _ => &[],
        }
    }
}
