//! Dispatch diagnostics.
//!
//! The dispatcher reports anomalies (rejected input, undeclared statuses,
//! malformed redirects, failed steps) to an injected [`Diagnostics`]
//! observer instead of writing to a global logger. [`TracingDiagnostics`]
//! forwards them to `tracing`; tests can install a recorder.

use http::StatusCode;
use std::fmt;
use waymark_core::InputSource;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// Fine-grained detail.
    Debug,
    /// Informational.
    Info,
    /// Something unexpected that did not fail the request.
    Warn,
    /// A request failed.
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Params, query or body failed schema parsing.
    InputRejected {
        /// The request part that failed.
        source: InputSource,
        /// The parse error.
        message: String,
    },
    /// A step answered with a status the endpoint never declared.
    UnknownStatus {
        /// The undeclared status.
        status: StatusCode,
    },
    /// A redirect-class response carried no `redirect_url`.
    MalformedRedirect {
        /// The redirect status.
        status: StatusCode,
    },
    /// A step returned an error or panicked.
    StepFailed {
        /// The step name.
        step: String,
        /// The error message.
        message: String,
    },
}

/// One diagnostic event, attributed to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// The route pattern of the endpoint.
    pub route: String,
    /// What happened.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Input parsing rejected part of the request.
    pub fn input_rejected(
        route: impl Into<String>,
        source: InputSource,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            route: route.into(),
            kind: DiagnosticKind::InputRejected {
                source,
                message: message.into(),
            },
        }
    }

    /// A terminal response used an undeclared status.
    pub fn unknown_status(route: impl Into<String>, status: StatusCode) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            route: route.into(),
            kind: DiagnosticKind::UnknownStatus { status },
        }
    }

    /// A redirect response had no usable target.
    pub fn malformed_redirect(route: impl Into<String>, status: StatusCode) -> Self {
        Self {
            level: DiagnosticLevel::Warn,
            route: route.into(),
            kind: DiagnosticKind::MalformedRedirect { status },
        }
    }

    /// A step failed.
    pub fn step_failed(
        route: impl Into<String>,
        step: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            route: route.into(),
            kind: DiagnosticKind::StepFailed {
                step: step.into(),
                message: message.into(),
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::InputRejected { source, message } => {
                write!(f, "'{}': {source} validation failed: {message}", self.route)
            }
            DiagnosticKind::UnknownStatus { status } => write!(
                f,
                "'{}': unknown status code {}",
                self.route,
                status.as_u16()
            ),
            DiagnosticKind::MalformedRedirect { status } => write!(
                f,
                "'{}': redirect status {} without redirect_url",
                self.route,
                status.as_u16()
            ),
            DiagnosticKind::StepFailed { step, message } => {
                write!(f, "'{}': step '{step}' failed: {message}", self.route)
            }
        }
    }
}

/// Receives diagnostics from the dispatcher.
///
/// Implementations are shared by every request of an endpoint and must be
/// cheap; they run inline on the request task.
pub trait Diagnostics: Send + Sync {
    /// Handles one diagnostic.
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, diagnostic: &Diagnostic) {
        let route = diagnostic.route.as_str();
        match diagnostic.level {
            DiagnosticLevel::Debug => tracing::debug!(route, "{diagnostic}"),
            DiagnosticLevel::Info => tracing::info!(route, "{diagnostic}"),
            DiagnosticLevel::Warn => tracing::warn!(route, "{diagnostic}"),
            DiagnosticLevel::Error => tracing::error!(route, "{diagnostic}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_rejected_message() {
        let diagnostic =
            Diagnostic::input_rejected("/users/:id", InputSource::Query, "expected integer");
        assert_eq!(diagnostic.level, DiagnosticLevel::Warn);
        assert_eq!(
            diagnostic.to_string(),
            "'/users/:id': query validation failed: expected integer"
        );
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            Diagnostic::unknown_status("/a", StatusCode::IM_A_TEAPOT).to_string(),
            "'/a': unknown status code 418"
        );
        assert_eq!(
            Diagnostic::malformed_redirect("/a", StatusCode::FOUND).to_string(),
            "'/a': redirect status 302 without redirect_url"
        );
    }

    #[test]
    fn test_step_failed_is_error() {
        let diagnostic = Diagnostic::step_failed("/a", "auth", "boom");
        assert_eq!(diagnostic.level, DiagnosticLevel::Error);
        assert!(diagnostic.level > DiagnosticLevel::Warn);
        assert_eq!(diagnostic.to_string(), "'/a': step 'auth' failed: boom");
    }

    #[test]
    fn test_tracing_diagnostics_without_subscriber() {
        TracingDiagnostics.emit(&Diagnostic::unknown_status("/a", StatusCode::OK));
    }
}
