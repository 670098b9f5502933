//! Observability for Waymark.
//!
//! - **Logging**: `tracing-subscriber` setup with JSON or pretty output ([`init_logging`])
//! - **Diagnostics**: the observer the dispatcher reports anomalies to ([`Diagnostics`])
//! - **Metrics**: dispatch counters and latency through the `metrics` facade ([`record_dispatch`])

#![warn(missing_docs)]

pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod metrics;

pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics, TracingDiagnostics};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{describe_metrics, record_dispatch, record_input_rejection, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
