//! Dispatch metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! every call is a no-op.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `waymark_dispatch_total` | Counter | `route`, `method`, `outcome` | Dispatched requests |
//! | `waymark_dispatch_duration_seconds` | Histogram | `route`, `method` | Dispatch latency |
//! | `waymark_dispatch_in_flight` | Gauge | - | Requests currently dispatching |
//! | `waymark_input_rejections_total` | Counter | `route`, `source` | Rejected params/query/body |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Dispatch counter name.
pub const DISPATCH_TOTAL: &str = "waymark_dispatch_total";

/// Dispatch latency histogram name.
pub const DISPATCH_DURATION: &str = "waymark_dispatch_duration_seconds";

/// In-flight gauge name.
pub const DISPATCH_IN_FLIGHT: &str = "waymark_dispatch_in_flight";

/// Input rejection counter name.
pub const INPUT_REJECTIONS: &str = "waymark_input_rejections_total";

/// Registers descriptions for all Waymark metrics.
///
/// Call after installing a recorder so exporters can show help text.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Total number of dispatched requests by outcome");
    describe_histogram!(DISPATCH_DURATION, "Dispatch duration in seconds");
    describe_gauge!(DISPATCH_IN_FLIGHT, "Number of requests currently dispatching");
    describe_counter!(INPUT_REJECTIONS, "Total input parse failures by request part");
}

/// Records a finished dispatch.
pub fn record_dispatch(route: &str, method: &str, outcome: &str, elapsed: Duration) {
    counter!(
        DISPATCH_TOTAL,
        "route" => route.to_string(),
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        DISPATCH_DURATION,
        "route" => route.to_string(),
        "method" => method.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Records an input parse failure.
pub fn record_input_rejection(route: &str, source: &str) {
    counter!(
        INPUT_REJECTIONS,
        "route" => route.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
}

/// Guard that tracks one in-flight dispatch.
///
/// Decrements on drop, so the gauge stays balanced when a step panics.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(DISPATCH_IN_FLIGHT).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(DISPATCH_IN_FLIGHT).decrement(1.0);
    }
}
