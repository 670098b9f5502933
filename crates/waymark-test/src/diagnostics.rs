//! Recording diagnostics observer.

use parking_lot::Mutex;
use waymark_telemetry::{Diagnostic, DiagnosticKind, DiagnosticLevel, Diagnostics};

/// A [`Diagnostics`] observer that keeps every event.
///
/// ```
/// use http::StatusCode;
/// use waymark_telemetry::{Diagnostic, Diagnostics};
/// use waymark_test::RecordingDiagnostics;
///
/// let diagnostics = RecordingDiagnostics::new();
/// diagnostics.emit(&Diagnostic::unknown_status("/a", StatusCode::IM_A_TEAPOT));
/// assert_eq!(diagnostics.warnings().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded diagnostic.
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Returns diagnostics at `Warn` level.
    #[must_use]
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.at_level(DiagnosticLevel::Warn)
    }

    /// Returns diagnostics at `Error` level.
    #[must_use]
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.at_level(DiagnosticLevel::Error)
    }

    /// Returns the kinds of every recorded diagnostic.
    #[must_use]
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.entries.lock().iter().map(|d| d.kind.clone()).collect()
    }

    /// Returns the rendered messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(ToString::to_string).collect()
    }

    fn at_level(&self, level: DiagnosticLevel) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .iter()
            .filter(|d| d.level == level)
            .cloned()
            .collect()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.entries.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::InputSource;

    #[test]
    fn test_levels() {
        let diagnostics = RecordingDiagnostics::new();
        diagnostics.emit(&Diagnostic::input_rejected("/a", InputSource::Body, "bad"));
        diagnostics.emit(&Diagnostic::step_failed("/a", "handler", "boom"));

        assert_eq!(diagnostics.entries().len(), 2);
        assert_eq!(diagnostics.warnings().len(), 1);
        assert_eq!(diagnostics.errors().len(), 1);
        assert_eq!(diagnostics.messages()[0], "'/a': body validation failed: bad");
    }
}
