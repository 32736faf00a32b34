//! Collector for accumulating diagnostics during a processing phase.
//!
//! The [`DiagnosticCollector`] lets a phase report every problem it finds
//! instead of failing on the first one.

use crate::error::{Diagnostic, ParseError};

/// Accumulates diagnostics and remembers whether any of them is an error.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Emit every diagnostic from `diagnostics`.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.emit(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Number of diagnostics emitted so far.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns all diagnostics, warnings included.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Finish collection and return a result.
    ///
    /// - If there are errors, returns `Err(ParseError)` with all diagnostics.
    /// - If there are no errors, returns `Ok(())`; warnings are discarded.
    pub fn finish(self) -> Result<(), ParseError> {
        if self.has_errors {
            Err(ParseError::new(self.diagnostics))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use folio_core::span::Span;

    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_empty_collector_finishes_ok() {
        let collector = DiagnosticCollector::new();
        assert!(collector.is_empty());
        assert!(collector.finish().is_ok());
    }

    #[test]
    fn test_warnings_only_finishes_ok() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("naming").with_code(ErrorCode::E207));

        assert!(!collector.has_errors());
        assert!(collector.finish().is_ok());
    }

    #[test]
    fn test_errors_are_returned() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(
            Diagnostic::error("undefined node `B`")
                .with_code(ErrorCode::E306)
                .with_label(Span::new(0..1), "not declared"),
        );
        collector.emit(Diagnostic::warning("unused"));

        assert_eq!(collector.len(), 2);
        let err = collector.finish().unwrap_err();
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn test_into_diagnostics_keeps_warnings() {
        let mut collector = DiagnosticCollector::new();
        collector.extend([Diagnostic::warning("a"), Diagnostic::warning("b")]);
        assert_eq!(collector.into_diagnostics().len(), 2);
    }
}
