//! Labeled source spans attached to diagnostics.

use folio_core::span::Span;

/// A message pinned to a source span.
///
/// Primary labels mark where the problem is; secondary labels add context
/// such as "first defined here".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    span: Span,
    message: String,
    is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: true,
        }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            is_primary: false,
        }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_secondary(&self) -> bool {
        !self.is_primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_label() {
        let label = Label::primary(Span::new(1..4), "here");
        assert!(label.is_primary());
        assert!(!label.is_secondary());
        assert_eq!(label.span(), Span::new(1..4));
        assert_eq!(label.message(), "here");
    }

    #[test]
    fn test_secondary_label() {
        let label = Label::secondary(Span::new(0..2), "first defined here");
        assert!(label.is_secondary());
    }
}
