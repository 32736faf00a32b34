//! Miette reports for Folio errors and diagnostics.
//!
//! Each [`folio_parser::error::Diagnostic`] becomes its own [`Report`], so a
//! document with several problems prints one snippet per problem.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, Severity as MietteSeverity, SourceCode};

use folio::FolioError;
use folio_parser::error::{Diagnostic, Severity};

/// One printable report.
pub enum Report<'a> {
    /// A diagnostic located in `source`.
    Located {
        diagnostic: &'a Diagnostic,
        source: &'a str,
    },
    /// An error with no source location.
    Plain(&'a FolioError),
}

impl<'a> Report<'a> {
    pub fn located(diagnostic: &'a Diagnostic, source: &'a str) -> Self {
        Self::Located { diagnostic, source }
    }

    /// Stable code for errors that carry none of their own.
    fn plain_code(err: &FolioError) -> Option<&'static str> {
        match err {
            FolioError::Io(_) => Some("folio::io"),
            FolioError::Parse { .. } => None,
            FolioError::Layout(_) => Some("folio::layout"),
            FolioError::Config(_) => Some("folio::config"),
        }
    }
}

impl fmt::Debug for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Located { diagnostic, .. } => f.debug_tuple("Located").field(diagnostic).finish(),
            Self::Plain(err) => f.debug_tuple("Plain").field(err).finish(),
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Located { diagnostic, .. } => f.write_str(diagnostic.message()),
            Self::Plain(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Report<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Located { .. } => None,
            Self::Plain(err) => std::error::Error::source(*err),
        }
    }
}

impl MietteDiagnostic for Report<'_> {
    fn code<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        match self {
            Self::Located { diagnostic, .. } => diagnostic
                .code()
                .map(|code| Box::new(code) as Box<dyn fmt::Display>),
            Self::Plain(err) => {
                Self::plain_code(err).map(|code| Box::new(code) as Box<dyn fmt::Display>)
            }
        }
    }

    fn severity(&self) -> Option<MietteSeverity> {
        let Self::Located { diagnostic, .. } = self else {
            return None;
        };
        Some(match diagnostic.severity() {
            Severity::Error => MietteSeverity::Error,
            Severity::Warning => MietteSeverity::Warning,
        })
    }

    fn help<'b>(&'b self) -> Option<Box<dyn fmt::Display + 'b>> {
        match self {
            Self::Located { diagnostic, .. } => diagnostic
                .help()
                .map(|help| Box::new(help) as Box<dyn fmt::Display>),
            Self::Plain(FolioError::Config(_)) => Some(Box::new(
                "pass a valid file with --config or remove the broken one",
            )),
            Self::Plain(_) => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            Self::Located { source, .. } => Some(source as &dyn SourceCode),
            Self::Plain(_) => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let Self::Located { diagnostic, .. } = self else {
            return None;
        };
        if diagnostic.labels().is_empty() {
            return None;
        }
        Some(Box::new(diagnostic.labels().iter().map(|label| {
            let span = label.span();
            let at = miette::SourceSpan::new(span.start().into(), span.len());
            let text = Some(label.message().to_string());
            if label.is_primary() {
                LabeledSpan::new_primary_with_span(text, at)
            } else {
                LabeledSpan::new_with_span(text, at)
            }
        })))
    }
}

/// One report per diagnostic for [`FolioError::Parse`], a single one for
/// every other variant.
pub fn reports(err: &FolioError) -> Vec<Report<'_>> {
    match err {
        FolioError::Parse { err: parse_err, src, .. } => parse_err
            .diagnostics()
            .iter()
            .map(|diagnostic| Report::located(diagnostic, src))
            .collect(),
        other => vec![Report::Plain(other)],
    }
}

/// Render one report with miette's graphical handler, falling back to its
/// plain message.
pub fn render(report: &Report<'_>) -> String {
    let mut out = String::new();
    if miette::GraphicalReportHandler::new()
        .render_report(&mut out, report)
        .is_err()
    {
        out = report.to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use folio_parser::{
        Span,
        error::{ErrorCode, ParseError},
    };

    use super::*;

    #[test]
    fn test_each_diagnostic_is_reported() {
        let diags = vec![
            Diagnostic::error("first error")
                .with_code(ErrorCode::E300)
                .with_label(Span::new(0..5), "first"),
            Diagnostic::warning("naming")
                .with_code(ErrorCode::E207)
                .with_label(Span::new(10..15), "second")
                .with_help("rename it"),
        ];
        let err = FolioError::new_parse_error(ParseError::from(diags), "source code here...", "doc.folio");

        let all = reports(&err);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].to_string(), "first error");
        assert_eq!(all[0].severity(), Some(MietteSeverity::Error));
        assert_eq!(all[1].severity(), Some(MietteSeverity::Warning));
        assert_eq!(
            all[1].help().map(|h| h.to_string()).as_deref(),
            Some("rename it")
        );
    }

    #[test]
    fn test_plain_error_has_code() {
        let err = FolioError::Layout("no room".to_string());
        let all = reports(&err);
        assert_eq!(all.len(), 1);
        let code = all[0].code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("folio::layout"));
        assert!(all[0].labels().is_none());
        assert!(all[0].source_code().is_none());
    }

    #[test]
    fn test_labels_keep_primary_flag() {
        let diag = Diagnostic::error("error with labels")
            .with_label(Span::new(0..5), "primary")
            .with_secondary_label(Span::new(10..15), "secondary");
        let report = Report::located(&diag, "some source code");

        let labels: Vec<_> = report.labels().expect("labels present").collect();
        assert_eq!(labels.len(), 2);
        assert!(labels[0].primary());
        assert!(!labels[1].primary());
        assert_eq!(labels[1].label(), Some("secondary"));
    }

    #[test]
    fn test_render_includes_code() {
        let diag = Diagnostic::error("undefined node `B`")
            .with_code(ErrorCode::E306)
            .with_label(Span::new(16..22), "not declared");
        let source = "graph { node A; A -> B; }";
        let rendered = render(&Report::located(&diag, source));
        assert!(rendered.contains("E306"));
        assert!(rendered.contains("undefined node"));
    }
}
