//! Offset to line/column resolution.

use std::sync::Arc;

use folio_core::span::{LineCol, SourceSpan, Span};

/// Line index over one document's source text.
///
/// Resolves byte [`Span`]s into [`SourceSpan`]s with 1-based lines and
/// columns counted in chars.
///
/// # Example
///
/// ```
/// # use folio_parser::{SourceMap, Span};
/// let map = SourceMap::new("notes.folio", "first\nsecond line");
/// let resolved = map.resolve(Span::new(6..12));
/// assert_eq!((resolved.start.line, resolved.start.column), (2, 1));
/// assert_eq!((resolved.end.line, resolved.end.column), (2, 7));
/// ```
#[derive(Debug, Clone)]
pub struct SourceMap {
    document: Arc<str>,
    source: Arc<str>,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(document: impl Into<Arc<str>>, source: impl Into<Arc<str>>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            document: document.into(),
            source,
            line_starts,
        }
    }

    /// Document identifier this map was built for.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line and column of a byte offset. Offsets past the end clamp to the end.
    pub fn line_col(&self, offset: usize) -> LineCol {
        let offset = self.clamp(offset);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self.source[line_start..offset].chars().count() + 1;
        LineCol {
            line: line + 1,
            column,
        }
    }

    pub fn resolve(&self, span: Span) -> SourceSpan {
        SourceSpan {
            document: Arc::clone(&self.document),
            span,
            start: self.line_col(span.start()),
            end: self.line_col(span.end()),
        }
    }

    /// Text covered by `span`, or an empty string if it is out of range.
    pub fn slice(&self, span: Span) -> &str {
        self.source.get(span.range()).unwrap_or_default()
    }

    /// Steps back to the nearest char boundary so slicing never panics.
    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.source.len());
        while !self.source.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let map = SourceMap::new("doc", "abc\ndef");
        assert_eq!(map.line_col(0), LineCol { line: 1, column: 1 });
        assert_eq!(map.line_col(3), LineCol { line: 1, column: 4 });
        assert_eq!(map.line_col(4), LineCol { line: 2, column: 1 });
        assert_eq!(map.line_count(), 2);
    }

    #[test]
    fn test_columns_count_chars() {
        let map = SourceMap::new("doc", "é = 1");
        // `=` starts at byte 3 but is the third char.
        assert_eq!(map.line_col(3).column, 3);
    }

    #[test]
    fn test_offsets_clamp() {
        let map = SourceMap::new("doc", "ab");
        assert_eq!(map.line_col(99), LineCol { line: 1, column: 3 });
        let map = SourceMap::new("doc", "é");
        assert_eq!(map.line_col(1), LineCol { line: 1, column: 1 });
    }

    #[test]
    fn test_resolve_keeps_document() {
        let map = SourceMap::new("notes.folio", "x\ny");
        let span = map.resolve(Span::new(2..3));
        assert_eq!(&*span.document, "notes.folio");
        assert_eq!(span.to_string(), "notes.folio:2:1");
        assert_eq!(map.slice(Span::new(2..3)), "y");
    }
}
