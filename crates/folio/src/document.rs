//! The assembled document.
//!
//! A [`Document`] is immutable once built. It holds every block in source
//! order, the frozen type registry, one layout per laid-out diagram and all
//! diagnostics from every stage.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use folio_core::{
    data::{DataInstance, TableDef},
    diagram::DiagramGraph,
    layout::LayoutResult,
    span::SourceSpan,
};
use folio_parser::{
    Block, BlockContent, ParsedDocument, SourceMap, TypeRegistry,
    error::{Diagnostic, DiagnosticCollector, ErrorCode, ErrorKind, ParseError, Severity},
};

use crate::{config::LayoutConfig, error::FolioError, layout::layout_diagram};

/// One diagnostic resolved to lines and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    /// Location of the primary label, if the diagnostic has one.
    pub span: Option<SourceSpan>,
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub code: Option<ErrorCode>,
}

/// A diagram block together with its layout.
#[derive(Debug, Clone, Copy)]
pub struct DiagramView<'a> {
    /// Position of the block in [`Document::blocks`].
    pub block: usize,
    pub graph: &'a DiagramGraph,
    /// `None` when the graph has errors or a layout policy refused it.
    pub layout: Option<&'a LayoutResult>,
}

#[derive(Debug, Clone)]
pub struct Document {
    source_map: SourceMap,
    blocks: Vec<Block>,
    registry: TypeRegistry,
    layouts: BTreeMap<usize, LayoutResult>,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Lay out every valid diagram of `parsed` and gather the diagnostics.
    pub(crate) fn assemble(
        source_map: SourceMap,
        parsed: ParsedDocument,
        config: &LayoutConfig,
    ) -> Self {
        let ParsedDocument {
            blocks,
            registry,
            diagnostics,
        } = parsed;

        let mut collector = DiagnosticCollector::new();
        collector.extend(diagnostics);

        let mut layouts = BTreeMap::new();
        for (index, block) in blocks.iter().enumerate() {
            let BlockContent::Diagram {
                graph: Some(graph),
                valid: true,
            } = &block.content
            else {
                continue;
            };
            match layout_diagram(graph, config, &mut collector) {
                Ok(Some(layout)) => {
                    layouts.insert(index, layout);
                }
                Ok(None) => debug!(block = index; "Diagram layout skipped"),
                Err(err) => {
                    warn!(block = index, err:%; "Diagram layout failed");
                    collector.emit(
                        Diagnostic::error(format!("diagram could not be laid out: {err}"))
                            .with_label(block.span, "in this diagram"),
                    );
                }
            }
        }

        let mut diagnostics = collector.into_diagnostics();
        // Stable: equal offsets keep emission order.
        diagnostics.sort_by_key(|diagnostic| {
            diagnostic
                .primary_span()
                .map_or(usize::MAX, |span| span.start())
        });

        info!(
            document = source_map.document(),
            blocks = blocks.len(),
            layouts = layouts.len(),
            diagnostics = diagnostics.len();
            "Document built"
        );

        Self {
            source_map,
            blocks,
            registry,
            layouts,
            diagnostics,
        }
    }

    /// Document identifier given at build time.
    pub fn id(&self) -> &str {
        self.source_map.document()
    }

    pub fn source(&self) -> &str {
        self.source_map.source()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Blocks in source order, including failed ones.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Data instances that validated.
    pub fn data(&self) -> impl Iterator<Item = &DataInstance> {
        self.blocks.iter().filter_map(|block| match &block.content {
            BlockContent::Data(Some(instance)) => Some(instance),
            _ => None,
        })
    }

    /// Tables that validated.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.blocks.iter().filter_map(|block| match &block.content {
            BlockContent::Table(Some(table)) => Some(table),
            _ => None,
        })
    }

    /// Every diagram block that produced a graph, with its layout if any.
    pub fn diagrams(&self) -> impl Iterator<Item = DiagramView<'_>> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| match &block.content {
                BlockContent::Diagram {
                    graph: Some(graph), ..
                } => Some(DiagramView {
                    block: index,
                    graph,
                    layout: self.layouts.get(&index),
                }),
                _ => None,
            })
    }

    /// Layout of the diagram at block position `block`.
    pub fn layout(&self, block: usize) -> Option<&LayoutResult> {
        self.layouts.get(&block)
    }

    /// Diagnostics ordered by source offset.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics flattened to records with resolved locations.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.diagnostics
            .iter()
            .map(|diagnostic| DiagnosticRecord {
                severity: diagnostic.severity(),
                span: diagnostic
                    .primary_span()
                    .map(|span| self.source_map.resolve(span)),
                message: diagnostic.message().to_string(),
                kind: diagnostic.kind(),
                code: diagnostic.code(),
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Turn a document with errors into a [`FolioError::Parse`] carrying
    /// all of its diagnostics.
    ///
    /// # Errors
    ///
    /// Returns the error when any diagnostic has error severity.
    pub fn into_checked(self) -> Result<Self, FolioError> {
        if !self.has_errors() {
            return Ok(self);
        }
        let name = self.source_map.document().to_string();
        let source = self.source_map.source().to_string();
        Err(FolioError::new_parse_error(
            ParseError::new(self.diagnostics),
            source,
            name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_parser::{ParseConfig, parse_document};

    fn build(source: &str) -> Document {
        let parsed = parse_document(source, &ParseConfig::default());
        Document::assemble(
            SourceMap::new("test.folio", source),
            parsed,
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn test_only_valid_diagrams_are_laid_out() {
        let doc = build("graph { node A; node B; A -> B; }\n\ngraph { node A; A -> B; }\n");
        let views: Vec<DiagramView<'_>> = doc.diagrams().collect();
        assert_eq!(views.len(), 2);
        assert!(views[0].layout.is_some());
        assert!(views[1].layout.is_none());
        assert!(doc.layout(0).is_some());
        assert!(doc.has_errors());
    }

    #[test]
    fn test_records_resolve_lines() {
        let source = "struct Point { x: int; y: int; }\n\ndata Point p { x = 1; }\n";
        let doc = build(source);
        let records = doc.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, Some(ErrorCode::E300));
        assert_eq!(records[0].kind, Some(ErrorKind::Validation));
        let span = records[0].span.as_ref().expect("record has a span");
        assert_eq!(span.start.line, 3);
        assert_eq!(&*span.document, "test.folio");
    }

    #[test]
    fn test_diagnostics_sorted_by_offset() {
        let source = "graph { node A; A -> B; }\n\nstruct Point { x: int; x: int; }\n\ndata Missing m { }\n";
        let doc = build(source);
        let offsets: Vec<usize> = doc
            .diagnostics()
            .iter()
            .filter_map(|d| d.primary_span().map(|span| span.start()))
            .collect();
        assert!(offsets.len() >= 3);
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_into_checked() {
        let doc = build("struct Point { x: int; }\n\ndata Point p { x = 1; }\n");
        assert_eq!(doc.data().count(), 1);
        assert!(doc.into_checked().is_ok());

        let doc = build("data Point p { x = 1; }\n");
        match doc.into_checked() {
            Err(FolioError::Parse { err, name, .. }) => {
                assert_eq!(name, "test.folio");
                assert!(!err.diagnostics().is_empty());
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
