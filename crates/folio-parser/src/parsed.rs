//! Whole-document parsing.
//!
//! [`parse_document`] runs every stage except layout:
//!
//! 1. segment the source into raw blocks;
//! 2. tokenize and parse each block;
//! 3. register every declaration, then freeze the registry;
//! 4. bind data instances and tables against the frozen registry;
//! 5. build each diagram graph.
//!
//! A block that fails any stage keeps its place in the block list with an
//! absent value. Later blocks are still processed.

use indexmap::IndexMap;
use log::{debug, trace};
use serde::Serialize;

use folio_core::{
    block::{BlockKind, ProseKind},
    data::{DataInstance, TableDef},
    diagram::DiagramGraph,
    identifier::Id,
    span::Span,
};

use crate::{
    binder::Binder,
    config::ParseConfig,
    diagram::build_diagram,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    lexer::tokenize,
    parser::{self, significant},
    parser_types::{DataDecl, GraphDecl, TableDecl},
    registry::{TypeRegistry, TypeRegistryBuilder},
    segment::{RawBlock, segment},
};

/// Parsed content of one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockContent {
    Prose {
        kind: ProseKind,
        text: String,
    },
    /// A `type`, `struct`, `enum` or `const` block. The definition itself
    /// lives in the registry; `name` is `None` if it was not registered.
    Definition { name: Option<Id> },
    Data(Option<DataInstance>),
    Table(Option<TableDef>),
    /// `valid` is false when the graph has errors and must not be laid out.
    Diagram {
        graph: Option<DiagramGraph>,
        valid: bool,
    },
    Math {
        body: String,
    },
    Config {
        name: Option<String>,
        body: String,
    },
    Code {
        language: Option<String>,
        body: String,
    },
}

/// One top-level block in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    pub span: Span,
    /// Raw source text of the whole block.
    pub text: String,
    pub content: BlockContent,
}

impl Block {
    pub fn diagram(&self) -> Option<&DiagramGraph> {
        match &self.content {
            BlockContent::Diagram { graph, .. } => graph.as_ref(),
            _ => None,
        }
    }
}

/// Output of [`parse_document`].
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    pub registry: TypeRegistry,
    /// Diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

enum Deferred<'src> {
    Data(DataDecl<'src>),
    Table(TableDecl<'src>),
    Diagram(GraphDecl<'src>),
}

/// Parse and validate a whole document.
///
/// # Example
///
/// ```
/// # use folio_parser::{BlockContent, ParseConfig, parse_document};
/// let source = "struct Point { x: int; y: int; }\n\ndata Point p { x = 1; y = 2; }\n";
/// let parsed = parse_document(source, &ParseConfig::default());
/// assert!(parsed.diagnostics.is_empty());
/// assert!(matches!(parsed.blocks[1].content, BlockContent::Data(Some(_))));
/// ```
pub fn parse_document(source: &str, config: &ParseConfig) -> ParsedDocument {
    let mut diagnostics = DiagnosticCollector::new();
    let segmentation = segment(source);
    if let Some(unterminated) = segmentation.unterminated {
        diagnostics.emit(unterminated);
    }

    let mut registry = TypeRegistryBuilder::new();
    let mut blocks = Vec::with_capacity(segmentation.blocks.len());
    let mut deferred: Vec<(usize, Deferred<'_>)> = Vec::new();

    // Pass 1: parse every block and register declarations.
    for raw in &segmentation.blocks {
        let index = blocks.len();
        let content = match raw.kind {
            BlockKind::Prose(kind) => BlockContent::Prose {
                kind,
                text: raw.text.to_string(),
            },
            BlockKind::TypeAlias | BlockKind::Struct | BlockKind::Enum | BlockKind::Const => {
                let name = parse_block(raw, &mut diagnostics, |tokens| {
                    parser::parse_declaration(tokens)
                })
                .and_then(|decl| {
                    registry
                        .register(&decl)
                        .then(|| Id::new(decl.name().inner()))
                });
                BlockContent::Definition { name }
            }
            BlockKind::Data => {
                if let Some(decl) = parse_block(raw, &mut diagnostics, |t| parser::parse_data(t)) {
                    deferred.push((index, Deferred::Data(decl)));
                }
                BlockContent::Data(None)
            }
            BlockKind::Table => {
                if let Some(decl) = parse_block(raw, &mut diagnostics, |t| parser::parse_table(t))
                {
                    deferred.push((index, Deferred::Table(decl)));
                }
                BlockContent::Table(None)
            }
            BlockKind::Diagram => {
                if let Some(decl) = parse_block(raw, &mut diagnostics, |t| parser::parse_graph(t))
                {
                    deferred.push((index, Deferred::Diagram(decl)));
                }
                BlockContent::Diagram {
                    graph: None,
                    valid: false,
                }
            }
            BlockKind::Math => BlockContent::Math {
                body: raw.body_text().unwrap_or_default().to_string(),
            },
            BlockKind::Config => BlockContent::Config {
                name: raw.label.map(str::to_string),
                body: raw.body_text().unwrap_or_default().to_string(),
            },
            BlockKind::Code => BlockContent::Code {
                language: raw.label.map(str::to_string),
                body: raw.body_text().unwrap_or_default().to_string(),
            },
        };
        trace!(index, kind:% = raw.kind; "Parsed block");
        blocks.push(Block {
            kind: raw.kind,
            span: raw.span,
            text: raw.text.to_string(),
            content,
        });
    }

    // Pass 2: the registry is frozen before anything is validated against it.
    let (registry, registry_diagnostics) = registry.freeze(config);
    diagnostics.extend(registry_diagnostics);

    let mut binder = Binder::new(&registry, *config);
    let mut instance_spans: IndexMap<Id, Span> = IndexMap::new();
    for (index, item) in deferred {
        let content = match item {
            Deferred::Data(decl) => {
                let instance = binder.bind_data(&decl).filter(|instance| {
                    match instance_spans.get(&instance.name) {
                        Some(&first) => {
                            diagnostics.emit(
                                Diagnostic::error(format!(
                                    "data instance `{}` is defined more than once",
                                    instance.name
                                ))
                                .with_code(ErrorCode::E200)
                                .with_label(decl.name.span(), "duplicate instance")
                                .with_secondary_label(first, "first defined here"),
                            );
                            false
                        }
                        None => {
                            instance_spans.insert(instance.name.clone(), decl.name.span());
                            true
                        }
                    }
                });
                BlockContent::Data(instance)
            }
            Deferred::Table(decl) => BlockContent::Table(binder.bind_table(&decl)),
            Deferred::Diagram(decl) => {
                let (graph, graph_diagnostics) = build_diagram(&decl, config);
                let valid = !graph_diagnostics.iter().any(Diagnostic::is_error);
                diagnostics.extend(graph_diagnostics);
                BlockContent::Diagram {
                    graph: Some(graph),
                    valid,
                }
            }
        };
        blocks[index].content = content;
    }
    diagnostics.extend(binder.into_diagnostics());

    debug!(
        blocks_len = blocks.len(),
        definitions = registry.len(),
        diagnostics = diagnostics.len();
        "Parsed document"
    );

    ParsedDocument {
        blocks,
        registry,
        diagnostics: diagnostics.into_diagnostics(),
    }
}

/// Tokenize one block and run `parse` over its significant tokens.
fn parse_block<'src, T>(
    raw: &RawBlock<'src>,
    diagnostics: &mut DiagnosticCollector,
    parse: impl FnOnce(&[crate::tokens::PositionedToken<'src>]) -> Result<T, Diagnostic>,
) -> Option<T> {
    let tokens = match tokenize(raw.text, raw.span.start()) {
        Ok(tokens) => significant(tokens),
        Err(err) => {
            diagnostics.extend(err.into_diagnostics());
            return None;
        }
    };
    match parse(&tokens) {
        Ok(parsed) => Some(parsed),
        Err(diagnostic) => {
            diagnostics.emit(diagnostic);
            None
        }
    }
}
