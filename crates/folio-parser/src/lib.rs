//! # Folio Parser
//!
//! Front end for Folio documents: everything from raw text up to, but not
//! including, diagram layout.
//!
//! ## Usage
//!
//! ```
//! # use folio_parser::{BlockContent, ParseConfig, error::ErrorCode, parse_document};
//! let source = r#"
//! struct Point { x: int; y: int; }
//!
//! data Point origin { x = 0; }
//! "#;
//!
//! let parsed = parse_document(source, &ParseConfig::default());
//! assert_eq!(parsed.diagnostics.len(), 1);
//! assert_eq!(parsed.diagnostics[0].code(), Some(ErrorCode::E300));
//! assert!(matches!(parsed.blocks[1].content, BlockContent::Data(None)));
//! ```
//!
//! ## Pipeline
//!
//! 1. **Segment** ([`segment`]): split the text into top-level blocks
//! 2. **Tokenize** ([`lexer::tokenize`]): lex each block at its document offset
//! 3. **Parse** ([`parser`]): build a per-block AST ([`parser_types`])
//! 4. **Register** ([`TypeRegistryBuilder`]): collect every declaration, then
//!    freeze into a [`TypeRegistry`]
//! 5. **Bind** ([`Binder`]): type-check data instances and table rows
//! 6. **Build** ([`build_diagram`]): turn each `graph` block into a validated
//!    [`DiagramGraph`](folio_core::diagram::DiagramGraph)
//!
//! [`parse_document`] runs all six. Each stage reports through
//! [`error::Diagnostic`] and keeps going.

mod binder;
mod config;
mod diagram;
pub mod error;
pub mod lexer;
mod parsed;
pub mod parser;
pub mod parser_types;
mod registry;
mod segment;
mod source;
pub mod tokens;

pub use folio_core::{
    block,
    span::{SourceSpan, Span, Spanned},
};

pub use binder::{Binder, literal_value};
pub use config::{DEFAULT_MAX_DEPTH, ParseConfig};
pub use diagram::build_diagram;
pub use parsed::{Block, BlockContent, ParsedDocument, parse_document};
pub use registry::{TypeRegistry, TypeRegistryBuilder};
pub use segment::{RawBlock, Segmentation, segment};
pub use source::SourceMap;
