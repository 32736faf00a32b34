//! Folio - typed data, tables and diagrams in one text document
//!
//! This library turns a Folio source document into a [`Document`]: prose and
//! code blocks kept verbatim, type definitions in a frozen registry, data
//! instances and tables validated against them, and diagrams laid out as
//! rectangles and polylines ready for a renderer.
//!
//! Building is best-effort. Problems become diagnostics on the document and
//! only the offending block loses its value.

pub mod config;
pub mod layout;

mod document;
mod error;
mod structure;

pub use folio_core::{block, data, diagram, geometry, identifier, schema, span, value};
pub use folio_parser::{Block, BlockContent, SourceMap, TypeRegistry, error as diagnostics};

pub use document::{DiagramView, DiagnosticRecord, Document};
pub use error::FolioError;

use log::{debug, info};
use rayon::prelude::*;

use folio_parser::parse_document;

use config::AppConfig;

/// Builder for parsing, validating and laying out Folio documents.
///
/// A builder holds only configuration, so one builder can build any number
/// of documents, including in parallel.
///
/// # Examples
///
/// ```rust
/// use folio::{DocumentBuilder, config::AppConfig};
///
/// let source = "struct Point { x: int; y: int; }\n\ndata Point origin { x = 0; y = 0; }\n";
///
/// let builder = DocumentBuilder::new(AppConfig::default());
/// let document = builder.build("points.folio", source);
///
/// assert!(!document.has_errors());
/// assert_eq!(document.data().count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    config: AppConfig,
}

impl DocumentBuilder {
    /// Create a new document builder with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build a document. Never fails; check [`Document::has_errors`] or
    /// [`Document::diagnostics`] for problems.
    ///
    /// # Arguments
    ///
    /// * `id` - Document name used in resolved diagnostic locations
    /// * `source` - Folio source text
    pub fn build(&self, id: &str, source: &str) -> Document {
        info!(document = id, bytes = source.len(); "Building document");
        let parsed = parse_document(source, &self.config.parse_config());
        debug!(
            blocks = parsed.blocks.len(),
            diagnostics = parsed.diagnostics.len();
            "Document parsed"
        );
        Document::assemble(SourceMap::new(id, source), parsed, self.config.layout())
    }

    /// Build a document and fail if it has any error diagnostic.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::Parse`] with every diagnostic of the document,
    /// warnings included, together with the source for reporting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use folio::{DocumentBuilder, FolioError};
    ///
    /// let builder = DocumentBuilder::default();
    /// let result = builder.build_checked("broken.folio", "graph { node A; A -> B; }\n");
    /// assert!(matches!(result, Err(FolioError::Parse { .. })));
    /// ```
    pub fn build_checked(&self, id: &str, source: &str) -> Result<Document, FolioError> {
        self.build(id, source).into_checked()
    }

    /// Build independent documents in parallel. Results keep input order.
    pub fn build_batch<S>(&self, sources: &[(S, S)]) -> Vec<Document>
    where
        S: AsRef<str> + Sync,
    {
        info!(documents = sources.len(); "Building document batch");
        sources
            .par_iter()
            .map(|(id, source)| self.build(id.as_ref(), source.as_ref()))
            .collect()
    }
}
