//! Folio CLI library
//!
//! Core logic of the `folio` command: build one document, report its
//! diagnostics and print a one-line summary per block.

pub mod config;
pub mod error_adapter;

mod args;

pub use args::Args;

use std::{fmt::Write as _, fs};

use log::{info, warn};

use folio::{BlockContent, Document, DocumentBuilder, FolioError, block::BlockKind};

pub use error_adapter::{Report, render, reports};

/// Run the Folio CLI application
///
/// Builds the input document, logs warnings as miette reports and writes
/// the block summary to `--output` or stdout.
///
/// # Errors
///
/// Returns `FolioError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - A document with error diagnostics, as [`FolioError::Parse`] carrying
///   all of them; the summary is still written first
pub fn run(args: &Args) -> Result<(), FolioError> {
    info!(input_path = args.input; "Checking document");

    let app_config = config::load_config(args.config.as_ref())?;
    let source = fs::read_to_string(&args.input)?;

    let builder = DocumentBuilder::new(app_config);
    let document = builder.build(&args.input, &source);

    let text = summary(&document);
    match &args.output {
        Some(path) => {
            fs::write(path, &text)?;
            info!(output_file = path; "Summary written");
        }
        None => print!("{text}"),
    }

    if !document.has_errors() {
        for diagnostic in document.diagnostics() {
            warn!("\n{}", render(&Report::located(diagnostic, document.source())));
        }
    }
    document.into_checked().map(|_| ())
}

/// One line per block: location, kind and what the block produced.
pub fn summary(document: &Document) -> String {
    let map = document.source_map();
    let mut out = String::new();
    for (index, block) in document.blocks().iter().enumerate() {
        let at = map.line_col(block.span.start());
        let detail = match &block.content {
            BlockContent::Prose { text, .. } => format!("{} chars", text.chars().count()),
            BlockContent::Definition { name: Some(name) } => name.to_string(),
            BlockContent::Definition { name: None } => "(rejected)".to_string(),
            BlockContent::Data(Some(instance)) => {
                format!("{} {}: {} fields", instance.type_name, instance.name, instance.fields.len())
            }
            BlockContent::Data(None) => "(rejected)".to_string(),
            BlockContent::Table(Some(table)) => format!(
                "{}: {} columns, {} rows",
                table.name,
                table.columns.len(),
                table.rows.len()
            ),
            BlockContent::Table(None) => "(rejected)".to_string(),
            BlockContent::Diagram { graph: Some(graph), .. } => {
                let mut line = format!(
                    "{} ({}): {} nodes, {} edges",
                    graph.kind,
                    graph.layout,
                    graph.nodes.len(),
                    graph.edges.len()
                );
                match document.layout(index) {
                    Some(layout) => {
                        let _ = write!(line, ", {:.0}x{:.0}", layout.size.width(), layout.size.height());
                    }
                    None => line.push_str(", not laid out"),
                }
                line
            }
            BlockContent::Diagram { graph: None, .. } => "(rejected)".to_string(),
            BlockContent::Math { body } => format!("{} chars", body.trim().chars().count()),
            BlockContent::Config { name, .. } => name.clone().unwrap_or_default(),
            BlockContent::Code { language, body } => format!(
                "{} ({} lines)",
                language.as_deref().unwrap_or("text"),
                body.lines().count()
            ),
        };
        let _ = writeln!(out, "{at} {} {detail}", kind_name(block.kind));
    }
    out
}

fn kind_name(kind: BlockKind) -> &'static str {
    match kind {
        BlockKind::Prose(_) => "prose",
        other => other.keyword().unwrap_or("block"),
    }
}
