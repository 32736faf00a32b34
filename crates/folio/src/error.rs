//! Error types for Folio operations.
//!
//! Building a [`Document`](crate::Document) never fails: problems become
//! diagnostics on the document. [`FolioError`] is returned by the checked
//! entry points and by direct calls into the layout engines.

use std::io;

use thiserror::Error;

use folio_parser::error::ParseError;

/// The main error type for Folio operations.
///
/// The `Parse` variant carries the document's diagnostics together with its
/// source text and name, which is what a reporter needs to show snippets.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse {
        err: ParseError,
        src: String,
        name: String,
    },

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FolioError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
            name: name.into(),
        }
    }
}
