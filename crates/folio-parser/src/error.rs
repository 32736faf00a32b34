//! Error and diagnostic system for the Folio parser.
//!
//! Every phase (lexing, segmenting, type registration, binding, diagram
//! building) reports problems as [`Diagnostic`]s and keeps going. A
//! diagnostic has a [`Severity`], an [`ErrorCode`] whose [`ErrorKind`] names
//! the class of problem, labeled spans, and optional help text.
//!
//! # Example
//!
//! ```
//! # use folio_parser::error::{Diagnostic, ErrorCode, ErrorKind};
//! # use folio_parser::Span;
//!
//! let diag = Diagnostic::error("`Point` is defined more than once")
//!     .with_code(ErrorCode::E200)
//!     .with_label(Span::new(100..120), "duplicate definition")
//!     .with_secondary_label(Span::new(50..70), "first defined here")
//!     .with_help("remove the duplicate or use a different name");
//!
//! assert_eq!(diag.kind(), Some(ErrorKind::Type));
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::{ErrorCode, ErrorKind};
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
