//! Options for the validating stages of the parser.

use folio_core::diagram::MixedEdgePolicy;

/// Default limit on value nesting during validation.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Settings consumed by the binder and the diagram builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Report unknown data fields as errors rather than warnings.
    pub strict_fields: bool,
    /// Maximum nesting of arrays, maps and structs inside one value.
    pub max_depth: usize,
    /// Whether one graph may mix `->` and `--` edges.
    pub mixed_edges: MixedEdgePolicy,
}

impl ParseConfig {
    pub fn new(strict_fields: bool, max_depth: usize, mixed_edges: MixedEdgePolicy) -> Self {
        Self {
            strict_fields,
            max_depth,
            mixed_edges,
        }
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_DEPTH, MixedEdgePolicy::default())
    }
}
