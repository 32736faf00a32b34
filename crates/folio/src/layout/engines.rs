//! Layout engine selection.
//!
//! Each engine turns a [`LayoutGraph`] into a [`Placement`]: one rectangle per
//! node and one route per edge. The shared steps before and after placement
//! (sizing, cluster boxes, normalization) live in [`crate::layout`], so an
//! engine only decides where things go.

mod force;
mod radial;
mod sugiyama;

use folio_core::diagram::LayoutHint;
use folio_parser::error::DiagnosticCollector;

use crate::{
    error::FolioError,
    layout::{LayoutOptions, Placement},
    structure::LayoutGraph,
};

/// Trait implemented by every layout algorithm family.
pub trait LayoutEngine {
    /// Place the nodes and route the edges of `graph`.
    ///
    /// Returns `Ok(None)` when the graph cannot be laid out under the
    /// current options; the reason has been pushed to `diagnostics`.
    ///
    /// # Errors
    /// Returns `FolioError::Layout` if the engine reaches an internal
    /// inconsistency.
    fn place(
        &self,
        graph: &LayoutGraph<'_>,
        options: &LayoutOptions,
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<Option<Placement>, FolioError>;
}

/// Engine for a layout hint. The force presets and the two radial variants
/// share one implementation each.
pub fn engine(hint: LayoutHint) -> Box<dyn LayoutEngine> {
    match hint {
        LayoutHint::Dot => Box::new(sugiyama::Engine::new()),
        LayoutHint::Neato => Box::new(force::Engine::new(force::Preset::Neato)),
        LayoutHint::Fdp => Box::new(force::Engine::new(force::Preset::Fdp)),
        LayoutHint::Sfdp => Box::new(force::Engine::new(force::Preset::Sfdp)),
        LayoutHint::Circo => Box::new(radial::Engine::new(radial::Variant::Circle)),
        LayoutHint::Twopi => Box::new(radial::Engine::new(radial::Variant::Rings)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use folio_core::{
        diagram::{AttributeMap, DiagramGraph, DiagramKind, Edge, Node},
        identifier::Id,
        span::Span,
    };
    use folio_parser::{ParseConfig, parse_document};

    use crate::{config::LayoutConfig, layout::sizing::NodeSizer, structure::LayoutGraph};

    /// Directed graph with default-sized nodes and no clusters.
    pub fn diagram(nodes: &[&str], edges: &[(&str, &str)]) -> DiagramGraph {
        let mut graph = DiagramGraph::new(DiagramKind::Directed);
        for name in nodes {
            graph.nodes.insert(
                Id::new(name),
                Node {
                    id: Id::new(name),
                    cluster: None,
                    attributes: AttributeMap::new(),
                    span: Span::default(),
                },
            );
        }
        for (source, target) in edges {
            graph.edges.push(Edge {
                name: None,
                source: Id::new(source),
                target: Id::new(target),
                directed: true,
                attributes: AttributeMap::new(),
                span: Span::default(),
            });
        }
        graph
    }

    /// First diagram of a parsed document.
    pub fn parse_diagram(source: &str) -> DiagramGraph {
        let parsed = parse_document(source, &ParseConfig::default());
        parsed
            .blocks
            .iter()
            .find_map(|block| block.diagram())
            .cloned()
            .expect("Expected a diagram block")
    }

    pub fn layout_graph(diagram: &DiagramGraph) -> LayoutGraph<'_> {
        let sizer = NodeSizer::new(&LayoutConfig::default());
        LayoutGraph::new(diagram, &sizer).expect("Failed to build layout graph")
    }
}
