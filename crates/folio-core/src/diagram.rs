//! Semantic diagram model.
//!
//! A [`DiagramGraph`] is the validated form of a `graph { ... }` block: every
//! edge endpoint names a declared node, style presets are already merged into
//! attribute maps and variables are substituted. Collections keep declaration
//! order, which layout relies on for deterministic output.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{identifier::Id, span::Span};

/// Error returned when parsing one of the diagram keyword enums fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} `{value}`")]
pub struct UnknownKeyword {
    pub what: &'static str,
    pub value: String,
}

macro_rules! keyword_enum {
    (@first $first:literal $(, $rest:literal)*) => { $first };
    (
        $(#[$meta:meta])*
        $name:ident ($what:literal) {
            $($(#[$vmeta:meta])* $variant:ident => [$($spelling:literal),+]),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Canonical source spelling.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => keyword_enum!(@first $($spelling),+)),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownKeyword;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($($spelling)|+ => Ok(Self::$variant),)+
                    _ => Err(UnknownKeyword { what: $what, value: s.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum! {
    /// Diagram kind written after `graph`.
    DiagramKind ("diagram kind") {
        Directed => ["directed"],
        Undirected => ["undirected"],
        Flowchart => ["flowchart", "flow"],
        State => ["state"],
        Tree => ["tree"],
        OrgChart => ["orgchart"],
        Network => ["network"],
        Mindmap => ["mindmap"],
    }
}

impl Default for DiagramKind {
    fn default() -> Self {
        Self::Directed
    }
}

impl DiagramKind {
    /// Layout family used when the graph does not set `layout`.
    pub fn default_layout(self) -> LayoutHint {
        match self {
            Self::Directed | Self::Flowchart | Self::State | Self::Tree | Self::OrgChart => {
                LayoutHint::Dot
            }
            Self::Undirected | Self::Network => LayoutHint::Neato,
            Self::Mindmap => LayoutHint::Twopi,
        }
    }
}

keyword_enum! {
    /// Layout algorithm family requested by a diagram.
    LayoutHint ("layout") {
        Dot => ["dot"],
        Neato => ["neato"],
        Fdp => ["fdp"],
        Sfdp => ["sfdp"],
        Circo => ["circo"],
        Twopi => ["twopi"],
    }
}

impl LayoutHint {
    pub fn is_hierarchical(self) -> bool {
        matches!(self, Self::Dot)
    }
}

keyword_enum! {
    /// Direction of the rank axis in hierarchical layout.
    RankDir ("rankdir") {
        TopBottom => ["TB"],
        LeftRight => ["LR"],
        BottomTop => ["BT"],
        RightLeft => ["RL"],
    }
}

impl Default for RankDir {
    fn default() -> Self {
        Self::TopBottom
    }
}

impl RankDir {
    /// True when ranks advance along the x axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

keyword_enum! {
    /// Edge routing style.
    Splines ("splines") {
        Line => ["line", "polyline", "true"],
        Ortho => ["ortho"],
    }
}

impl Default for Splines {
    fn default() -> Self {
        Self::Line
    }
}

keyword_enum! {
    /// Node outline shapes.
    Shape ("shape") {
        Box => ["box", "rect", "rectangle"],
        RoundedBox => ["roundedbox"],
        Ellipse => ["ellipse", "oval"],
        Circle => ["circle"],
        DoubleCircle => ["doublecircle"],
        Diamond => ["diamond"],
        Point => ["point"],
        Plaintext => ["plaintext", "none"],
        Cylinder => ["cylinder"],
        Note => ["note"],
    }
}

impl Shape {
    /// Shapes drawn with equal width and height.
    pub fn is_square(self) -> bool {
        matches!(self, Self::Circle | Self::DoubleCircle | Self::Point)
    }
}

keyword_enum! {
    /// Arrowhead and arrowtail markers.
    ArrowKind ("arrow") {
        Normal => ["normal"],
        Inv => ["inv"],
        Dot => ["dot"],
        Diamond => ["diamond"],
        Odiamond => ["odiamond"],
        Vee => ["vee"],
        Tee => ["tee"],
        None => ["none"],
    }
}

/// What to do with a graph that uses both `->` and `--` edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixedEdgePolicy {
    /// Keep each edge's own directedness.
    #[default]
    Allow,
    /// Report the graph once with an error.
    Reject,
}

/// Line styles accepted by the `style` attribute.
pub const LINE_STYLES: &[&str] = &[
    "solid", "dashed", "dotted", "bold", "invis", "filled", "rounded",
];

/// A resolved attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Bare word such as `box` or `dashed`.
    Ident(String),
    Map(AttributeMap),
}

impl AttrValue {
    /// Text of string and identifier values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttributeMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Ident(_) => "identifier",
            Self::Map(_) => "mapping",
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => crate::value::write_quoted(f, s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Ident(s) => f.write_str(s),
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Attribute map in insertion order.
pub type AttributeMap = IndexMap<String, AttrValue>;

/// Typed accessors shared by nodes, edges and clusters.
pub trait Attributed {
    fn attributes(&self) -> &AttributeMap;

    fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes().get(key)
    }

    fn attr_text(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(AttrValue::as_text)
    }

    /// `font.size`, if set.
    fn font_size(&self) -> Option<f64> {
        self.attr("font")
            .and_then(AttrValue::as_map)
            .and_then(|font| font.get("size"))
            .and_then(AttrValue::as_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: Id,
    /// Index into [`DiagramGraph::clusters`] of the innermost containing cluster.
    pub cluster: Option<usize>,
    pub attributes: AttributeMap,
    #[serde(skip)]
    pub span: Span,
}

impl Node {
    /// Display label: the `label` attribute, falling back to the node id.
    pub fn label(&self) -> &str {
        self.attr_text("label").unwrap_or(self.id.as_str())
    }

    pub fn shape(&self) -> Shape {
        self.attr_text("shape")
            .and_then(|s| s.parse().ok())
            .unwrap_or(Shape::Box)
    }
}

impl Attributed for Node {
    fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Optional edge name (`name: A -> B`).
    pub name: Option<Id>,
    pub source: Id,
    pub target: Id,
    /// `->` edges are directed, `--` edges are not.
    pub directed: bool,
    pub attributes: AttributeMap,
    #[serde(skip)]
    pub span: Span,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl Attributed for Edge {
    fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: Id,
    /// Index of the enclosing cluster, if nested.
    pub parent: Option<usize>,
    pub attributes: AttributeMap,
    #[serde(skip)]
    pub span: Span,
}

impl Attributed for Cluster {
    fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StylePreset {
    pub name: Id,
    pub attributes: AttributeMap,
}

/// Validated diagram ready for layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagramGraph {
    pub kind: DiagramKind,
    pub layout: LayoutHint,
    pub rankdir: RankDir,
    pub splines: Splines,
    pub node_separation: Option<f32>,
    pub rank_separation: Option<f32>,
    /// Root node for radial layouts.
    pub root: Option<Id>,
    /// Graph-level attributes other than the layout controls above.
    pub attributes: AttributeMap,
    pub nodes: IndexMap<Id, Node>,
    pub edges: Vec<Edge>,
    pub clusters: IndexMap<Id, Cluster>,
    pub styles: IndexMap<Id, StylePreset>,
    /// Graph-scope `let` bindings after substitution.
    pub variables: IndexMap<Id, AttrValue>,
}

impl DiagramGraph {
    /// Creates an empty graph of the given kind with its default layout.
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            layout: kind.default_layout(),
            rankdir: RankDir::default(),
            splines: Splines::default(),
            node_separation: None,
            rank_separation: None,
            root: None,
            attributes: AttributeMap::new(),
            nodes: IndexMap::new(),
            edges: Vec::new(),
            clusters: IndexMap::new(),
            styles: IndexMap::new(),
            variables: IndexMap::new(),
        }
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    /// Title from the `title` or `label` graph attribute.
    pub fn title(&self) -> Option<&str> {
        self.attributes
            .get("title")
            .or_else(|| self.attributes.get("label"))
            .and_then(AttrValue::as_text)
    }

    /// Chain of cluster indices from the outermost cluster down to `cluster`.
    pub fn cluster_path(&self, cluster: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = Some(cluster);
        // Parents always precede children, so the walk is bounded by the cluster count.
        while let Some(index) = current {
            if path.len() > self.clusters.len() {
                break;
            }
            path.push(index);
            current = self.clusters.get_index(index).and_then(|(_, c)| c.parent);
        }
        path.reverse();
        path
    }

    pub fn has_mixed_edges(&self) -> bool {
        self.edges.iter().any(|edge| edge.directed) && self.edges.iter().any(|edge| !edge.directed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        assert_eq!("LR".parse::<RankDir>(), Ok(RankDir::LeftRight));
        assert_eq!(RankDir::LeftRight.to_string(), "LR");
        assert_eq!("flow".parse::<DiagramKind>(), Ok(DiagramKind::Flowchart));
        assert_eq!(DiagramKind::Flowchart.as_str(), "flowchart");
    }

    #[test]
    fn test_unknown_keyword() {
        let err = "sideways".parse::<RankDir>().unwrap_err();
        assert_eq!(err.to_string(), "unknown rankdir `sideways`");
    }

    #[test]
    fn test_default_layout_per_kind() {
        assert_eq!(DiagramKind::Tree.default_layout(), LayoutHint::Dot);
        assert_eq!(DiagramKind::Network.default_layout(), LayoutHint::Neato);
        assert_eq!(DiagramKind::Mindmap.default_layout(), LayoutHint::Twopi);
        assert!(LayoutHint::Dot.is_hierarchical());
        assert!(!LayoutHint::Circo.is_hierarchical());
    }

    #[test]
    fn test_node_label_and_shape() {
        let mut attributes = AttributeMap::new();
        attributes.insert("shape".to_string(), AttrValue::Ident("circle".to_string()));
        let node = Node {
            id: Id::new("A"),
            cluster: None,
            attributes,
            span: Span::default(),
        };
        assert_eq!(node.label(), "A");
        assert_eq!(node.shape(), Shape::Circle);
    }

    #[test]
    fn test_font_size_lookup() {
        let mut font = AttributeMap::new();
        font.insert("size".to_string(), AttrValue::Number(18.0));
        let mut attributes = AttributeMap::new();
        attributes.insert("font".to_string(), AttrValue::Map(font));
        let node = Node {
            id: Id::new("A"),
            cluster: None,
            attributes,
            span: Span::default(),
        };
        assert_eq!(node.font_size(), Some(18.0));
    }

    #[test]
    fn test_cluster_path() {
        let mut graph = DiagramGraph::new(DiagramKind::Directed);
        for (name, parent) in [("outer", None), ("inner", Some(0)), ("leaf", Some(1))] {
            graph.clusters.insert(
                Id::new(name),
                Cluster {
                    id: Id::new(name),
                    parent,
                    attributes: AttributeMap::new(),
                    span: Span::default(),
                },
            );
        }
        assert_eq!(graph.cluster_path(2), vec![0, 1, 2]);
        assert_eq!(graph.cluster_path(0), vec![0]);
    }
}
