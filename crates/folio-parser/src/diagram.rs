//! Builds a validated [`DiagramGraph`] from a parsed `graph` block.
//!
//! Building runs in two walks over the statement tree. The first registers
//! style presets so that a node may use a preset declared after it. The
//! second declares nodes, clusters and edges and applies graph attributes.
//! Edge endpoints are checked last, once every node in the graph is known.
//!
//! `let` bindings are scoped to the graph or cluster that declares them and
//! are visible in nested clusters. A binding may be referenced before its
//! `let` within the same scope.

use std::str::FromStr;

use indexmap::IndexMap;
use log::{debug, trace};

use folio_core::{
    diagram::{
        ArrowKind, AttrValue, AttributeMap, Cluster, DiagramGraph, DiagramKind, Edge,
        LINE_STYLES, LayoutHint, MixedEdgePolicy, Node, RankDir, Shape, Splines, StylePreset,
        UnknownKeyword,
    },
    identifier::Id,
    span::{Span, Spanned},
};

use crate::{
    config::ParseConfig,
    error::{Diagnostic, DiagnosticCollector, ErrorCode},
    parser_types::{AttrEntry, AttrExpr, GraphDecl, Statement},
};

/// Build a diagram graph. Any error diagnostic means the graph must not be laid out.
pub fn build_diagram(decl: &GraphDecl<'_>, config: &ParseConfig) -> (DiagramGraph, Vec<Diagnostic>) {
    DiagramBuilder::new(*config).build(decl)
}

/// What an attribute list is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Node,
    Edge,
    Cluster,
    Preset,
}

impl Target {
    fn keys(self) -> &'static [&'static str] {
        match self {
            Self::Node => &["label", "shape", "color", "style", "fill", "font", "tooltip"],
            Self::Edge => &[
                "label",
                "style",
                "color",
                "arrowhead",
                "arrowtail",
                "penwidth",
                "font",
                "tooltip",
            ],
            Self::Cluster => &["label", "color", "style", "fill", "font", "tooltip"],
            Self::Preset => &[
                "label",
                "shape",
                "color",
                "style",
                "fill",
                "font",
                "tooltip",
                "arrowhead",
                "arrowtail",
                "penwidth",
            ],
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Cluster => "cluster",
            Self::Preset => "style preset",
        }
    }
}

const GRAPH_KEYS: &[&str] = &[
    "layout", "rankdir", "splines", "nodesep", "ranksep", "label", "title", "root",
];

const FONT_KEYS: &[&str] = &["size", "color", "family", "weight"];

/// An attribute problem: the code to report and its message.
type AttrProblem = (ErrorCode, String);

fn expect_text(key: &str, value: &AttrValue) -> Result<(), AttrProblem> {
    match value.as_text() {
        Some(_) => Ok(()),
        None => Err((
            ErrorCode::E309,
            format!("`{key}` expects text, found {}", value.kind_name()),
        )),
    }
}

fn expect_positive(key: &str, value: &AttrValue) -> Result<(), AttrProblem> {
    match value.as_number() {
        Some(n) if n > 0.0 && n.is_finite() => Ok(()),
        _ => Err((
            ErrorCode::E309,
            format!("`{key}` expects a positive number, found `{value}`"),
        )),
    }
}

fn expect_keyword<T: FromStr<Err = UnknownKeyword>>(
    key: &str,
    value: &AttrValue,
) -> Result<T, AttrProblem> {
    let Some(text) = value.as_text() else {
        return Err((
            ErrorCode::E309,
            format!("`{key}` expects a keyword, found {}", value.kind_name()),
        ));
    };
    text.parse::<T>()
        .map_err(|err| (ErrorCode::E309, err.to_string()))
}

/// Check an attribute value other than `style`.
fn check_attribute(key: &str, value: &AttrValue) -> Result<(), AttrProblem> {
    match key {
        "label" | "color" | "fill" | "tooltip" => expect_text(key, value),
        "shape" => expect_keyword::<Shape>(key, value).map(|_| ()),
        "arrowhead" | "arrowtail" => expect_keyword::<ArrowKind>(key, value).map(|_| ()),
        "penwidth" => expect_positive(key, value),
        "font" => {
            let Some(font) = value.as_map() else {
                return Err((
                    ErrorCode::E309,
                    format!("`font` expects a mapping such as `{{ size: 12 }}`, found `{value}`"),
                ));
            };
            for (sub_key, sub_value) in font {
                match sub_key.as_str() {
                    "size" => expect_positive("font.size", sub_value)?,
                    "color" | "family" => expect_text(&format!("font.{sub_key}"), sub_value)?,
                    "weight" if sub_value.as_number().is_some() => {}
                    "weight" => expect_text("font.weight", sub_value)?,
                    _ => {
                        return Err((
                            ErrorCode::E308,
                            format!(
                                "unknown font attribute `{sub_key}`; expected one of: {}",
                                FONT_KEYS.join(", ")
                            ),
                        ));
                    }
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

struct Binding<'src> {
    expr: Spanned<AttrExpr<'src>>,
    span: Span,
    /// `None` until first referenced; `Some(None)` if evaluation failed.
    value: Option<Option<AttrValue>>,
    resolving: bool,
}

#[derive(Default)]
struct Scope<'src> {
    bindings: IndexMap<&'src str, Binding<'src>>,
}

struct PendingEdge<'src> {
    name: Option<Id>,
    source: Spanned<&'src str>,
    target: Spanned<&'src str>,
    directed: bool,
    attributes: AttributeMap,
    span: Span,
}

struct DiagramBuilder<'src> {
    config: ParseConfig,
    graph: DiagramGraph,
    scopes: Vec<Scope<'src>>,
    edge_names: IndexMap<Id, Span>,
    pending_edges: Vec<PendingEdge<'src>>,
    root_span: Option<Span>,
    diagnostics: DiagnosticCollector,
}

impl<'src> DiagramBuilder<'src> {
    fn new(config: ParseConfig) -> Self {
        Self {
            config,
            graph: DiagramGraph::new(DiagramKind::default()),
            scopes: Vec::new(),
            edge_names: IndexMap::new(),
            pending_edges: Vec::new(),
            root_span: None,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    fn build(mut self, decl: &GraphDecl<'src>) -> (DiagramGraph, Vec<Diagnostic>) {
        if let Some(kind) = &decl.kind {
            match kind.inner().parse::<DiagramKind>() {
                Ok(parsed) => self.graph = DiagramGraph::new(parsed),
                Err(err) => self.diagnostics.emit(
                    Diagnostic::error(err.to_string())
                        .with_code(ErrorCode::E309)
                        .with_label(kind.span(), "unknown diagram kind")
                        .with_help(
                            "expected one of: directed, undirected, flowchart, state, tree, \
                             orgchart, network, mindmap",
                        ),
                ),
            }
        }

        self.collect_styles(&decl.statements);
        self.walk(&decl.statements, None);
        self.finish(decl.span);

        debug!(
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            clusters = self.graph.clusters.len(),
            errors = self.diagnostics.has_errors();
            "Built diagram"
        );
        (self.graph, self.diagnostics.into_diagnostics())
    }

    // Scopes and variables

    fn push_scope(&mut self, statements: &[Statement<'src>], report: bool) {
        let mut scope = Scope::default();
        for statement in statements {
            let Statement::Let { name, value, span } = statement else {
                continue;
            };
            if let Some(first) = scope.bindings.get(*name.inner()) {
                if report {
                    self.diagnostics.emit(
                        Diagnostic::error(format!(
                            "variable `{}` is declared more than once in this scope",
                            name.inner()
                        ))
                        .with_code(ErrorCode::E307)
                        .with_label(name.span(), "duplicate variable")
                        .with_secondary_label(first.span, "first declared here"),
                    );
                }
                continue;
            }
            scope.bindings.insert(
                name.inner(),
                Binding {
                    expr: value.clone(),
                    span: *span,
                    value: None,
                    resolving: false,
                },
            );
        }
        self.scopes.push(scope);
    }

    /// Look up `$name` in the innermost `limit` scopes.
    fn lookup(&mut self, name: &str, span: Span, limit: usize) -> Option<AttrValue> {
        let Some(depth) = (0..limit)
            .rev()
            .find(|&depth| self.scopes[depth].bindings.contains_key(name))
        else {
            self.diagnostics.emit(
                Diagnostic::error(format!("undefined variable `${name}`"))
                    .with_code(ErrorCode::E400)
                    .with_label(span, "not declared in this scope")
                    .with_help(format!("declare it with `let {name} = ...;`")),
            );
            return None;
        };

        let binding = self.scopes[depth].bindings.get_mut(name)?;
        if let Some(value) = &binding.value {
            return value.clone();
        }
        if binding.resolving {
            let declared = binding.span;
            self.diagnostics.emit(
                Diagnostic::error(format!("variable `${name}` refers to itself"))
                    .with_code(ErrorCode::E400)
                    .with_label(span, "circular reference")
                    .with_secondary_label(declared, "declared here"),
            );
            return None;
        }
        binding.resolving = true;
        let expr = binding.expr.clone();

        // A binding sees its own scope and the scopes around it.
        let value = self.evaluate(&expr, depth + 1);
        if let Some(binding) = self.scopes[depth].bindings.get_mut(name) {
            binding.resolving = false;
            binding.value = Some(value.clone());
        }
        value
    }

    fn evaluate(&mut self, expr: &Spanned<AttrExpr<'src>>, limit: usize) -> Option<AttrValue> {
        match expr.inner() {
            AttrExpr::String(s) => Some(AttrValue::String(s.clone())),
            AttrExpr::Number(n) => Some(AttrValue::Number(*n)),
            AttrExpr::Bool(b) => Some(AttrValue::Bool(*b)),
            AttrExpr::Ident(s) => Some(AttrValue::Ident((*s).to_string())),
            AttrExpr::Variable(name) => self.lookup(name, expr.span(), limit),
            AttrExpr::Map(entries) => {
                let mut map = AttributeMap::new();
                let mut valid = true;
                for entry in entries {
                    match self.evaluate(&entry.value, limit) {
                        Some(value) => {
                            map.insert((*entry.key.inner()).to_string(), value);
                        }
                        None => valid = false,
                    }
                }
                valid.then_some(AttrValue::Map(map))
            }
        }
    }

    fn evaluate_here(&mut self, expr: &Spanned<AttrExpr<'src>>) -> Option<AttrValue> {
        self.evaluate(expr, self.scopes.len())
    }

    // Attributes

    /// Evaluate and check `entries` for `target`, merging any style preset
    /// underneath the local attributes.
    fn resolve_attributes(&mut self, entries: &[AttrEntry<'src>], target: Target) -> AttributeMap {
        let mut presets = AttributeMap::new();
        let mut local = AttributeMap::new();

        for entry in entries {
            let key = *entry.key.inner();
            let Some(value) = self.evaluate_here(&entry.value) else {
                continue;
            };

            if !target.keys().contains(&key) {
                self.diagnostics.emit(
                    Diagnostic::error(format!("unknown {} attribute `{key}`", target.name()))
                        .with_code(ErrorCode::E308)
                        .with_label(entry.key.span(), "unknown attribute")
                        .with_help(format!("expected one of: {}", target.keys().join(", "))),
                );
                continue;
            }

            if key == "style" {
                let Some(style) = value.as_text() else {
                    self.emit_invalid(
                        &entry.value,
                        (
                            ErrorCode::E309,
                            format!("`style` expects a name, found {}", value.kind_name()),
                        ),
                    );
                    continue;
                };
                if target != Target::Preset {
                    if let Some(preset) = self.graph.styles.get(style) {
                        trace!(style; "Applying style preset");
                        for (k, v) in &preset.attributes {
                            if target.keys().contains(&k.as_str()) {
                                presets.insert(k.clone(), v.clone());
                                continue;
                            }
                            self.diagnostics.emit(
                                Diagnostic::error(format!(
                                    "style `{style}` sets `{k}`, which a {} does not accept",
                                    target.name()
                                ))
                                .with_code(ErrorCode::E308)
                                .with_label(entry.value.span(), "preset applied here")
                                .with_help(format!("expected one of: {}", target.keys().join(", "))),
                            );
                        }
                        continue;
                    }
                }
                if !LINE_STYLES.contains(&style) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("undefined style `{style}`"))
                            .with_code(ErrorCode::E401)
                            .with_label(entry.value.span(), "not a style preset or line style")
                            .with_help(format!(
                                "declare it with `style {style} {{ ... }}` or use one of: {}",
                                LINE_STYLES.join(", ")
                            )),
                    );
                    continue;
                }
            } else if let Err(problem) = check_attribute(key, &value) {
                self.emit_invalid(&entry.value, problem);
                continue;
            }

            local.insert(key.to_string(), value);
        }

        for (key, value) in local {
            presets.insert(key, value);
        }
        presets
    }

    fn emit_invalid(&mut self, value: &Spanned<AttrExpr<'_>>, (code, message): AttrProblem) {
        let label = if code == ErrorCode::E308 {
            "unknown attribute"
        } else {
            "invalid value"
        };
        self.diagnostics.emit(
            Diagnostic::error(message)
                .with_code(code)
                .with_label(value.span(), label),
        );
    }

    // First walk: style presets

    fn collect_styles(&mut self, statements: &[Statement<'src>]) {
        self.push_scope(statements, false);
        for statement in statements {
            match statement {
                Statement::Style { name, attrs, span } => self.declare_style(name, attrs, *span),
                Statement::Cluster { statements, .. } => self.collect_styles(statements),
                _ => {}
            }
        }
        self.scopes.pop();
    }

    fn declare_style(&mut self, name: &Spanned<&'src str>, attrs: &[AttrEntry<'src>], span: Span) {
        let id = Id::new(name.inner());
        if self.graph.styles.contains_key(&id) {
            self.diagnostics.emit(
                Diagnostic::error(format!("style `{id}` is declared more than once"))
                    .with_code(ErrorCode::E307)
                    .with_label(span, "duplicate style"),
            );
            return;
        }
        let attributes = self.resolve_attributes(attrs, Target::Preset);
        self.graph.styles.insert(
            id.clone(),
            StylePreset {
                name: id,
                attributes,
            },
        );
    }

    // Second walk: nodes, clusters, edges and graph attributes

    fn walk(&mut self, statements: &[Statement<'src>], cluster: Option<usize>) {
        self.push_scope(statements, true);
        let mut cluster_entries: Vec<AttrEntry<'src>> = Vec::new();

        for statement in statements {
            match statement {
                Statement::Node { name, attrs, span } => {
                    self.declare_node(name, attrs, *span, cluster)
                }
                Statement::Edge {
                    name,
                    chain,
                    hops,
                    attrs,
                    span,
                } => self.declare_edges(name.as_ref(), chain, hops, attrs, *span),
                Statement::Cluster {
                    name,
                    statements,
                    span,
                } => self.declare_cluster(name, statements, *span, cluster),
                Statement::Assign { key, value, .. } => match cluster {
                    Some(_) => cluster_entries.push(AttrEntry {
                        key: key.clone(),
                        value: value.clone(),
                    }),
                    None => self.set_graph_attribute(key, value),
                },
                Statement::Style { .. } | Statement::Let { .. } => {}
            }
        }

        match cluster {
            Some(index) => {
                let attributes = self.resolve_attributes(&cluster_entries, Target::Cluster);
                if let Some((_, cluster)) = self.graph.clusters.get_index_mut(index) {
                    cluster.attributes.extend(attributes);
                }
            }
            None => {
                let names: Vec<(&'src str, Span)> = self
                    .scopes
                    .first()
                    .map(|scope| {
                        scope
                            .bindings
                            .iter()
                            .map(|(name, binding)| (*name, binding.span))
                            .collect()
                    })
                    .unwrap_or_default();
                for (name, span) in names {
                    if let Some(value) = self.lookup(name, span, 1) {
                        self.graph.variables.insert(Id::new(name), value);
                    }
                }
            }
        }
        self.scopes.pop();
    }

    fn declare_node(
        &mut self,
        name: &Spanned<&'src str>,
        attrs: &[AttrEntry<'src>],
        span: Span,
        cluster: Option<usize>,
    ) {
        let id = Id::new(name.inner());
        if let Some(existing) = self.graph.nodes.get(&id) {
            let diagnostic = if existing.cluster != cluster
                && (existing.cluster.is_some() || cluster.is_some())
            {
                Diagnostic::error(format!(
                    "node `{id}` is declared in more than one cluster"
                ))
                .with_code(ErrorCode::E305)
                .with_help("a node belongs to at most one cluster")
            } else {
                Diagnostic::error(format!("node `{id}` is declared more than once"))
                    .with_code(ErrorCode::E307)
            };
            self.diagnostics.emit(
                diagnostic
                    .with_label(name.span(), "declared again here")
                    .with_secondary_label(existing.span, "first declared here"),
            );
            return;
        }

        let attributes = self.resolve_attributes(attrs, Target::Node);
        trace!(node = id.as_str(), cluster:?; "Declared node");
        self.graph.nodes.insert(
            id.clone(),
            Node {
                id,
                cluster,
                attributes,
                span,
            },
        );
    }

    fn declare_cluster(
        &mut self,
        name: &Spanned<&'src str>,
        statements: &[Statement<'src>],
        span: Span,
        parent: Option<usize>,
    ) {
        let id = Id::new(name.inner());
        let index = match self.graph.clusters.get_full(&id) {
            Some((index, _, existing)) => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("cluster `{id}` is declared more than once"))
                        .with_code(ErrorCode::E307)
                        .with_label(name.span(), "declared again here")
                        .with_secondary_label(existing.span, "first declared here"),
                );
                index
            }
            None => {
                let (index, _) = self.graph.clusters.insert_full(
                    id.clone(),
                    Cluster {
                        id,
                        parent,
                        attributes: AttributeMap::new(),
                        span,
                    },
                );
                index
            }
        };
        self.walk(statements, Some(index));
    }

    fn declare_edges(
        &mut self,
        name: Option<&Spanned<&'src str>>,
        chain: &[Spanned<&'src str>],
        hops: &[crate::parser_types::EdgeHop],
        attrs: &[AttrEntry<'src>],
        span: Span,
    ) {
        let attributes = self.resolve_attributes(attrs, Target::Edge);

        for (index, (hop, pair)) in hops.iter().zip(chain.windows(2)).enumerate() {
            let edge_name = name.map(|name| {
                if index == 0 {
                    Id::new(name.inner())
                } else {
                    Id::new(&format!("{}.{index}", name.inner()))
                }
            });
            if let (Some(edge_name), Some(name)) = (&edge_name, name) {
                if let Some(&first) = self.edge_names.get(edge_name) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("edge `{edge_name}` is declared more than once"))
                            .with_code(ErrorCode::E307)
                            .with_label(name.span(), "declared again here")
                            .with_secondary_label(first, "first declared here"),
                    );
                    continue;
                }
                self.edge_names.insert(edge_name.clone(), span);
            }

            self.pending_edges.push(PendingEdge {
                name: edge_name,
                source: pair[0].clone(),
                target: pair[1].clone(),
                directed: hop.directed,
                attributes: attributes.clone(),
                span: pair[0].span().union(pair[1].span()),
            });
        }
    }

    fn set_graph_attribute(&mut self, key: &Spanned<&'src str>, value: &Spanned<AttrExpr<'src>>) {
        let Some(resolved) = self.evaluate_here(value) else {
            return;
        };
        let name = *key.inner();

        let result = match name {
            "layout" => expect_keyword::<LayoutHint>(name, &resolved).map(|layout| {
                self.graph.layout = layout;
            }),
            "rankdir" => expect_keyword::<RankDir>(name, &resolved).map(|rankdir| {
                self.graph.rankdir = rankdir;
            }),
            "splines" => expect_keyword::<Splines>(name, &resolved).map(|splines| {
                self.graph.splines = splines;
            }),
            "nodesep" => expect_positive(name, &resolved).map(|()| {
                self.graph.node_separation = resolved.as_number().map(|n| n as f32);
            }),
            "ranksep" => expect_positive(name, &resolved).map(|()| {
                self.graph.rank_separation = resolved.as_number().map(|n| n as f32);
            }),
            "label" | "title" => expect_text(name, &resolved).map(|()| {
                self.graph.attributes.insert(name.to_string(), resolved.clone());
            }),
            "root" => expect_text(name, &resolved).map(|()| {
                self.graph.root = resolved.as_text().map(Id::new);
                self.root_span = Some(value.span());
            }),
            _ => {
                self.diagnostics.emit(
                    Diagnostic::error(format!("unknown graph attribute `{name}`"))
                        .with_code(ErrorCode::E308)
                        .with_label(key.span(), "unknown attribute")
                        .with_help(format!("expected one of: {}", GRAPH_KEYS.join(", "))),
                );
                Ok(())
            }
        };
        if let Err(problem) = result {
            self.emit_invalid(value, problem);
        }
    }

    /// Check edge endpoints and graph-wide rules once every node is known.
    fn finish(&mut self, span: Span) {
        for pending in std::mem::take(&mut self.pending_edges) {
            let mut resolved = true;
            for endpoint in [&pending.source, &pending.target] {
                if !self.graph.nodes.contains_key(*endpoint.inner()) {
                    self.diagnostics.emit(
                        Diagnostic::error(format!("undefined node `{}`", endpoint.inner()))
                            .with_code(ErrorCode::E306)
                            .with_label(endpoint.span(), "used in an edge but never declared")
                            .with_help(format!("declare it with `node {};`", endpoint.inner())),
                    );
                    resolved = false;
                }
            }
            if !resolved {
                continue;
            }

            self.graph.edges.push(Edge {
                name: pending.name,
                source: Id::new(pending.source.inner()),
                target: Id::new(pending.target.inner()),
                directed: pending.directed,
                attributes: pending.attributes,
                span: pending.span,
            });
        }

        if let (Some(root), Some(root_span)) = (&self.graph.root, self.root_span) {
            if !self.graph.nodes.contains_key(root) {
                self.diagnostics.emit(
                    Diagnostic::error(format!("undefined node `{root}`"))
                        .with_code(ErrorCode::E306)
                        .with_label(root_span, "`root` must name a declared node"),
                );
            }
        }

        if self.config.mixed_edges == MixedEdgePolicy::Reject && self.graph.has_mixed_edges() {
            self.diagnostics.emit(
                Diagnostic::error("graph mixes directed `->` and undirected `--` edges")
                    .with_code(ErrorCode::E312)
                    .with_label(span, "mixed edge kinds")
                    .with_help("use one edge operator throughout, or allow mixed edges"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexer::tokenize,
        parser::{parse_graph, significant},
    };

    fn build_with(source: &str, config: ParseConfig) -> (DiagramGraph, Vec<Diagnostic>) {
        let tokens = significant(tokenize(source, 0).expect("Failed to tokenize"));
        let decl = parse_graph(&tokens).expect("Failed to parse");
        build_diagram(&decl, &config)
    }

    fn build(source: &str) -> (DiagramGraph, Vec<Diagnostic>) {
        build_with(source, ParseConfig::default())
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<ErrorCode> {
        diagnostics.iter().filter_map(Diagnostic::code).collect()
    }

    #[test]
    fn test_basic_graph() {
        let (graph, diagnostics) = build("graph { node A; node B; A -> B; }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(graph.kind, DiagramKind::Directed);
        assert_eq!(graph.layout, LayoutHint::Dot);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.edges[0].directed);
    }

    #[test]
    fn test_undefined_node() {
        let (graph, diagnostics) = build("graph { node A; A -> B; }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E306]);
        assert!(diagnostics[0].message().contains("`B`"));
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_duplicate_edges_are_kept() {
        let (graph, diagnostics) = build("graph { node A; node B; A -> B; A -> B; }");
        assert!(diagnostics.is_empty());
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_edge_chain_and_mixed_edges() {
        let source = "graph { node A; node B; node C; A -> B -- C; }";
        let (graph, diagnostics) = build(source);
        assert!(diagnostics.is_empty());
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges[0].directed);
        assert!(!graph.edges[1].directed);

        let config = ParseConfig {
            mixed_edges: MixedEdgePolicy::Reject,
            ..ParseConfig::default()
        };
        let (_, diagnostics) = build_with(source, config);
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E312]);
    }

    #[test]
    fn test_style_preset_merge() {
        let (graph, diagnostics) = build(
            r#"graph {
                node A [style: Warn, color: "blue"];
                style Warn { color: "red", style: dashed, fill: "yellow" }
            }"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let node = &graph.nodes["A"];
        assert_eq!(node.attributes["color"], AttrValue::String("blue".to_string()));
        assert_eq!(node.attributes["style"], AttrValue::Ident("dashed".to_string()));
        assert_eq!(node.attributes["fill"], AttrValue::String("yellow".to_string()));
    }

    #[test]
    fn test_style_preset_keys_follow_target() {
        let (graph, diagnostics) = build(
            r#"graph {
                style Arrow { arrowhead: vee, color: "red" }
                node A [style: Arrow];
                node B;
                A -> B [style: Arrow];
            }"#,
        );
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E308]);
        assert!(diagnostics[0].message().contains("`arrowhead`"));
        let node = &graph.nodes["A"];
        assert_eq!(node.attributes["color"], AttrValue::String("red".to_string()));
        assert!(!node.attributes.contains_key("arrowhead"));
        let edge = &graph.edges[0];
        assert_eq!(edge.attributes["arrowhead"], AttrValue::Ident("vee".to_string()));
    }

    #[test]
    fn test_style_disambiguation() {
        let (graph, diagnostics) = build("graph { node A [style: dotted]; node B [style: Fancy]; }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E401]);
        assert_eq!(graph.nodes["A"].attributes["style"], AttrValue::Ident("dotted".to_string()));
    }

    #[test]
    fn test_variables_and_scopes() {
        let (graph, diagnostics) = build(
            r#"graph {
                node A { color: $accent };
                let accent = "red";
                cluster Inner {
                    let accent = "green";
                    node B { color: $accent, label: $title };
                }
                node C { color: $missing };
                let title = "T";
            }"#,
        );
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E400]);
        assert_eq!(graph.nodes["A"].attributes["color"], AttrValue::String("red".to_string()));
        assert_eq!(graph.nodes["B"].attributes["color"], AttrValue::String("green".to_string()));
        assert_eq!(graph.nodes["B"].attributes["label"], AttrValue::String("T".to_string()));
        assert!(graph.nodes["C"].attributes.is_empty());
        assert_eq!(graph.variables.len(), 2);
    }

    #[test]
    fn test_cluster_membership() {
        let (graph, diagnostics) = build(
            "graph { cluster Outer { label = \"o\"; cluster Inner { node A; } } cluster Other { node A; } }",
        );
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E305]);
        assert_eq!(graph.clusters.len(), 3);
        assert_eq!(graph.clusters["Inner"].parent, Some(0));
        assert_eq!(graph.nodes["A"].cluster, Some(1));
        assert_eq!(
            graph.clusters["Outer"].attributes["label"],
            AttrValue::String("o".to_string())
        );
    }

    #[test]
    fn test_duplicate_names() {
        let (_, diagnostics) = build("graph { node A; node A; node B; e: A -> B; e: B -> A; }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E307, ErrorCode::E307]);
    }

    #[test]
    fn test_attribute_vocabulary() {
        let (_, diagnostics) = build(
            r#"graph {
                node A { shape: hexagon, size: 3 };
                node B;
                A -> B { penwidth: "x", arrowhead: vee, font: { size: 12, slant: 1 } };
            }"#,
        );
        assert_eq!(
            codes(&diagnostics),
            vec![ErrorCode::E309, ErrorCode::E308, ErrorCode::E309, ErrorCode::E308]
        );
    }

    #[test]
    fn test_graph_attributes() {
        let (graph, diagnostics) = build(
            r#"graph mindmap { rankdir = LR; splines = ortho; nodesep = 30; title = "Plan"; root = A; node A; }"#,
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(graph.layout, LayoutHint::Twopi);
        assert_eq!(graph.rankdir, RankDir::LeftRight);
        assert_eq!(graph.splines, Splines::Ortho);
        assert_eq!(graph.node_separation, Some(30.0));
        assert_eq!(graph.title(), Some("Plan"));
        assert_eq!(graph.root, Some(Id::new("A")));

        let (_, diagnostics) = build("graph { layout = spring; bgcolor = \"x\"; }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E309, ErrorCode::E308]);
    }

    #[test]
    fn test_self_referencing_variable() {
        let (_, diagnostics) = build("graph { let a = $a; node A { label: $a }; }");
        assert_eq!(codes(&diagnostics), vec![ErrorCode::E400]);
    }
}
