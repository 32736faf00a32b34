//! Layout properties checked through the public builder.

use folio::{Document, DocumentBuilder, layout::LayoutResult};
use proptest::prelude::*;

fn source(nodes: usize, edges: &[(usize, usize)], header: &str) -> String {
    let mut text = format!("graph {header}{{\n");
    for node in 0..nodes {
        text.push_str(&format!("    node N{node};\n"));
    }
    for (source, target) in edges {
        text.push_str(&format!("    N{source} -> N{target};\n"));
    }
    text.push_str("}\n");
    text
}

fn layout(document: &Document) -> &LayoutResult {
    document
        .diagrams()
        .next()
        .and_then(|view| view.layout)
        .expect("Expected a laid out diagram")
}

/// Graphs whose edges only point from lower to higher node numbers.
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..9).prop_flat_map(|nodes| {
        let edge = (0..nodes - 1).prop_flat_map(move |source| (Just(source), source + 1..nodes));
        (Just(nodes), prop::collection::vec(edge, 0..12))
    })
}

fn any_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..8).prop_flat_map(|nodes| {
        (Just(nodes), prop::collection::vec((0..nodes, 0..nodes), 0..12))
    })
}

proptest! {
    #[test]
    fn edgeless_graphs_get_disjoint_rectangles(
        nodes in 1usize..12,
        header in prop::sample::select(vec!["", "undirected ", "mindmap ", "network "]),
    ) {
        let document = DocumentBuilder::default().build("edgeless.folio", &source(nodes, &[], header));
        prop_assert!(!document.has_errors());
        let result = layout(&document);

        prop_assert_eq!(result.nodes.len(), nodes);
        prop_assert_eq!(result.stats.crossing_passes, 0);
        for (i, a) in result.nodes.iter().enumerate() {
            for b in &result.nodes[i + 1..] {
                prop_assert!(!a.bounds.intersects(&b.bounds), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn dag_ranks_increase_along_edges((nodes, edges) in dag()) {
        let document = DocumentBuilder::default().build("dag.folio", &source(nodes, &edges, ""));
        let result = layout(&document);

        prop_assert_eq!(result.stats.reversed_edges, 0);
        for edge in &result.edges {
            let source = result.node(edge.source.as_str()).and_then(|node| node.rank);
            let target = result.node(edge.target.as_str()).and_then(|node| node.rank);
            prop_assert!(target > source, "{} -> {}", edge.source, edge.target);
        }
    }

    #[test]
    fn layout_is_deterministic(
        (nodes, edges) in any_graph(),
        header in prop::sample::select(vec!["", "undirected ", "mindmap ", "network "]),
    ) {
        let text = source(nodes, &edges, header);
        let builder = DocumentBuilder::default();
        let first = builder.build("first.folio", &text);
        let second = builder.build("second.folio", &text);
        prop_assert_eq!(layout(&first), layout(&second));
    }
}

#[test]
fn three_cycle_reverses_one_edge() {
    let document = DocumentBuilder::default().build(
        "cycle.folio",
        "graph { node A; node B; node C; A -> B; B -> C; C -> A; }\n",
    );
    let result = layout(&document);

    assert_eq!(result.stats.reversed_edges, 1);
    let reversed: Vec<_> = result.edges.iter().filter(|edge| edge.reversed).collect();
    assert_eq!(reversed.len(), 1);

    // Every route still starts at its declared source.
    for edge in &result.edges {
        assert!(edge.directed);
        let source = result.node(edge.source.as_str()).expect("source laid out").bounds;
        let start = edge.points[0];
        assert!(start.x() >= source.min_x() - 0.01 && start.x() <= source.max_x() + 0.01);
        assert!(start.y() >= source.min_y() - 0.01 && start.y() <= source.max_y() + 0.01);
    }
}

#[test]
fn duplicate_edges_get_separate_layouts() {
    let document = DocumentBuilder::default().build(
        "dup.folio",
        "graph { node A; node B; A -> B; A -> B; }\n",
    );
    let result = layout(&document);
    assert_eq!(result.edges.len(), 2);
    assert_eq!(result.edges[0].index, 0);
    assert_eq!(result.edges[1].index, 1);
}

#[test]
fn rankdir_turns_the_rank_axis() {
    let ranks = |dir: &str| {
        let text = format!("graph {{ rankdir = {dir}; node A; node B; A -> B; }}\n");
        let document = DocumentBuilder::default().build("dir.folio", &text);
        let result = layout(&document).clone();
        let a = result.node("A").expect("A").bounds.center();
        let b = result.node("B").expect("B").bounds.center();
        (b.x() - a.x(), b.y() - a.y())
    };

    let (dx, dy) = ranks("TB");
    assert!(dx.abs() < 0.01 && dy > 0.0);
    let (dx, dy) = ranks("BT");
    assert!(dx.abs() < 0.01 && dy < 0.0);
    let (dx, dy) = ranks("LR");
    assert!(dx > 0.0 && dy.abs() < 0.01);
    let (dx, dy) = ranks("RL");
    assert!(dx < 0.0 && dy.abs() < 0.01);
}
