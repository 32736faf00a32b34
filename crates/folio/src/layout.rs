//! Diagram layout.
//!
//! [`layout_diagram`] sizes the nodes, hands the graph to the engine chosen
//! by the diagram's layout hint and assembles the engine's [`Placement`] into
//! a [`LayoutResult`]: cluster boxes are wrapped around their members and
//! the whole drawing is moved so its top-left corner sits at the margin.
//!
//! Every step iterates in declaration order and the force engines draw from
//! a seeded generator, so the same graph always yields the same coordinates.

pub(crate) mod engines;
pub(crate) mod routing;
pub mod sizing;

use log::{debug, info};

pub use folio_core::layout::{ClusterLayout, EdgeLayout, LayoutResult, LayoutStats, NodeLayout};

use folio_core::{
    diagram::{DiagramGraph, RankDir, Splines},
    geometry::{Bounds, Point, Size},
};
use folio_parser::error::DiagnosticCollector;

use crate::{
    config::{ClusterRankPolicy, LayoutConfig},
    error::FolioError,
    layout::{
        routing::{anchored, orthogonal, self_loop},
        sizing::NodeSizer,
    },
    structure::LayoutGraph,
};

/// Bound on overlap-removal sweeps.
const SEPARATION_SWEEPS: usize = 32;

/// Configuration merged with the diagram's own layout attributes.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub rankdir: RankDir,
    pub splines: Splines,
    pub node_separation: f32,
    pub rank_separation: f32,
    pub margin: f32,
    pub cluster_padding: f32,
    pub crossing_passes: usize,
    pub force_iterations: usize,
    pub convergence_threshold: f32,
    pub seed: u64,
    pub cluster_ranks: ClusterRankPolicy,
    /// Node index of the graph's `root`, when it names a node.
    pub root: Option<usize>,
}

impl LayoutOptions {
    pub fn new(config: &LayoutConfig, diagram: &DiagramGraph) -> Self {
        Self {
            rankdir: diagram.rankdir,
            splines: diagram.splines,
            node_separation: diagram.node_separation.unwrap_or(config.node_separation).max(0.0),
            rank_separation: diagram.rank_separation.unwrap_or(config.rank_separation).max(0.0),
            margin: config.margin.max(0.0),
            cluster_padding: config.cluster_padding.max(0.0),
            crossing_passes: config.crossing_passes,
            force_iterations: config.force_iterations,
            convergence_threshold: config.convergence_threshold,
            seed: config.seed,
            cluster_ranks: config.cluster_ranks,
            root: diagram
                .root
                .as_ref()
                .and_then(|root| diagram.node_index(root.as_str())),
        }
    }
}

/// Engine output before cluster boxes and normalization.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// Node rectangles by node index.
    pub bounds: Vec<Bounds>,
    /// Layer per node, for layered engines.
    pub ranks: Option<Vec<usize>>,
    /// Route per edge, from declared source to declared target.
    pub routes: Vec<Vec<Point>>,
    pub reversed: Vec<bool>,
    pub stats: LayoutStats,
}

/// Lay out one validated diagram.
///
/// Returns `Ok(None)` when a layout policy refuses the graph; the reason is
/// in `diagnostics`.
///
/// # Errors
///
/// Returns [`FolioError::Layout`] if an edge refers to a missing node or the
/// engine output does not match the graph.
pub fn layout_diagram(
    diagram: &DiagramGraph,
    config: &LayoutConfig,
    diagnostics: &mut DiagnosticCollector,
) -> Result<Option<LayoutResult>, FolioError> {
    let sizer = NodeSizer::new(config);
    let graph = LayoutGraph::new(diagram, &sizer)?;
    let options = LayoutOptions::new(config, diagram);

    debug!(
        layout:% = diagram.layout,
        nodes = graph.node_count(),
        edges = graph.edge_count();
        "Laying out diagram"
    );

    let placement = if graph.node_count() == 0 {
        Placement::default()
    } else {
        match engines::engine(diagram.layout).place(&graph, &options, diagnostics)? {
            Some(placement) => placement,
            None => return Ok(None),
        }
    };

    if placement.bounds.len() != graph.node_count() || placement.routes.len() != graph.edge_count() {
        return Err(FolioError::Layout(format!(
            "engine placed {} of {} nodes and {} of {} edges",
            placement.bounds.len(),
            graph.node_count(),
            placement.routes.len(),
            graph.edge_count()
        )));
    }

    let result = assemble(&graph, placement, &options);
    info!(
        width = result.size.width(),
        height = result.size.height(),
        crossings = result.stats.crossings;
        "Diagram laid out"
    );
    Ok(Some(result))
}

/// Wrap clusters, normalize to the margin and name everything.
fn assemble(graph: &LayoutGraph<'_>, placement: Placement, options: &LayoutOptions) -> LayoutResult {
    let diagram = graph.diagram();
    let clusters = cluster_bounds(graph, &placement.bounds, options.cluster_padding);

    let extent = placement
        .bounds
        .iter()
        .copied()
        .chain(clusters.iter().flatten().copied())
        .chain(
            placement
                .routes
                .iter()
                .flatten()
                .map(|point| point.to_bounds(Size::default())),
        )
        .reduce(|a, b| a.merge(&b));

    let (offset, size) = match extent {
        Some(extent) => (
            Point::new(options.margin - extent.min_x(), options.margin - extent.min_y()),
            Size::new(
                extent.width() + 2.0 * options.margin,
                extent.height() + 2.0 * options.margin,
            ),
        ),
        None => (
            Point::default(),
            Size::new(2.0 * options.margin, 2.0 * options.margin),
        ),
    };

    let nodes = diagram
        .nodes
        .values()
        .zip(&placement.bounds)
        .enumerate()
        .map(|(index, (node, bounds))| NodeLayout {
            id: node.id.clone(),
            bounds: bounds.translate(offset),
            rank: placement.ranks.as_ref().and_then(|ranks| ranks.get(index).copied()),
        })
        .collect();

    let edges = diagram
        .edges
        .iter()
        .zip(placement.routes)
        .enumerate()
        .map(|(index, (edge, route))| EdgeLayout {
            index,
            source: edge.source.clone(),
            target: edge.target.clone(),
            directed: edge.directed,
            reversed: placement.reversed.get(index).copied().unwrap_or(false),
            points: route.into_iter().map(|point| point.add_point(offset)).collect(),
        })
        .collect();

    let clusters = diagram
        .clusters
        .values()
        .zip(clusters)
        .filter_map(|(cluster, bounds)| {
            bounds.map(|bounds| ClusterLayout {
                id: cluster.id.clone(),
                bounds: bounds.translate(offset),
            })
        })
        .collect();

    LayoutResult {
        nodes,
        edges,
        clusters,
        size,
        stats: placement.stats,
    }
}

/// Box per cluster around its direct members and nested cluster boxes,
/// grown by `padding`. Clusters with no nodes at any depth get no box.
fn cluster_bounds(graph: &LayoutGraph<'_>, nodes: &[Bounds], padding: f32) -> Vec<Option<Bounds>> {
    let diagram = graph.diagram();
    let mut boxes: Vec<Option<Bounds>> = vec![None; diagram.clusters.len()];

    for (node, bounds) in nodes.iter().enumerate() {
        if let Some(&innermost) = graph.cluster_path(node).last() {
            boxes[innermost] = Some(match boxes[innermost] {
                Some(current) => current.merge(bounds),
                None => *bounds,
            });
        }
    }

    // Innermost clusters first so each parent sees its children's padded boxes.
    let mut order: Vec<usize> = (0..diagram.clusters.len()).collect();
    order.sort_by_key(|&cluster| std::cmp::Reverse(diagram.cluster_path(cluster).len()));

    for cluster in order {
        let Some(inner) = boxes[cluster] else {
            continue;
        };
        let padded = inner.expand(padding);
        boxes[cluster] = Some(padded);
        let parent = diagram
            .clusters
            .get_index(cluster)
            .and_then(|(_, def)| def.parent);
        if let Some(parent) = parent {
            boxes[parent] = Some(match boxes[parent] {
                Some(current) => current.merge(&padded),
                None => padded,
            });
        }
    }
    boxes
}

/// Straight routes clipped to the node rectangles. Self-loops get a loop on
/// the right side.
pub(crate) fn straight_routes(
    graph: &LayoutGraph<'_>,
    bounds: &[Bounds],
    splines: Splines,
) -> Vec<Vec<Point>> {
    (0..graph.edge_count())
        .map(|edge| {
            let (source, target) = graph.endpoints(edge);
            if source == target {
                return self_loop(bounds[source], false);
            }
            let points = anchored(bounds[source], &[], bounds[target]);
            match splines {
                Splines::Ortho => orthogonal(&points, false),
                Splines::Line => points,
            }
        })
        .collect()
}

/// Push overlapping nodes apart until every pair keeps at least `gap`
/// between them or the sweep bound is reached.
///
/// Each overlapping pair moves apart along the axis with the smaller
/// overlap, half the distance each.
pub(crate) fn separate(centers: &mut [Point], sizes: &[Size], gap: f32) {
    for _ in 0..SEPARATION_SWEEPS {
        let mut moved = false;
        for i in 0..centers.len() {
            for j in i + 1..centers.len() {
                let delta = centers[j].sub_point(centers[i]);
                let need_x = (sizes[i].width() + sizes[j].width()) / 2.0 + gap;
                let need_y = (sizes[i].height() + sizes[j].height()) / 2.0 + gap;
                let overlap_x = need_x - delta.x().abs();
                let overlap_y = need_y - delta.y().abs();
                if overlap_x <= 0.0 || overlap_y <= 0.0 {
                    continue;
                }

                // Ties push toward the later node's side: right, then down.
                let push = if overlap_x <= overlap_y {
                    let sign = if delta.x() < 0.0 { -1.0 } else { 1.0 };
                    Point::new(sign * overlap_x / 2.0, 0.0)
                } else {
                    let sign = if delta.y() < 0.0 { -1.0 } else { 1.0 };
                    Point::new(0.0, sign * overlap_y / 2.0)
                };
                centers[i] = centers[i].sub_point(push);
                centers[j] = centers[j].add_point(push);
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}

/// Place independently laid out components side by side, left to right in
/// component order, top-aligned and `gap` apart.
pub(crate) fn pack_components(
    components: &[Vec<usize>],
    centers: &mut [Point],
    sizes: &[Size],
    gap: f32,
) {
    let mut cursor = 0.0;
    for component in components {
        let Some(extent) = component
            .iter()
            .map(|&node| centers[node].to_bounds(sizes[node]))
            .reduce(|a, b| a.merge(&b))
        else {
            continue;
        };
        let offset = Point::new(cursor - extent.min_x(), -extent.min_y());
        for &node in component {
            centers[node] = centers[node].add_point(offset);
        }
        cursor += extent.width() + gap;
    }
}
