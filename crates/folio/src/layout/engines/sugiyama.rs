//! Layered layout for hierarchical diagrams.
//!
//! The engine follows the usual four phases:
//!
//! 1. **Cycle removal** ([`cycles`]): edges that close a cycle are reversed
//!    for ranking only. Routes still run from the declared source.
//! 2. **Ranking** ([`ranking`]): longest path from the sources. A cluster
//!    whose members land on non-adjacent ranks is ranked as one block and
//!    then moved as a unit, so its members fill one band. Edges that span
//!    several ranks get one virtual node per intervening rank.
//! 3. **Ordering** ([`ordering`]): barycenter passes, bounded by
//!    `crossing_passes`.
//! 4. **Coordinates**: nodes are packed left to right within a layer and
//!    layers are stacked by rank, then the frame is turned to `rankdir`.

mod cycles;
mod ordering;
mod ranking;

use log::debug;

use folio_core::{
    diagram::{RankDir, Splines},
    geometry::{Bounds, Point, Size},
    layout::LayoutStats,
};
use folio_parser::error::{Diagnostic, DiagnosticCollector, ErrorCode};

use crate::{
    config::ClusterRankPolicy,
    error::FolioError,
    layout::{
        LayoutOptions, Placement,
        engines::LayoutEngine,
        routing::{anchored, orthogonal, self_loop},
    },
    structure::LayoutGraph,
};

/// A node of the layered graph: a diagram node or a bend of a long edge.
#[derive(Debug, Clone)]
pub(crate) struct LayerNode {
    /// Diagram node index, `None` for virtual nodes.
    pub node: Option<usize>,
    pub rank: usize,
    pub cluster_path: Vec<usize>,
    /// Size in the top-to-bottom frame.
    pub size: Size,
}

/// Layered graph with the current order of every layer.
#[derive(Debug, Clone)]
pub(crate) struct Layering {
    pub nodes: Vec<LayerNode>,
    pub layers: Vec<Vec<usize>>,
    /// `(upper, lower)` pairs between adjacent ranks.
    pub segments: Vec<(usize, usize)>,
    pub upper: Vec<Vec<usize>>,
    pub lower: Vec<Vec<usize>>,
    /// Index of each node within its layer.
    pub position: Vec<usize>,
}

impl Layering {
    pub fn new(nodes: Vec<LayerNode>, layers: Vec<Vec<usize>>, segments: Vec<(usize, usize)>) -> Self {
        let mut upper = vec![Vec::new(); nodes.len()];
        let mut lower = vec![Vec::new(); nodes.len()];
        for &(top, bottom) in &segments {
            lower[top].push(bottom);
            upper[bottom].push(top);
        }
        let mut layering = Self {
            position: vec![0; nodes.len()],
            nodes,
            layers,
            segments,
            upper,
            lower,
        };
        layering.update_positions();
        layering
    }

    pub fn update_positions(&mut self) {
        for layer in &self.layers {
            for (index, &node) in layer.iter().enumerate() {
                self.position[node] = index;
            }
        }
    }
}

/// Number of cluster borders between two nodes placed side by side.
fn cluster_distance(a: &[usize], b: &[usize]) -> usize {
    let common = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    a.len() + b.len() - 2 * common
}

#[derive(Debug, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Build the layered graph. Returns it with the chain of layer nodes
    /// per diagram edge, in ranking direction; self-loops get no chain.
    fn layer(
        graph: &LayoutGraph<'_>,
        ranks: &[usize],
        reversed: &[bool],
        horizontal: bool,
    ) -> (Layering, Vec<Vec<usize>>) {
        let mut nodes: Vec<LayerNode> = (0..graph.node_count())
            .map(|node| {
                let size = graph.size(node);
                LayerNode {
                    node: Some(node),
                    rank: ranks[node],
                    cluster_path: graph.cluster_path(node).to_vec(),
                    size: if horizontal { size.transpose() } else { size },
                }
            })
            .collect();

        let mut segments = Vec::new();
        let mut chains = Vec::with_capacity(graph.edge_count());
        for edge in 0..graph.edge_count() {
            if graph.is_self_loop(edge) {
                chains.push(Vec::new());
                continue;
            }
            let (source, target) = graph.endpoints(edge);
            let (upper, lower) = if reversed[edge] {
                (target, source)
            } else {
                (source, target)
            };

            let upper_path = graph.cluster_path(upper);
            let lower_path = graph.cluster_path(lower);
            let common = upper_path
                .iter()
                .zip(lower_path)
                .take_while(|(a, b)| a == b)
                .count();

            let mut chain = vec![upper];
            let mut previous = upper;
            for rank in ranks[upper] + 1..ranks[lower] {
                let virtual_node = nodes.len();
                nodes.push(LayerNode {
                    node: None,
                    rank,
                    cluster_path: upper_path[..common].to_vec(),
                    size: Size::default(),
                });
                segments.push((previous, virtual_node));
                chain.push(virtual_node);
                previous = virtual_node;
            }
            segments.push((previous, lower));
            chain.push(lower);
            chains.push(chain);
        }

        let layer_count = ranks.iter().max().map_or(0, |&max| max + 1);
        let mut layers = vec![Vec::new(); layer_count];
        for (index, node) in nodes.iter().enumerate() {
            layers[node.rank].push(index);
        }

        (Layering::new(nodes, layers, segments), chains)
    }

    /// Centers of all layer nodes in the top-to-bottom frame.
    fn coordinates(layering: &Layering, options: &LayoutOptions) -> Vec<Point> {
        let mut along = vec![0.0f32; layering.nodes.len()];
        let mut widths = Vec::with_capacity(layering.layers.len());
        for layer in &layering.layers {
            let mut cursor = 0.0;
            let mut previous: Option<usize> = None;
            for &node in layer {
                if let Some(prev) = previous {
                    let borders = cluster_distance(
                        &layering.nodes[prev].cluster_path,
                        &layering.nodes[node].cluster_path,
                    );
                    cursor += options.node_separation + options.cluster_padding * borders as f32;
                }
                let width = layering.nodes[node].size.width();
                along[node] = cursor + width / 2.0;
                cursor += width;
                previous = Some(node);
            }
            widths.push(cursor);
        }

        let widest = widths.iter().copied().fold(0.0, f32::max);
        for (layer, width) in layering.layers.iter().zip(&widths) {
            let offset = (widest - width) / 2.0;
            for &node in layer {
                along[node] += offset;
            }
        }

        let mut across = vec![0.0f32; layering.layers.len()];
        let mut cursor = 0.0;
        for (rank, layer) in layering.layers.iter().enumerate() {
            if rank > 0 {
                let borders = cluster_set_difference(layering, rank - 1, rank);
                cursor += options.rank_separation + options.cluster_padding * borders as f32;
            }
            let thickness = layer
                .iter()
                .map(|&node| layering.nodes[node].size.height())
                .fold(0.0, f32::max);
            across[rank] = cursor + thickness / 2.0;
            cursor += thickness;
        }

        layering
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| Point::new(along[index], across[node.rank]))
            .collect()
    }
}

/// Clusters present in exactly one of two layers.
fn cluster_set_difference(layering: &Layering, a: usize, b: usize) -> usize {
    let clusters = |rank: usize| -> Vec<usize> {
        let mut set: Vec<usize> = layering.layers[rank]
            .iter()
            .flat_map(|&node| layering.nodes[node].cluster_path.iter().copied())
            .collect();
        set.sort_unstable();
        set.dedup();
        set
    };
    let (first, second) = (clusters(a), clusters(b));
    first.iter().filter(|c| !second.contains(c)).count()
        + second.iter().filter(|c| !first.contains(c)).count()
}

/// Turn a top-to-bottom frame point to `rankdir`.
fn orient(point: Point, rankdir: RankDir) -> Point {
    match rankdir {
        RankDir::TopBottom => point,
        RankDir::BottomTop => Point::new(point.x(), -point.y()),
        RankDir::LeftRight => point.transpose(),
        RankDir::RightLeft => Point::new(-point.y(), point.x()),
    }
}

impl LayoutEngine for Engine {
    fn place(
        &self,
        graph: &LayoutGraph<'_>,
        options: &LayoutOptions,
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<Option<Placement>, FolioError> {
        let mut reversed = cycles::break_cycles(graph);
        let mut ranks = ranking::assign_ranks(graph, &reversed);

        let disjoint = ranking::disjoint_clusters(graph, &ranks);
        for &cluster in &disjoint {
            let Some((id, def)) = graph.diagram().clusters.get_index(cluster) else {
                continue;
            };
            let diagnostic = match options.cluster_ranks {
                ClusterRankPolicy::Approximate => Diagnostic::warning(format!(
                    "members of cluster `{id}` sit on non-adjacent ranks; they are moved onto one band"
                )),
                ClusterRankPolicy::Reject => Diagnostic::error(format!(
                    "members of cluster `{id}` sit on non-adjacent ranks"
                ))
                .with_help("move the cluster's nodes onto adjacent ranks, or allow approximate cluster bands"),
            };
            diagnostics.emit(
                diagnostic
                    .with_code(ErrorCode::E310)
                    .with_label(def.span, "cluster declared here"),
            );
        }
        if !disjoint.is_empty() {
            if options.cluster_ranks == ClusterRankPolicy::Reject {
                return Ok(None);
            }
            (ranks, reversed) = ranking::band_clusters(graph, &disjoint);
        }

        let horizontal = options.rankdir.is_horizontal();
        let (mut layering, chains) = Self::layer(graph, &ranks, &reversed, horizontal);
        let (passes, crossings) = ordering::order_layers(&mut layering, options.crossing_passes);

        let centers: Vec<Point> = Self::coordinates(&layering, options)
            .into_iter()
            .map(|center| orient(center, options.rankdir))
            .collect();
        let bounds: Vec<Bounds> = (0..graph.node_count())
            .map(|node| Bounds::new_from_center(centers[node], graph.size(node)))
            .collect();

        let routes = chains
            .iter()
            .enumerate()
            .map(|(edge, chain)| {
                let (source, target) = graph.endpoints(edge);
                if chain.is_empty() {
                    return self_loop(bounds[source], horizontal);
                }
                let mut via: Vec<Point> = chain[1..chain.len() - 1]
                    .iter()
                    .map(|&node| centers[node])
                    .collect();
                if reversed[edge] {
                    via.reverse();
                }
                let points = anchored(bounds[source], &via, bounds[target]);
                match options.splines {
                    Splines::Ortho => orthogonal(&points, horizontal),
                    Splines::Line => points,
                }
            })
            .collect();

        let stats = LayoutStats {
            crossing_passes: passes,
            reversed_edges: reversed.iter().filter(|&&r| r).count(),
            crossings,
            iterations: 0,
        };
        debug!(
            layers = layering.layers.len(),
            virtual_nodes = layering.nodes.len() - graph.node_count(),
            passes,
            crossings;
            "Layered layout computed"
        );

        Ok(Some(Placement {
            bounds,
            ranks: Some(ranks),
            routes,
            reversed,
            stats,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::LayoutConfig,
        layout::engines::test_support::{layout_graph, parse_diagram},
    };

    fn place(source: &str, config: LayoutConfig) -> (Option<Placement>, Vec<Diagnostic>) {
        let diagram = parse_diagram(source);
        let graph = layout_graph(&diagram);
        let options = LayoutOptions::new(&config, &diagram);
        let mut diagnostics = DiagnosticCollector::new();
        let placement = Engine::new()
            .place(&graph, &options, &mut diagnostics)
            .expect("Failed to place");
        (placement, diagnostics.into_diagnostics())
    }

    #[test]
    fn test_long_edge_gets_bend_per_rank() {
        let (placement, _) = place(
            "graph { node A; node B; node C; node D; A -> B; B -> C; C -> D; A -> D; }",
            LayoutConfig::default(),
        );
        let placement = placement.expect("Expected a placement");
        assert_eq!(placement.ranks, Some(vec![0, 1, 2, 3]));
        // A -> D crosses ranks 1 and 2.
        assert_eq!(placement.routes[3].len(), 4);
    }

    #[test]
    fn test_reversed_edge_points_from_declared_source() {
        let (placement, _) = place(
            "graph { node A; node B; node C; A -> B; B -> C; C -> A; }",
            LayoutConfig::default(),
        );
        let placement = placement.expect("Expected a placement");
        assert_eq!(placement.reversed, vec![false, false, true]);

        let route = &placement.routes[2];
        let c = placement.bounds[2];
        let a = placement.bounds[0];
        let first = route.first().copied().expect("route has points");
        let last = route.last().copied().expect("route has points");
        assert!(first.y() >= c.min_y() && first.y() <= c.max_y());
        assert!(last.y() >= a.min_y() && last.y() <= a.max_y());
    }

    #[test]
    fn test_rankdir_left_right() {
        let (placement, _) = place(
            "graph { rankdir = LR; node A; node B; A -> B; }",
            LayoutConfig::default(),
        );
        let placement = placement.expect("Expected a placement");
        let (a, b) = (placement.bounds[0].center(), placement.bounds[1].center());
        assert!(b.x() > a.x());
        assert_eq!(a.y(), b.y());
    }

    #[test]
    fn test_disjoint_cluster_policies() {
        let source = "graph { cluster Split { node A; node C; } node B; A -> B; B -> C; }";
        let (placement, diagnostics) = place(source, LayoutConfig::default());
        assert!(placement.is_some());
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());

        let config = LayoutConfig {
            cluster_ranks: ClusterRankPolicy::Reject,
            ..LayoutConfig::default()
        };
        let (placement, diagnostics) = place(source, config);
        assert!(placement.is_none());
        assert_eq!(diagnostics[0].code(), Some(ErrorCode::E310));
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_disjoint_cluster_becomes_one_band() {
        let source = "graph { cluster Split { node A; node C; } node B; A -> B; B -> C; }";
        let (placement, _) = place(source, LayoutConfig::default());
        let placement = placement.expect("Expected a placement");
        // Nodes are A, C, B; B -> C now points up.
        assert_eq!(placement.ranks, Some(vec![0, 0, 1]));
        assert_eq!(placement.reversed, vec![false, true]);
        assert_eq!(placement.stats.reversed_edges, 1);

        let route = &placement.routes[1];
        let b = placement.bounds[2];
        let first = route.first().copied().expect("route has points");
        assert!(first.y() >= b.min_y() && first.y() <= b.max_y());
    }

    #[test]
    fn test_components_share_layers() {
        let (placement, _) = place(
            "graph { node A; node B; node C; node D; A -> B; C -> D; }",
            LayoutConfig::default(),
        );
        let placement = placement.expect("Expected a placement");
        assert_eq!(placement.ranks, Some(vec![0, 1, 0, 1]));
        let [a, b, c, d] = [0, 1, 2, 3].map(|i| placement.bounds[i]);
        assert_eq!(a.center().y(), c.center().y());
        assert_eq!(b.center().y(), d.center().y());
        assert!(a.max_x() < c.min_x());
        assert!(b.max_x() < d.min_x());
    }

    #[test]
    fn test_ortho_routes_are_axis_aligned() {
        let (placement, _) = place(
            "graph { splines = ortho; node A; node B; node C; A -> B; A -> C; }",
            LayoutConfig::default(),
        );
        let placement = placement.expect("Expected a placement");
        for route in &placement.routes {
            for pair in route.windows(2) {
                assert!(pair[0].x() == pair[1].x() || pair[0].y() == pair[1].y());
            }
        }
    }

    #[test]
    fn test_cluster_distance() {
        assert_eq!(cluster_distance(&[0, 1], &[0, 2]), 2);
        assert_eq!(cluster_distance(&[], &[3]), 1);
        assert_eq!(cluster_distance(&[4], &[4]), 0);
    }
}
