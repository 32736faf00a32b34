//! Angular placement: concentric rings (`twopi`) and a single circle
//! (`circo`).

use std::{
    collections::VecDeque,
    f32::consts::{FRAC_PI_2, TAU},
};

use log::debug;

use folio_core::{
    geometry::{Bounds, Point, Size},
    layout::LayoutStats,
};
use folio_parser::error::DiagnosticCollector;

use crate::{
    error::FolioError,
    layout::{LayoutOptions, Placement, engines::LayoutEngine, pack_components, separate, straight_routes},
    structure::LayoutGraph,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Breadth-first rings around a root.
    Rings,
    /// One circle in depth-first order.
    Circle,
}

#[derive(Debug)]
pub struct Engine {
    variant: Variant,
}

impl Engine {
    pub fn new(variant: Variant) -> Self {
        Self { variant }
    }
}

/// Spanning tree of a component found by breadth-first search.
struct Tree {
    /// Nodes in visit order; the first is the root.
    order: Vec<usize>,
    depth: Vec<usize>,
    children: Vec<Vec<usize>>,
}

fn spanning_tree(graph: &LayoutGraph<'_>, root: usize) -> Tree {
    let mut depth = vec![usize::MAX; graph.node_count()];
    let mut children = vec![Vec::new(); graph.node_count()];
    let mut order = Vec::new();
    let mut queue = VecDeque::from([root]);
    depth[root] = 0;

    while let Some(node) = queue.pop_front() {
        order.push(node);
        let neighbors: Vec<usize> = graph.neighbors(node).collect();
        for neighbor in neighbors {
            if depth[neighbor] == usize::MAX {
                depth[neighbor] = depth[node] + 1;
                children[node].push(neighbor);
                queue.push_back(neighbor);
            }
        }
    }
    Tree {
        order,
        depth,
        children,
    }
}

/// Rings around `root`: depth `d` sits at radius `d * step`, and every
/// subtree gets an angular wedge proportional to its leaf count.
fn rings(graph: &LayoutGraph<'_>, root: usize, options: &LayoutOptions, centers: &mut [Point]) {
    let tree = spanning_tree(graph, root);
    let extent = graph.max_extent();

    let mut leaves = vec![0usize; graph.node_count()];
    for &node in tree.order.iter().rev() {
        leaves[node] = tree.children[node]
            .iter()
            .map(|&child| leaves[child])
            .sum::<usize>()
            .max(1);
    }

    let deepest = tree.order.iter().map(|&node| tree.depth[node]).max().unwrap_or(0);
    let mut population = vec![0usize; deepest + 1];
    for &node in &tree.order {
        population[tree.depth[node]] += 1;
    }
    let widest = population.iter().copied().max().unwrap_or(1) as f32;
    let step = (options.rank_separation + extent).max(widest * (extent + options.node_separation) / TAU);

    let mut wedges = vec![(0.0f32, TAU); graph.node_count()];
    for &node in &tree.order {
        let (start, span) = wedges[node];
        let radius = tree.depth[node] as f32 * step;
        let angle = start + span / 2.0 - FRAC_PI_2;
        centers[node] = Point::new(radius * angle.cos(), radius * angle.sin());

        let mut cursor = start;
        for &child in &tree.children[node] {
            let share = span * leaves[child] as f32 / leaves[node] as f32;
            wedges[child] = (cursor, share);
            cursor += share;
        }
    }
}

/// One circle in depth-first order from the component's first node.
fn circle(graph: &LayoutGraph<'_>, component: &[usize], options: &LayoutOptions, centers: &mut [Point]) {
    let mut order = Vec::with_capacity(component.len());
    let mut seen = vec![false; graph.node_count()];
    let mut stack = vec![component[0]];
    while let Some(node) = stack.pop() {
        if seen[node] {
            continue;
        }
        seen[node] = true;
        order.push(node);
        let neighbors: Vec<usize> = graph.neighbors(node).filter(|&n| !seen[n]).collect();
        stack.extend(neighbors.into_iter().rev());
    }

    if order.len() == 1 {
        centers[order[0]] = Point::default();
        return;
    }
    let count = order.len() as f32;
    let chord = graph.max_extent() + options.node_separation;
    let radius = chord / (2.0 * (std::f32::consts::PI / count).sin());
    for (slot, &node) in order.iter().enumerate() {
        let angle = TAU * slot as f32 / count - FRAC_PI_2;
        centers[node] = Point::new(radius * angle.cos(), radius * angle.sin());
    }
}

impl LayoutEngine for Engine {
    fn place(
        &self,
        graph: &LayoutGraph<'_>,
        options: &LayoutOptions,
        _diagnostics: &mut DiagnosticCollector,
    ) -> Result<Option<Placement>, FolioError> {
        let sizes: Vec<Size> = (0..graph.node_count()).map(|node| graph.size(node)).collect();
        let components = graph.components();
        let mut centers = vec![Point::default(); graph.node_count()];

        for component in &components {
            let Some(&first) = component.first() else {
                continue;
            };
            match self.variant {
                Variant::Rings => {
                    let root = options
                        .root
                        .filter(|root| component.contains(root))
                        .unwrap_or(first);
                    rings(graph, root, options, &mut centers);
                }
                Variant::Circle => circle(graph, component, options, &mut centers),
            }

            let mut local: Vec<Point> = component.iter().map(|&node| centers[node]).collect();
            let local_sizes: Vec<Size> = component.iter().map(|&node| sizes[node]).collect();
            separate(&mut local, &local_sizes, options.node_separation / 2.0);
            for (&node, center) in component.iter().zip(local) {
                centers[node] = center;
            }
        }
        pack_components(&components, &mut centers, &sizes, options.node_separation);

        let bounds: Vec<Bounds> = centers
            .iter()
            .zip(&sizes)
            .map(|(center, size)| center.to_bounds(*size))
            .collect();
        let routes = straight_routes(graph, &bounds, options.splines);

        debug!(variant:? = self.variant, components = components.len(); "Radial layout computed");

        Ok(Some(Placement {
            bounds,
            ranks: None,
            routes,
            reversed: vec![false; graph.edge_count()],
            stats: LayoutStats::default(),
        }))
    }
}
