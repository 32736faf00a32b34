//! Force-directed placement for undirected and network diagrams.
//!
//! A Fruchterman-Reingold style simulation: every pair of nodes repels, every
//! edge attracts, and a cooling temperature bounds how far a node moves per
//! iteration. Each connected component is simulated on its own and the
//! results are packed side by side.

use log::{debug, trace};
use rand::{Rng, SeedableRng, rngs::StdRng};

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

/// Parameter sets for the force family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Neato,
    Fdp,
    Sfdp,
}

impl Preset {
    /// Multiplier on the ideal edge length.
    fn spread(self) -> f32 {
        match self {
            Self::Neato => 1.0,
            Self::Fdp => 1.2,
            Self::Sfdp => 1.5,
        }
    }

    /// Temperature kept after each iteration.
    fn cooling(self) -> f32 {
        match self {
            Self::Neato => 0.95,
            Self::Fdp => 0.92,
            Self::Sfdp => 0.88,
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    preset: Preset,
}

impl Engine {
    pub fn new(preset: Preset) -> Self {
        Self { preset }
    }

    /// Simulate one component. Returns the iterations run.
    fn simulate(
        &self,
        graph: &LayoutGraph<'_>,
        component: &[usize],
        ideal: f32,
        options: &LayoutOptions,
        rng: &mut StdRng,
        centers: &mut [Point],
    ) -> usize {
        let columns = (component.len() as f32).sqrt().ceil().max(1.0) as usize;
        let jitter = ideal / 4.0;
        for (slot, &node) in component.iter().enumerate() {
            let grid = Point::new((slot % columns) as f32 * ideal, (slot / columns) as f32 * ideal);
            let nudge = Point::new(
                rng.random_range(-jitter..jitter),
                rng.random_range(-jitter..jitter),
            );
            centers[node] = grid.add_point(nudge);
        }
        if component.len() < 2 {
            return 0;
        }

        let mut slot_of = vec![usize::MAX; graph.node_count()];
        for (slot, &node) in component.iter().enumerate() {
            slot_of[node] = slot;
        }
        let springs: Vec<(usize, usize)> = component
            .iter()
            .flat_map(|&node| graph.outgoing(node).iter().map(|&edge| graph.endpoints(edge)))
            .filter(|(source, target)| source != target)
            .map(|(source, target)| (slot_of[source], slot_of[target]))
            .collect();

        let mut temperature = ideal * 2.0;
        let mut iterations = 0;
        while iterations < options.force_iterations {
            let mut shift = vec![Point::default(); component.len()];
            for i in 0..component.len() {
                for j in i + 1..component.len() {
                    let delta = separation(centers[component[i]], centers[component[j]], i, j);
                    let distance = delta.hypot();
                    let force = delta.scale(ideal * ideal / (distance * distance));
                    shift[i] = shift[i].add_point(force);
                    shift[j] = shift[j].sub_point(force);
                }
            }
            for &(a, b) in &springs {
                let delta = separation(centers[component[a]], centers[component[b]], a, b);
                let distance = delta.hypot();
                let force = delta.scale(distance / ideal);
                shift[a] = shift[a].sub_point(force);
                shift[b] = shift[b].add_point(force);
            }

            let mut largest = 0.0f32;
            for (slot, &node) in component.iter().enumerate() {
                let length = shift[slot].hypot();
                if length == 0.0 {
                    continue;
                }
                let step = length.min(temperature);
                centers[node] = centers[node].add_point(shift[slot].scale(step / length));
                largest = largest.max(step);
            }

            iterations += 1;
            temperature *= self.preset.cooling();
            if largest < options.convergence_threshold {
                trace!(iterations, largest; "Force simulation converged");
                break;
            }
        }
        iterations
    }
}

/// Vector from `b` to `a`. Coincident nodes are split along x by slot order
/// so the result never has zero length.
fn separation(a: Point, b: Point, slot_a: usize, slot_b: usize) -> Point {
    let delta = a.sub_point(b);
    if delta.hypot() > f32::EPSILON {
        return delta;
    }
    if slot_a < slot_b {
        Point::new(-0.01, 0.0)
    } else {
        Point::new(0.01, 0.0)
    }
}

impl LayoutEngine for Engine {
    fn place(
        &self,
        graph: &LayoutGraph<'_>,
        options: &LayoutOptions,
        _diagnostics: &mut DiagnosticCollector,
    ) -> Result<Option<Placement>, FolioError> {
        let ideal = ((graph.max_extent() + options.node_separation) * self.preset.spread()).max(1.0);
        let sizes: Vec<Size> = (0..graph.node_count()).map(|node| graph.size(node)).collect();
        let components = graph.components();

        let mut rng = StdRng::seed_from_u64(options.seed);
        let mut centers = vec![Point::default(); graph.node_count()];
        let mut iterations = 0;
        for component in &components {
            let ran = self.simulate(graph, component, ideal, options, &mut rng, &mut centers);
            iterations = iterations.max(ran);

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

        debug!(
            preset:? = self.preset,
            components = components.len(),
            iterations;
            "Force layout computed"
        );

        Ok(Some(Placement {
            bounds,
            ranks: None,
            routes,
            reversed: vec![false; graph.edge_count()],
            stats: LayoutStats {
                iterations,
                ..LayoutStats::default()
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::LayoutConfig,
        layout::engines::test_support::{diagram, layout_graph, parse_diagram},
    };

    fn place(preset: Preset, diagram: &folio_core::diagram::DiagramGraph, config: &LayoutConfig) -> Placement {
        let graph = layout_graph(diagram);
        let options = LayoutOptions::new(config, diagram);
        Engine::new(preset)
            .place(&graph, &options, &mut DiagnosticCollector::new())
            .expect("Failed to place")
            .expect("Expected a placement")
    }

    fn assert_disjoint(bounds: &[Bounds]) {
        for (i, a) in bounds.iter().enumerate() {
            for b in &bounds[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_coordinates() {
        let diagram = parse_diagram("graph undirected { node A; node B; node C; node D; A -- B; B -- C; C -- D; D -- A; }");
        let config = LayoutConfig::default();
        let first = place(Preset::Neato, &diagram, &config);
        let second = place(Preset::Neato, &diagram, &config);
        assert_eq!(first.bounds, second.bounds);
        assert_eq!(first.routes, second.routes);
    }

    #[test]
    fn test_iterations_are_bounded() {
        let diagram = diagram(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let config = LayoutConfig {
            force_iterations: 5,
            convergence_threshold: 0.0,
            ..LayoutConfig::default()
        };
        let placement = place(Preset::Fdp, &diagram, &config);
        assert_eq!(placement.stats.iterations, 5);
        assert_eq!(placement.stats.crossing_passes, 0);
    }

    #[test]
    fn test_nodes_do_not_overlap() {
        for preset in [Preset::Neato, Preset::Fdp, Preset::Sfdp] {
            let diagram = diagram(
                &["A", "B", "C", "D", "E", "F"],
                &[("A", "B"), ("A", "C"), ("A", "D"), ("E", "F"), ("E", "E")],
            );
            let placement = place(preset, &diagram, &LayoutConfig::default());
            assert_disjoint(&placement.bounds);
            assert_eq!(placement.routes[4].len(), 4);
        }
    }

    #[test]
    fn test_zero_extent_and_negative_spacing() {
        let diagram = diagram(&["A", "B"], &[("A", "B")]);
        let graph = layout_graph(&diagram);
        let mut options = LayoutOptions::new(&LayoutConfig::default(), &diagram);
        options.node_separation = -500.0;
        let placement = Engine::new(Preset::Neato)
            .place(&graph, &options, &mut DiagnosticCollector::new())
            .expect("Failed to place")
            .expect("Expected a placement");
        assert!(placement.bounds.iter().all(|b| b.min_x().is_finite() && b.min_y().is_finite()));
    }

    #[test]
    fn test_components_pack_left_to_right() {
        let diagram = diagram(&["A", "B", "C"], &[("A", "B")]);
        let placement = place(Preset::Neato, &diagram, &LayoutConfig::default());
        let a = placement.bounds[0].center();
        let b = placement.bounds[1].center();
        let c = placement.bounds[2].center();
        assert!(c.x() > a.x().max(b.x()));
        assert!(placement.bounds[2].min_x() > placement.bounds[0].max_x().max(placement.bounds[1].max_x()));
    }
}
