//! Layout output consumed by renderers.
//!
//! A [`LayoutResult`] holds final geometry only. Attributes stay on the
//! [`DiagramGraph`](crate::diagram::DiagramGraph) it was computed from; node,
//! edge and cluster entries line up with the graph's collections by index.

use serde::Serialize;

use crate::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: Id,
    pub bounds: Bounds,
    /// Layer index for hierarchical layouts.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    /// Index into [`DiagramGraph::edges`](crate::diagram::DiagramGraph::edges).
    pub index: usize,
    pub source: Id,
    pub target: Id,
    pub directed: bool,
    /// Whether cycle removal ranked this edge against its declared direction.
    pub reversed: bool,
    /// Route from the declared source to the declared target.
    pub points: Vec<Point>,
}

impl EdgeLayout {
    /// Inner points of the route, excluding both anchors.
    pub fn bends(&self) -> &[Point] {
        match self.points.len() {
            0..=2 => &[],
            len => &self.points[1..len - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterLayout {
    pub id: Id,
    pub bounds: Bounds,
}

/// Counters describing how the layout was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    /// Barycenter passes run during crossing reduction.
    pub crossing_passes: usize,
    /// Edges reversed to break cycles.
    pub reversed_edges: usize,
    /// Edge crossings left between adjacent layers.
    pub crossings: usize,
    /// Iterations run by force-directed placement.
    pub iterations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutResult {
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub clusters: Vec<ClusterLayout>,
    pub size: Size,
    pub stats: LayoutStats,
}

impl LayoutResult {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn cluster(&self, id: &str) -> Option<&ClusterLayout> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bends_excludes_anchors() {
        let edge = EdgeLayout {
            index: 0,
            source: Id::new("A"),
            target: Id::new("B"),
            directed: true,
            reversed: false,
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 10.0),
                Point::new(0.0, 20.0),
            ],
        };
        assert_eq!(edge.bends(), &[Point::new(0.0, 10.0)]);

        let straight = EdgeLayout {
            points: vec![Point::new(0.0, 0.0), Point::new(0.0, 20.0)],
            ..edge
        };
        assert!(straight.bends().is_empty());
    }
}
