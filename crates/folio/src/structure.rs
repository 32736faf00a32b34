//! Index-based view of a diagram graph used by the layout engines.
//!
//! [`LayoutGraph`] resolves every edge endpoint to a node index once and
//! keeps incoming and outgoing edge lists per node, so engines never look
//! nodes up by name. Nodes and edges keep declaration order, which is what
//! makes layout deterministic.

use petgraph::unionfind::UnionFind;

use folio_core::{diagram::DiagramGraph, geometry::Size};

use crate::{error::FolioError, layout::sizing::NodeSizer};

#[derive(Debug)]
pub struct LayoutGraph<'a> {
    diagram: &'a DiagramGraph,
    sizes: Vec<Size>,
    /// `(source, target)` node indices per diagram edge.
    endpoints: Vec<(usize, usize)>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    /// Cluster chain per node, outermost first.
    cluster_paths: Vec<Vec<usize>>,
}

impl<'a> LayoutGraph<'a> {
    /// # Errors
    ///
    /// Returns [`FolioError::Layout`] if an edge names a node that is not in
    /// the graph. Validated graphs never do.
    pub fn new(diagram: &'a DiagramGraph, sizer: &NodeSizer) -> Result<Self, FolioError> {
        let node_count = diagram.nodes.len();
        let mut outgoing = vec![Vec::new(); node_count];
        let mut incoming = vec![Vec::new(); node_count];
        let mut endpoints = Vec::with_capacity(diagram.edges.len());

        for (index, edge) in diagram.edges.iter().enumerate() {
            let lookup = |id: &str| {
                diagram.node_index(id).ok_or_else(|| {
                    FolioError::Layout(format!("edge {index} refers to unknown node `{id}`"))
                })
            };
            let source = lookup(edge.source.as_str())?;
            let target = lookup(edge.target.as_str())?;
            outgoing[source].push(index);
            incoming[target].push(index);
            endpoints.push((source, target));
        }

        let sizes = diagram.nodes.values().map(|node| sizer.size(node)).collect();
        let cluster_paths = diagram
            .nodes
            .values()
            .map(|node| {
                node.cluster
                    .map(|cluster| diagram.cluster_path(cluster))
                    .unwrap_or_default()
            })
            .collect();

        Ok(Self {
            diagram,
            sizes,
            endpoints,
            outgoing,
            incoming,
            cluster_paths,
        })
    }

    pub fn diagram(&self) -> &'a DiagramGraph {
        self.diagram
    }

    pub fn node_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn size(&self, node: usize) -> Size {
        self.sizes[node]
    }

    pub fn endpoints(&self, edge: usize) -> (usize, usize) {
        self.endpoints[edge]
    }

    pub fn is_self_loop(&self, edge: usize) -> bool {
        let (source, target) = self.endpoints[edge];
        source == target
    }

    /// Edges leaving `node`, in declaration order.
    pub fn outgoing(&self, node: usize) -> &[usize] {
        &self.outgoing[node]
    }

    /// Edges entering `node`, in declaration order.
    pub fn incoming(&self, node: usize) -> &[usize] {
        &self.incoming[node]
    }

    /// Nodes adjacent to `node` ignoring edge direction, without self-loops.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        let out = self.outgoing[node].iter().map(|&e| self.endpoints[e].1);
        let inc = self.incoming[node].iter().map(|&e| self.endpoints[e].0);
        out.chain(inc).filter(move |&other| other != node)
    }

    pub fn cluster_path(&self, node: usize) -> &[usize] {
        &self.cluster_paths[node]
    }

    /// Largest node extent on either axis.
    pub fn max_extent(&self) -> f32 {
        self.sizes
            .iter()
            .map(|size| size.width().max(size.height()))
            .fold(0.0, f32::max)
    }

    /// Connected components ignoring direction. Components are ordered by
    /// their first node, and nodes keep declaration order within each.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut sets = UnionFind::<usize>::new(self.node_count());
        for &(source, target) in &self.endpoints {
            sets.union(source, target);
        }

        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut slot_of_root: Vec<Option<usize>> = vec![None; self.node_count()];
        for node in 0..self.node_count() {
            let root = sets.find(node);
            match slot_of_root[root] {
                Some(slot) => components[slot].push(node),
                None => {
                    slot_of_root[root] = Some(components.len());
                    components.push(vec![node]);
                }
            }
        }
        components
    }
}
