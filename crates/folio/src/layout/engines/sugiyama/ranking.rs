//! Longest-path rank assignment and cluster band checks.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::cycles::back_edges;
use crate::structure::LayoutGraph;

/// Ranking edges leaving `node`: declared edges that were not reversed plus
/// reversed edges that enter it. Self-loops are skipped.
pub fn ranked_successors<'g>(
    graph: &'g LayoutGraph<'_>,
    reversed: &'g [bool],
    node: usize,
) -> impl Iterator<Item = usize> + 'g {
    let forward = graph
        .outgoing(node)
        .iter()
        .filter(move |&&edge| !reversed[edge])
        .map(move |&edge| graph.endpoints(edge).1);
    let backward = graph
        .incoming(node)
        .iter()
        .filter(move |&&edge| reversed[edge])
        .map(move |&edge| graph.endpoints(edge).0);
    forward.chain(backward).filter(move |&other| other != node)
}

/// Rank of each node: the length of the longest path reaching it.
pub fn assign_ranks(graph: &LayoutGraph<'_>, reversed: &[bool]) -> Vec<usize> {
    let node_count = graph.node_count();
    let mut in_degree = vec![0usize; node_count];
    for node in 0..node_count {
        for successor in ranked_successors(graph, reversed, node) {
            in_degree[successor] += 1;
        }
    }

    let mut ranks = vec![0usize; node_count];
    let mut ready: VecDeque<usize> = (0..node_count).filter(|&n| in_degree[n] == 0).collect();
    while let Some(node) = ready.pop_front() {
        let successors: Vec<usize> = ranked_successors(graph, reversed, node).collect();
        for successor in successors {
            ranks[successor] = ranks[successor].max(ranks[node] + 1);
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                ready.push_back(successor);
            }
        }
    }
    ranks
}

/// Clusters whose members leave a rank empty between their lowest and
/// highest rank. Members of nested clusters count for every ancestor.
pub fn disjoint_clusters(graph: &LayoutGraph<'_>, ranks: &[usize]) -> Vec<usize> {
    let cluster_count = graph.diagram().clusters.len();
    let mut member_ranks: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); cluster_count];
    for (node, &rank) in ranks.iter().enumerate() {
        for &cluster in graph.cluster_path(node) {
            member_ranks[cluster].insert(rank);
        }
    }

    member_ranks
        .iter()
        .enumerate()
        .filter(|(_, ranks)| match (ranks.first(), ranks.last()) {
            (Some(&low), Some(&high)) => high - low + 1 != ranks.len(),
            _ => false,
        })
        .map(|(cluster, _)| cluster)
        .collect()
}

/// Ranks that hold every cluster in `disjoint` (and any cluster that
/// becomes disjoint on the way) on one contiguous band of ranks.
///
/// Returns the ranks with the edges that now point up. Every edge other
/// than a self-loop joins two different ranks.
pub fn band_clusters(graph: &LayoutGraph<'_>, disjoint: &[usize]) -> (Vec<usize>, Vec<bool>) {
    let mut banded = vec![false; graph.diagram().clusters.len()];
    for &cluster in disjoint {
        banded[cluster] = true;
    }
    let scope: Vec<usize> = (0..graph.node_count()).collect();
    let mut ranks = vec![0; graph.node_count()];

    // Each round bands at least one more cluster, so this ends.
    loop {
        rank_scope(graph, &banded, &scope, 0, &mut ranks);
        let spread: Vec<usize> = disjoint_clusters(graph, &ranks)
            .into_iter()
            .filter(|&cluster| !banded[cluster])
            .collect();
        if spread.is_empty() {
            break;
        }
        for cluster in spread {
            banded[cluster] = true;
        }
    }

    let reversed = (0..graph.edge_count())
        .map(|edge| {
            let (source, target) = graph.endpoints(edge);
            ranks[source] > ranks[target]
        })
        .collect();
    (ranks, reversed)
}

/// An edge between two ranking units of one scope.
struct Link {
    from: usize,
    to: usize,
    source: usize,
    target: usize,
}

/// Rank the nodes of `scope`, which share the first `depth` clusters of
/// their paths, into dense ranks from 0.
///
/// The outermost banded cluster below `depth` is ranked on its own and then
/// moves as one unit whose members keep their inner offsets.
fn rank_scope(
    graph: &LayoutGraph<'_>,
    banded: &[bool],
    scope: &[usize],
    depth: usize,
    ranks: &mut [usize],
) {
    let mut unit_of: BTreeMap<usize, usize> = BTreeMap::new();
    let mut units: Vec<(Vec<usize>, Option<usize>)> = Vec::new();
    let mut cluster_units: BTreeMap<usize, usize> = BTreeMap::new();
    for &node in scope {
        let band = graph
            .cluster_path(node)
            .iter()
            .enumerate()
            .skip(depth)
            .find(|&(_, &cluster)| banded[cluster]);
        let unit = match band {
            Some((level, &cluster)) => *cluster_units.entry(cluster).or_insert_with(|| {
                units.push((Vec::new(), Some(level + 1)));
                units.len() - 1
            }),
            None => {
                units.push((Vec::new(), None));
                units.len() - 1
            }
        };
        units[unit].0.push(node);
        unit_of.insert(node, unit);
    }

    for (members, inner) in &units {
        match inner {
            Some(inner) => rank_scope(graph, banded, members, *inner, ranks),
            None => {
                for &node in members {
                    ranks[node] = 0;
                }
            }
        }
    }

    let links: Vec<Link> = (0..graph.edge_count())
        .filter_map(|edge| {
            let (source, target) = graph.endpoints(edge);
            let (&from, &to) = (unit_of.get(&source)?, unit_of.get(&target)?);
            (from != to).then_some(Link {
                from,
                to,
                source,
                target,
            })
        })
        .collect();
    let mut outgoing = vec![Vec::new(); units.len()];
    for (index, link) in links.iter().enumerate() {
        outgoing[link.from].push(index);
    }
    let up = back_edges(
        units.len(),
        links.len(),
        |unit| outgoing[unit].as_slice(),
        |index| links[index].to,
    );

    // rank(lower) >= rank(upper) + 1, rewritten between unit ranks.
    let offset = |node: usize| ranks[node] as i64;
    let mut below: Vec<Vec<(usize, i64)>> = vec![Vec::new(); units.len()];
    let mut in_degree = vec![0usize; units.len()];
    for (link, &up) in links.iter().zip(&up) {
        let (upper, lower, upper_node, lower_node) = if up {
            (link.to, link.from, link.target, link.source)
        } else {
            (link.from, link.to, link.source, link.target)
        };
        below[upper].push((lower, offset(upper_node) - offset(lower_node) + 1));
        in_degree[lower] += 1;
    }

    let mut unit_ranks = vec![0i64; units.len()];
    let mut ready: VecDeque<usize> = (0..units.len()).filter(|&u| in_degree[u] == 0).collect();
    while let Some(unit) = ready.pop_front() {
        for &(lower, weight) in &below[unit] {
            unit_ranks[lower] = unit_ranks[lower].max(unit_ranks[unit] + weight);
            in_degree[lower] -= 1;
            if in_degree[lower] == 0 {
                ready.push_back(lower);
            }
        }
    }

    let absolute: Vec<(usize, i64)> = scope
        .iter()
        .map(|&node| (node, unit_ranks[unit_of[&node]] + offset(node)))
        .collect();
    let dense: BTreeMap<i64, usize> = absolute
        .iter()
        .map(|&(_, rank)| rank)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(index, rank)| (rank, index))
        .collect();
    for (node, rank) in absolute {
        ranks[node] = dense[&rank];
    }
}
