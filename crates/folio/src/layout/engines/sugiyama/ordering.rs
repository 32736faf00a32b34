//! Within-layer ordering and crossing reduction.
//!
//! This is the barycenter heuristic: each node moves to the mean position of
//! its neighbors in the adjacent layer. It does not find a minimum-crossing
//! order. Members of a cluster are kept next to each other in every layer,
//! recursively for nested clusters.

use log::trace;

use super::Layering;

/// Order each layer, then reduce crossings with at most `max_passes`
/// barycenter passes.
///
/// Returns the number of passes run and the crossings left.
pub fn order_layers(layering: &mut Layering, max_passes: usize) -> (usize, usize) {
    seed(layering);
    if layering.segments.is_empty() {
        return (0, 0);
    }

    let mut best = layering.layers.clone();
    let mut best_crossings = count_crossings(layering);
    let mut passes = 0;

    while passes < max_passes && best_crossings > 0 {
        sweep_down(layering);
        sweep_up(layering);
        passes += 1;

        let crossings = count_crossings(layering);
        trace!(pass = passes, crossings; "Barycenter pass");
        if crossings >= best_crossings {
            break;
        }
        best = layering.layers.clone();
        best_crossings = crossings;
    }

    layering.layers = best;
    layering.update_positions();
    (passes, best_crossings)
}

/// Initial order from a depth-first walk down the layers, starting at each
/// unvisited node in layer order. Every layer is sorted by discovery time.
fn seed(layering: &mut Layering) {
    let mut discovered = vec![usize::MAX; layering.nodes.len()];
    let mut next = 0;
    let roots: Vec<usize> = layering.layers.iter().flatten().copied().collect();
    for root in roots {
        if discovered[root] != usize::MAX {
            continue;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if discovered[node] != usize::MAX {
                continue;
            }
            discovered[node] = next;
            next += 1;
            stack.extend(
                layering.lower[node]
                    .iter()
                    .rev()
                    .filter(|&&n| discovered[n] == usize::MAX),
            );
        }
    }

    for layer in &mut layering.layers {
        layer.sort_by_key(|&node| discovered[node]);
    }
    layering.update_positions();

    // Group cluster members without otherwise changing the order.
    for rank in 0..layering.layers.len() {
        let position = layering.position.clone();
        arrange(layering, rank, |node| position[node] as f64);
    }
}

fn sweep_down(layering: &mut Layering) {
    for rank in 1..layering.layers.len() {
        let keys = barycenters(layering, rank, true);
        arrange(layering, rank, |node| keys[node]);
    }
}

fn sweep_up(layering: &mut Layering) {
    for rank in (0..layering.layers.len().saturating_sub(1)).rev() {
        let keys = barycenters(layering, rank, false);
        arrange(layering, rank, |node| keys[node]);
    }
}

/// Mean neighbor position for every node in `rank`, indexed by layer node.
/// A node without neighbors on that side keeps its current position.
fn barycenters(layering: &Layering, rank: usize, from_above: bool) -> Vec<f64> {
    let mut keys = vec![0.0; layering.nodes.len()];
    for &node in &layering.layers[rank] {
        let neighbors = if from_above {
            &layering.upper[node]
        } else {
            &layering.lower[node]
        };
        keys[node] = if neighbors.is_empty() {
            layering.position[node] as f64
        } else {
            neighbors.iter().map(|&n| layering.position[n] as f64).sum::<f64>()
                / neighbors.len() as f64
        };
    }
    keys
}

/// Stable sort of one layer by `key`, keeping cluster members together.
fn arrange(layering: &mut Layering, rank: usize, key: impl Fn(usize) -> f64) {
    let items = layering.layers[rank].clone();
    layering.layers[rank] = arrange_group(layering, &items, 0, &key);
    layering.update_positions();
}

fn arrange_group(
    layering: &Layering,
    items: &[usize],
    depth: usize,
    key: &dyn Fn(usize) -> f64,
) -> Vec<usize> {
    let mut groups: Vec<(Option<usize>, Vec<usize>)> = Vec::new();
    for &item in items {
        match layering.nodes[item].cluster_path.get(depth).copied() {
            Some(cluster) => match groups.iter_mut().find(|(c, _)| *c == Some(cluster)) {
                Some((_, members)) => members.push(item),
                None => groups.push((Some(cluster), vec![item])),
            },
            None => groups.push((None, vec![item])),
        }
    }

    let mut keyed: Vec<(f64, Vec<usize>)> = groups
        .into_iter()
        .map(|(cluster, members)| {
            let mean = members.iter().map(|&m| key(m)).sum::<f64>() / members.len() as f64;
            let ordered = match cluster {
                Some(_) => arrange_group(layering, &members, depth + 1, key),
                None => members,
            };
            (mean, ordered)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().flat_map(|(_, members)| members).collect()
}

/// Crossings between segments of adjacent layers.
pub fn count_crossings(layering: &Layering) -> usize {
    let mut by_rank: Vec<Vec<(usize, usize)>> = vec![Vec::new(); layering.layers.len()];
    for &(upper, lower) in &layering.segments {
        let rank = layering.nodes[upper].rank;
        by_rank[rank].push((layering.position[upper], layering.position[lower]));
    }

    by_rank
        .iter()
        .map(|pairs| {
            let mut crossings = 0;
            for (i, &(a_top, a_bottom)) in pairs.iter().enumerate() {
                for &(b_top, b_bottom) in &pairs[i + 1..] {
                    if (a_top < b_top && a_bottom > b_bottom) || (a_top > b_top && a_bottom < b_bottom)
                    {
                        crossings += 1;
                    }
                }
            }
            crossings
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::engines::sugiyama::LayerNode;
    use folio_core::geometry::Size;

    fn layering(layers: Vec<Vec<usize>>, segments: Vec<(usize, usize)>, clusters: &[(usize, Vec<usize>)]) -> Layering {
        let count = layers.iter().map(Vec::len).sum();
        let mut nodes: Vec<LayerNode> = (0..count)
            .map(|i| LayerNode {
                node: Some(i),
                rank: 0,
                cluster_path: Vec::new(),
                size: Size::default(),
            })
            .collect();
        for (rank, layer) in layers.iter().enumerate() {
            for &node in layer {
                nodes[node].rank = rank;
            }
        }
        for (node, path) in clusters {
            nodes[*node].cluster_path = path.clone();
        }
        Layering::new(nodes, layers, segments)
    }

    #[test]
    fn test_crossing_is_removed() {
        // 0 -> 3 and 1 -> 2 cross when layer 1 is [2, 3].
        let mut layering = layering(vec![vec![0, 1], vec![2, 3]], vec![(0, 3), (1, 2)], &[]);
        let (passes, crossings) = order_layers(&mut layering, 8);
        assert_eq!(crossings, 0);
        assert!(passes <= 1);
        assert_eq!(layering.layers[1], vec![3, 2]);
    }

    #[test]
    fn test_no_segments_means_no_passes() {
        let mut layering = layering(vec![vec![0, 1, 2]], Vec::new(), &[]);
        assert_eq!(order_layers(&mut layering, 8), (0, 0));
    }

    #[test]
    fn test_cluster_members_stay_adjacent() {
        let mut layering = layering(
            vec![vec![0, 1, 2]],
            Vec::new(),
            &[(0, vec![0]), (2, vec![0])],
        );
        order_layers(&mut layering, 8);
        let layer = &layering.layers[0];
        let first = layer.iter().position(|&n| n == 0);
        let third = layer.iter().position(|&n| n == 2);
        assert_eq!(first.zip(third).map(|(a, b)| a.abs_diff(b)), Some(1));
    }

    #[test]
    fn test_seed_follows_depth_first_walk() {
        // 0 -> 3 -> 5 and 1 -> 2 -> 4: each chain lands in one column.
        let mut layering = layering(
            vec![vec![0, 1], vec![2, 3], vec![4, 5]],
            vec![(0, 3), (1, 2), (3, 5), (2, 4)],
            &[],
        );
        let (passes, crossings) = order_layers(&mut layering, 8);
        assert_eq!((passes, crossings), (0, 0));
        assert_eq!(layering.layers[1], vec![3, 2]);
        assert_eq!(layering.layers[2], vec![5, 4]);
    }

    #[test]
    fn test_count_crossings() {
        let layering = layering(
            vec![vec![0, 1, 2], vec![3, 4, 5]],
            vec![(0, 5), (1, 4), (2, 3)],
            &[],
        );
        assert_eq!(count_crossings(&layering), 3);
    }
}
