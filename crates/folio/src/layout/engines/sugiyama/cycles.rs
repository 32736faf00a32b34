//! Cycle breaking by depth-first search.

use crate::structure::LayoutGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Mark the edges that close a cycle.
///
/// Undirected edges take part as declared, source to target. The search
/// starts from nodes in declaration order and follows edges in declaration
/// order, so the same graph always reverses the same edges. Self-loops are
/// never reversed; ranking ignores them.
pub fn break_cycles(graph: &LayoutGraph<'_>) -> Vec<bool> {
    back_edges(
        graph.node_count(),
        graph.edge_count(),
        move |node| graph.outgoing(node),
        move |edge| graph.endpoints(edge).1,
    )
}

/// Depth-first back edges of any graph given by its outgoing edge lists.
/// Reversing the marked edges leaves a DAG.
pub fn back_edges<'s>(
    node_count: usize,
    edge_count: usize,
    outgoing: impl Fn(usize) -> &'s [usize],
    target_of: impl Fn(usize) -> usize,
) -> Vec<bool> {
    let mut reversed = vec![false; edge_count];
    let mut state = vec![Visit::New; node_count];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..node_count {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        stack.push((root, 0));

        while let Some(&(node, next)) = stack.last() {
            let Some(&edge) = outgoing(node).get(next) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let target = target_of(edge);
            if target == node {
                continue;
            }
            match state[target] {
                Visit::New => {
                    state[target] = Visit::Active;
                    stack.push((target, 0));
                }
                Visit::Active => reversed[edge] = true,
                Visit::Done => {}
            }
        }
    }
    reversed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::engines::test_support::{diagram, layout_graph};

    #[test]
    fn test_three_cycle_reverses_one_edge() {
        let diagram = diagram(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let graph = layout_graph(&diagram);
        assert_eq!(break_cycles(&graph), vec![false, false, true]);
    }

    #[test]
    fn test_dag_is_untouched() {
        let diagram = diagram(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
        );
        let graph = layout_graph(&diagram);
        assert!(break_cycles(&graph).iter().all(|r| !r));
    }

    #[test]
    fn test_self_loop_and_two_cycle() {
        let diagram = diagram(&["A", "B"], &[("A", "A"), ("A", "B"), ("B", "A")]);
        let graph = layout_graph(&diagram);
        assert_eq!(break_cycles(&graph), vec![false, false, true]);
    }
}
