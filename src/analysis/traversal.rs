//! Depth-first visitation orders.
//!
//! This module provides the postorder and reverse-postorder traversals the
//! dominator fixpoint and the optimizer iterate in. Successors are visited
//! in their natural order (`next1` before `next2`); nodes unreachable from
//! the start are absent from the result.

use crate::analysis::Successors;
use crate::ir::BlockId;

/// Computes the postorder traversal of nodes reachable from `start`.
///
/// In postorder, a node is visited after all its descendants have been
/// visited; the start node is last. The traversal is iterative (explicit
/// enter/exit stack), so deep graphs do not overflow the call stack.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node for traversal
///
/// # Returns
///
/// A vector of node identifiers in postorder; a node's position in the
/// vector is its postorder number.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
pub fn postorder<G: Successors>(graph: &G, start: BlockId) -> Vec<BlockId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;

                // Exit state is processed after all children
                stack.push((node, State::Exit));

                // Push children in reverse order so they're visited in order
                let successors: Vec<BlockId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => {
                result.push(node);
            }
        }
    }

    result
}

/// Computes the reverse postorder traversal of nodes reachable from `start`.
///
/// Reverse postorder (RPO) visits a node before any of its successors (in a
/// DAG), which is the preferred iteration order for forward analyses and
/// for the optimizer passes.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node for traversal
///
/// # Returns
///
/// A vector of node identifiers in reverse postorder, the start node first.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
pub fn reverse_postorder<G: Successors>(graph: &G, start: BlockId) -> Vec<BlockId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}
