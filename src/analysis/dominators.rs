//! Dominator tree computation via the iterative reverse-postorder fixpoint.
//!
//! # Theory
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to
//! `n` must pass through `d`. The **immediate dominator** of `n` is the
//! unique node that strictly dominates `n` but does not strictly dominate
//! any other strict dominator of `n`. Making each node a child of its
//! immediate dominator yields the dominator tree, rooted at the entry.
//!
//! # Algorithm
//!
//! This implementation uses the iterative data-flow scheme with two-finger
//! intersection (Cooper/Harvey/Kennedy):
//!
//! 1. Number all reachable nodes in postorder (`next1` subtree before
//!    `next2` subtree); unreachable nodes get no number and are ignored.
//! 2. Seed the entry's immediate dominator with itself.
//! 3. Sweep the nodes in reverse postorder until a full pass changes
//!    nothing: each node's new immediate dominator is the intersection of
//!    its already-processed predecessors, where `intersect` walks two
//!    fingers up the current dominator chains, always advancing the finger
//!    with the smaller postorder number, until they meet.
//!
//! The fixpoint terminates because an update can only move a node's
//! dominator upwards in the postorder lattice; the worst case is
//! O(N · E · depth), effectively linear on reducible control flow.

use std::fmt;

use crate::analysis::{postorder, RootedGraph};
use crate::ir::BlockId;

/// Postorder number assigned to nodes the DFS never reaches.
const UNREACHABLE: usize = usize::MAX;

/// Computes the immediate-dominator mapping for a rooted graph.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
///
/// # Returns
///
/// A vector indexed by node: the entry maps to itself (the sentinel of the
/// fixpoint), every other reachable node maps to its immediate dominator,
/// and unreachable nodes map to `None`. An empty graph yields an empty
/// vector.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::analysis::compute_immediate_dominators;
/// use tinyssa::ir::{BlockId, Graph};
///
/// // 0 -> 1 -> 2
/// let mut graph = Graph::new(3, vec![]);
/// graph.add_successor_true(BlockId::new(0), BlockId::new(1));
/// graph.add_successor_true(BlockId::new(1), BlockId::new(2));
///
/// let idoms = compute_immediate_dominators(&graph);
/// assert_eq!(idoms[0], Some(BlockId::new(0))); // entry: sentinel
/// assert_eq!(idoms[2], Some(BlockId::new(1)));
/// ```
#[must_use]
pub fn compute_immediate_dominators<G: RootedGraph>(graph: &G) -> Vec<Option<BlockId>> {
    let node_count = graph.node_count();
    if node_count == 0 {
        return Vec::new();
    }

    let entry = graph.entry();
    let post = postorder(graph, entry);

    let mut po_num = vec![UNREACHABLE; node_count];
    for (number, node) in post.iter().enumerate() {
        po_num[node.index()] = number;
    }

    let mut idom: Vec<Option<BlockId>> = vec![None; node_count];
    idom[entry.index()] = Some(entry);

    let mut changed = true;
    while changed {
        changed = false;
        // Reverse postorder, entry first (and skipped)
        for &node in post.iter().rev() {
            if node == entry {
                continue;
            }

            // First predecessor that has been processed already; the
            // predecessor itself, not its idom, as it may be the idom.
            let mut new_idom: Option<BlockId> = None;
            for pred in graph.predecessors(node) {
                if idom[pred.index()].is_some() {
                    new_idom = Some(pred);
                    break;
                }
            }

            if let Some(mut candidate) = new_idom {
                for pred in graph.predecessors(node) {
                    if pred != candidate && idom[pred.index()].is_some() {
                        candidate = intersect(pred, candidate, &idom, &po_num);
                    }
                }
                if idom[node.index()] != Some(candidate) {
                    idom[node.index()] = Some(candidate);
                    changed = true;
                }
            }
        }
    }

    idom
}

/// Walks two fingers up the dominator chains until they meet.
///
/// The finger with the smaller postorder number is deeper in the graph and
/// is the one advanced.
fn intersect(
    a: BlockId,
    b: BlockId,
    idom: &[Option<BlockId>],
    po_num: &[usize],
) -> BlockId {
    let mut finger1 = a;
    let mut finger2 = b;

    while finger1 != finger2 {
        while po_num[finger1.index()] < po_num[finger2.index()] {
            match idom[finger1.index()] {
                Some(up) => finger1 = up,
                None => return finger2,
            }
        }
        while po_num[finger2.index()] < po_num[finger1.index()] {
            match idom[finger2.index()] {
                Some(up) => finger2 = up,
                None => return finger1,
            }
        }
    }

    finger1
}

/// The dominator tree of a graph.
///
/// Each node's parent is its immediate dominator; the entry is the root and
/// has no parent. Unreachable nodes keep no parent and are not part of the
/// tree proper.
///
/// Two trees are equal iff they have the same number of nodes and agree on
/// every node's parent; children need not be compared since they are
/// derived from the parents.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::analysis::DominatorTree;
/// use tinyssa::ir::{BlockId, Graph};
///
/// let mut graph = Graph::new(3, vec![]);
/// graph.add_successor_true(BlockId::new(0), BlockId::new(1));
/// graph.add_successor_true(BlockId::new(1), BlockId::new(2));
///
/// let tree = DominatorTree::of(&graph);
/// assert_eq!(tree.root(), Some(BlockId::new(0)));
/// assert!(tree.dominates(BlockId::new(0), BlockId::new(2)));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The root of the tree; `None` for an empty graph.
    entry: Option<BlockId>,
    /// Parent of each node; `None` for the root and for unreachable nodes.
    parents: Vec<Option<BlockId>>,
    /// Children of each node, ascending by index.
    children: Vec<Vec<BlockId>>,
}

impl DominatorTree {
    /// Builds the dominator tree of a rooted graph.
    ///
    /// An empty graph yields an empty tree.
    #[must_use]
    pub fn of<G: RootedGraph>(graph: &G) -> Self {
        if graph.node_count() == 0 {
            return Self {
                entry: None,
                parents: Vec::new(),
                children: Vec::new(),
            };
        }

        let entry = graph.entry();
        let idoms = compute_immediate_dominators(graph);
        let parents = idoms
            .iter()
            .enumerate()
            .map(|(index, idom)| match idom {
                // The entry's sentinel (itself) becomes "no parent"
                Some(parent) if parent.index() != index => Some(*parent),
                _ => None,
            })
            .collect();

        Self::from_parents(entry, parents)
    }

    /// Builds a tree from an explicit parent mapping.
    ///
    /// `parents[i]` is the immediate dominator of node `i`, with `None` for
    /// the entry and for unreachable nodes. This is the constructor used to
    /// hand-build expected trees in tests; children are derived.
    #[must_use]
    pub fn from_parents(entry: BlockId, parents: Vec<Option<BlockId>>) -> Self {
        let mut children = vec![Vec::new(); parents.len()];
        for (index, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[parent.index()].push(BlockId::new(index));
            }
        }
        Self {
            entry: Some(entry),
            parents,
            children,
        }
    }

    /// Returns the root of the tree, `None` for an empty graph.
    #[must_use]
    #[inline]
    pub const fn root(&self) -> Option<BlockId> {
        self.entry
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    #[inline]
    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    /// Returns the parent (immediate dominator) of a node.
    ///
    /// The root and unreachable nodes have no parent.
    ///
    /// # Panics
    ///
    /// Panics if the node index is out of bounds.
    #[must_use]
    #[inline]
    pub fn parent(&self, node: BlockId) -> Option<BlockId> {
        self.parents[node.index()]
    }

    /// Returns the children of a node, ascending by index.
    ///
    /// # Panics
    ///
    /// Panics if the node index is out of bounds.
    #[must_use]
    #[inline]
    pub fn children(&self, node: BlockId) -> &[BlockId] {
        &self.children[node.index()]
    }

    /// Returns `true` if the node is the root or has a parent.
    #[must_use]
    pub fn is_reachable(&self, node: BlockId) -> bool {
        self.entry == Some(node) || self.parents[node.index()].is_some()
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself; the root dominates all reachable nodes.
    ///
    /// # Complexity
    ///
    /// O(depth) where depth is the depth of `b` in the tree.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        while let Some(parent) = self.parents[current.index()] {
            if parent == a {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Checks if node `a` strictly dominates node `b` (dominates and differs).
    #[must_use]
    #[inline]
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Returns the depth of a node in the tree; the root has depth 0.
    #[must_use]
    pub fn depth(&self, node: BlockId) -> usize {
        let mut depth = 0;
        let mut current = node;
        while let Some(parent) = self.parents[current.index()] {
            current = parent;
            depth += 1;
        }
        depth
    }

    /// Returns an iterator over the dominators of a node, from the node
    /// itself up to (and including) the root.
    pub fn dominators(&self, node: BlockId) -> DominatorChainIter<'_> {
        DominatorChainIter {
            tree: self,
            current: Some(node),
        }
    }
}

impl PartialEq for DominatorTree {
    /// Node count and per-node parents must agree; children are derived
    /// from the parents and need no comparison of their own.
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry && self.parents == other.parents
    }
}

impl Eq for DominatorTree {}

impl fmt::Display for DominatorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, parent) in self.parents.iter().enumerate() {
            match parent {
                Some(parent) => writeln!(f, "b{index} <- {parent}")?,
                None if self.entry == Some(BlockId::new(index)) => {
                    writeln!(f, "b{index} <- (root)")?;
                }
                None => writeln!(f, "b{index} <- (unreachable)")?,
            }
        }
        Ok(())
    }
}

/// Iterator over the dominator chain of a node, from the node up to the root.
pub struct DominatorChainIter<'t> {
    tree: &'t DominatorTree,
    current: Option<BlockId>,
}

impl Iterator for DominatorChainIter<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::testgraph::TestGraph;

    use super::*;

    fn b(index: usize) -> BlockId {
        BlockId::new(index)
    }

    #[test]
    fn test_empty_graph() {
        let graph = TestGraph::new(0, &[]);
        assert!(compute_immediate_dominators(&graph).is_empty());

        let tree = DominatorTree::of(&graph);
        assert_eq!(tree.root(), None);
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_single_node() {
        let graph = TestGraph::new(1, &[]);
        let idoms = compute_immediate_dominators(&graph);
        assert_eq!(idoms, vec![Some(b(0))]);

        let tree = DominatorTree::of(&graph);
        assert_eq!(tree.root(), Some(b(0)));
        assert_eq!(tree.parent(b(0)), None);
        assert_eq!(tree.depth(b(0)), 0);
    }

    #[test]
    fn test_linear_chain() {
        // 0 -> 1 -> 2 -> 3
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 3)]);
        let tree = DominatorTree::of(&graph);

        assert_eq!(tree.parent(b(1)), Some(b(0)));
        assert_eq!(tree.parent(b(2)), Some(b(1)));
        assert_eq!(tree.parent(b(3)), Some(b(2)));

        assert!(tree.dominates(b(0), b(3)));
        assert!(tree.dominates(b(1), b(3)));
        assert!(!tree.dominates(b(3), b(1)));
        assert!(!tree.strictly_dominates(b(2), b(2)));

        assert_eq!(tree.depth(b(3)), 3);
        let chain: Vec<BlockId> = tree.dominators(b(3)).collect();
        assert_eq!(chain, vec![b(3), b(2), b(1), b(0)]);
    }

    #[test]
    fn test_diamond() {
        //   0
        //  / \
        // 1   2
        //  \ /
        //   3
        let graph = TestGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let tree = DominatorTree::of(&graph);

        assert_eq!(tree.parent(b(1)), Some(b(0)));
        assert_eq!(tree.parent(b(2)), Some(b(0)));
        // Join point: neither branch dominates it
        assert_eq!(tree.parent(b(3)), Some(b(0)));
        assert!(!tree.strictly_dominates(b(1), b(3)));
        assert!(!tree.strictly_dominates(b(2), b(3)));

        assert_eq!(tree.children(b(0)), &[b(1), b(2), b(3)]);
    }

    #[test]
    fn test_loop_back_edge() {
        // 0 -> 1 -> 2 -> 1, 2 -> 3
        let graph = TestGraph::new(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        let tree = DominatorTree::of(&graph);

        assert_eq!(tree.parent(b(1)), Some(b(0)));
        assert_eq!(tree.parent(b(2)), Some(b(1)));
        assert_eq!(tree.parent(b(3)), Some(b(2)));
        // The back edge does not let the body dominate the header
        assert!(!tree.strictly_dominates(b(2), b(1)));
    }

    #[test]
    fn test_unreachable_nodes_ignored() {
        // Node 2 has no incoming path from the entry
        let graph = TestGraph::new(3, &[(0, 1), (2, 1)]);
        let idoms = compute_immediate_dominators(&graph);

        assert_eq!(idoms[0], Some(b(0)));
        assert_eq!(idoms[1], Some(b(0)));
        assert_eq!(idoms[2], None);

        let tree = DominatorTree::of(&graph);
        assert!(tree.is_reachable(b(1)));
        assert!(!tree.is_reachable(b(2)));
        assert!(!tree.dominates(b(0), b(2)));
    }

    #[test]
    fn test_idempotence() {
        let graph = TestGraph::new(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 1), (3, 4)]);
        let first = DominatorTree::of(&graph);
        let second = DominatorTree::of(&graph);
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_parents_matches_computed() {
        let graph = TestGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let computed = DominatorTree::of(&graph);
        let expected = DominatorTree::from_parents(
            b(0),
            vec![None, Some(b(0)), Some(b(0)), Some(b(0))],
        );
        assert_eq!(computed, expected);
    }

    #[test]
    fn test_inequality_on_different_parent() {
        let left = DominatorTree::from_parents(b(0), vec![None, Some(b(0)), Some(b(1))]);
        let right = DominatorTree::from_parents(b(0), vec![None, Some(b(0)), Some(b(0))]);
        assert_ne!(left, right);
    }
}
