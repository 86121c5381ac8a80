//! Control-flow analyses: traversal orders, dominators and loops.
//!
//! # Architecture
//!
//! The algorithms in this module are written against a small trait
//! hierarchy rather than against [`crate::ir::Graph`] directly, so they can
//! be exercised on any block graph (including the minimal stand-ins the
//! unit tests build):
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - forward edge traversal (`next1` before `next2`)
//! - [`Predecessors`] - backward edge traversal
//! - [`RootedGraph`] - graphs with a designated entry node
//!
//! # Key Components
//!
//! - [`postorder`] / [`reverse_postorder`] - depth-first visitation orders
//! - [`compute_immediate_dominators`] / [`DominatorTree`] - the iterative
//!   reverse-postorder dominator fixpoint and the tree built from it
//! - [`LoopAnalysis`] / [`Loop`] - natural-loop detection and the loop tree
//!   rooted at a synthetic root loop
//!
//! All analyses borrow the graph immutably and produce artifacts that stay
//! valid only as long as the graph is not mutated afterwards. Empty graphs
//! yield empty artifacts; unreachable blocks get no immediate dominator and
//! belong to no loop.

mod dominators;
mod loops;
mod traversal;

pub use dominators::{compute_immediate_dominators, DominatorChainIter, DominatorTree};
pub use loops::{Loop, LoopAnalysis};
pub use traversal::{postorder, reverse_postorder};

use crate::ir::{BlockId, Graph};

/// Base trait providing core graph properties.
///
/// # Required Methods
///
/// - [`node_count`](GraphBase::node_count) - Returns the total number of nodes
/// - [`node_ids`](GraphBase::node_ids) - Returns an iterator over all node IDs
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers in the graph.
    ///
    /// The iteration order is ascending by index.
    fn node_ids(&self) -> impl Iterator<Item = BlockId>;
}

/// Trait for graphs that support forward edge traversal.
///
/// For a control-flow graph the successor order is significant and must be
/// `next1` (fall-through / true) before `next2` (alternative); the
/// traversal orders and the dominator fixpoint depend on it.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successor nodes of the given node.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId>;
}

/// Trait for graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessor nodes of the given node.
    ///
    /// One occurrence is yielded per incoming edge, so a double edge
    /// contributes its source twice.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId>;
}

/// Trait for graphs with a designated entry (root) node.
///
/// The entry is the starting point for traversals and the root of the
/// dominator tree. The returned identifier is only meaningful when the
/// graph is non-empty; algorithms check [`GraphBase::node_count`] first.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry (root) node of the graph.
    fn entry(&self) -> BlockId;
}

impl GraphBase for Graph {
    fn node_count(&self) -> usize {
        self.block_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.block_count()).map(BlockId::new)
    }
}

impl Successors for Graph {
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        let block = self.block(node);
        [block.next1(), block.next2()].into_iter().flatten()
    }
}

impl Predecessors for Graph {
    fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        self.block(node).preds().iter().copied()
    }
}

impl RootedGraph for Graph {
    fn entry(&self) -> BlockId {
        Graph::entry(self)
    }
}

#[cfg(test)]
pub(crate) mod testgraph {
    //! A minimal adjacency-list graph for exercising the analyses without
    //! building full IR.

    use super::*;

    pub(crate) struct TestGraph {
        node_count: usize,
        edges: Vec<(BlockId, BlockId)>,
        entry: BlockId,
    }

    impl TestGraph {
        pub(crate) fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
            TestGraph {
                node_count,
                edges: edges
                    .iter()
                    .map(|&(a, b)| (BlockId::new(a), BlockId::new(b)))
                    .collect(),
                entry: BlockId::new(0),
            }
        }
    }

    impl GraphBase for TestGraph {
        fn node_count(&self) -> usize {
            self.node_count
        }

        fn node_ids(&self) -> impl Iterator<Item = BlockId> {
            (0..self.node_count).map(BlockId::new)
        }
    }

    impl Successors for TestGraph {
        fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node)
                .map(|(_, dst)| *dst)
        }
    }

    impl Predecessors for TestGraph {
        fn predecessors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node)
                .map(|(src, _)| *src)
        }
    }

    impl RootedGraph for TestGraph {
        fn entry(&self) -> BlockId {
            self.entry
        }
    }
}
