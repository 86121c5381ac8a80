//! Basic blocks of the control-flow graph.
//!
//! This module provides the [`BasicBlock`] node and its handle type
//! [`BlockId`]. A block owns an ordered instruction chain partitioned into a
//! phi prefix and a non-phi suffix, has up to two ordered successors and an
//! unordered predecessor set.

use std::fmt;

use crate::ir::InstrId;

/// A strongly-typed identifier for basic blocks within a graph.
///
/// `BlockId` wraps a `usize` index, providing type safety to prevent
/// accidental mixing of block indices with other integer values. Block IDs
/// equal the block's position in the graph's block vector.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::ir::{BlockId, Graph};
///
/// let graph = Graph::new(3, vec![]);
/// assert_eq!(graph.entry(), BlockId::new(0));
/// assert_eq!(graph.block(BlockId::new(2)).id().index(), 2);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Creates a new `BlockId` from a raw index value.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        BlockId(index)
    }

    /// Returns the raw index value of this block identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl From<usize> for BlockId {
    #[inline]
    fn from(index: usize) -> Self {
        BlockId(index)
    }
}

impl From<BlockId> for usize {
    #[inline]
    fn from(block: BlockId) -> Self {
        block.0
    }
}

/// A node of the control-flow graph.
///
/// The instruction chain is intrusive: instructions link to each other via
/// their `prev`/`next` handles, and the block keeps three entry points into
/// the chain — the first phi, the first non-phi and the last instruction.
/// All phi instructions precede all non-phi instructions.
///
/// Successor order is significant: `next1` is the fall-through / true
/// branch, `next2` the alternative. The predecessor set is unordered and
/// contains one entry per incoming edge.
///
/// Blocks are created by [`crate::ir::Graph::new`] and mutated through the
/// graph so that both halves of every control-flow edge stay consistent.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Identifier of this block, equal to its index in the graph.
    pub(crate) id: BlockId,
    /// First phi instruction of the chain, if any.
    pub(crate) first_phi: Option<InstrId>,
    /// First non-phi instruction of the chain, if any.
    pub(crate) first_not_phi: Option<InstrId>,
    /// Last instruction of the chain, if any.
    pub(crate) last: Option<InstrId>,
    /// Fall-through / true successor.
    pub(crate) next1: Option<BlockId>,
    /// Alternative successor.
    pub(crate) next2: Option<BlockId>,
    /// Unordered predecessor set, one entry per incoming edge.
    pub(crate) preds: Vec<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId) -> Self {
        Self {
            id,
            first_phi: None,
            first_not_phi: None,
            last: None,
            next1: None,
            next2: None,
            preds: Vec::new(),
        }
    }

    /// Returns the identifier of this block.
    #[must_use]
    #[inline]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the first phi instruction of the chain, if any.
    #[must_use]
    #[inline]
    pub const fn first_phi(&self) -> Option<InstrId> {
        self.first_phi
    }

    /// Returns the first non-phi instruction of the chain, if any.
    #[must_use]
    #[inline]
    pub const fn first_not_phi(&self) -> Option<InstrId> {
        self.first_not_phi
    }

    /// Returns the first instruction of the chain, phi or not.
    #[must_use]
    #[inline]
    pub const fn first_instruction(&self) -> Option<InstrId> {
        match self.first_phi {
            Some(phi) => Some(phi),
            None => self.first_not_phi,
        }
    }

    /// Returns the last instruction of the chain, if any.
    #[must_use]
    #[inline]
    pub const fn last(&self) -> Option<InstrId> {
        self.last
    }

    /// Returns the fall-through / true successor, if any.
    #[must_use]
    #[inline]
    pub const fn next1(&self) -> Option<BlockId> {
        self.next1
    }

    /// Returns the alternative successor, if any.
    #[must_use]
    #[inline]
    pub const fn next2(&self) -> Option<BlockId> {
        self.next2
    }

    /// Returns the predecessor set of this block.
    #[must_use]
    #[inline]
    pub fn preds(&self) -> &[BlockId] {
        &self.preds
    }

    /// Returns `true` if the block holds no instructions.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.last.is_none()
    }
}
