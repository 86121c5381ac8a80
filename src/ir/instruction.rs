//! SSA instructions with explicit use-def and def-use edges.
//!
//! This module provides the [`Instruction`] node together with its handle
//! type [`InstrId`], the operand representation [`Input`] and the flag bits
//! [`InstrFlags`].
//!
//! # Design
//!
//! Instructions live in an arena owned by the [`crate::ir::Graph`] and are
//! referenced by [`InstrId`] handles everywhere a pointer would be used in a
//! pointer-based IR. Each instruction carries:
//!
//! - **Inputs**: the ordered operand slots (use-def edges)
//! - **Users**: the reverse def-use edges, one entry per operand slot of a
//!   consumer that references this instruction
//! - **prev/next**: intrusive membership in the owning block's instruction
//!   chain, with all phi instructions preceding all non-phi instructions
//!
//! The two halves of every edge are maintained together by the mutation
//! methods on [`crate::ir::Graph`]; nothing in this module mutates edges on
//! its own.

use std::fmt;

use bitflags::bitflags;

use crate::ir::{BlockId, Opcode, Type};

/// A strongly-typed identifier for instructions within a graph.
///
/// `InstrId` wraps a `usize` index into the graph's instruction arena.
/// Handles are assigned sequentially starting from 0 as instructions are
/// appended and stay valid for the lifetime of the graph; the arena is
/// never compacted.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::ir::{Graph, Type};
///
/// let mut graph = Graph::new(1, vec![Type::Int64]);
/// let block = graph.entry();
/// let c = graph.add_const(block, 10)?;
/// assert_eq!(c.index(), 0);
/// # Ok::<(), tinyssa::Error>(())
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub(crate) usize);

impl InstrId {
    /// Creates a new `InstrId` from a raw index value.
    ///
    /// This constructor is primarily intended for internal use and testing.
    /// Normal usage should obtain `InstrId` values from the instruction
    /// constructors on [`crate::ir::Graph`].
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        InstrId(index)
    }

    /// Returns the raw index value of this instruction identifier.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstrId({})", self.0)
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Optional per-instruction flag bits.
    pub struct InstrFlags: u8 {
        /// The instruction may throw at runtime.
        const THROWABLE = 0x01;
    }
}

impl Default for InstrFlags {
    fn default() -> Self {
        InstrFlags::empty()
    }
}

/// An operand slot of an instruction.
///
/// Operands come in three shapes: a reference to another instruction (an SSA
/// value), an immediate integer literal, or a phi operand pairing a value
/// with the predecessor block its edge comes from.
///
/// Phi operands appear only on [`Opcode::Phi`] instructions and their
/// `pred` must be a predecessor of the phi's owning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Reference to the instruction producing the operand value.
    Instr(InstrId),
    /// Immediate integer literal.
    Imm(i64),
    /// Phi operand: the incoming value for one specific incoming edge.
    Phi {
        /// The instruction producing the incoming value.
        value: InstrId,
        /// The predecessor block the value flows in from.
        pred: BlockId,
    },
}

impl Input {
    /// Returns the instruction referenced by this operand, if any.
    ///
    /// Both plain references and phi operands reference an instruction;
    /// immediates reference nothing. This is the relation the def-use edges
    /// mirror: for every operand referencing `J`, `J`'s user list holds one
    /// matching entry.
    #[must_use]
    #[inline]
    pub const fn referenced(&self) -> Option<InstrId> {
        match self {
            Input::Instr(id) | Input::Phi { value: id, .. } => Some(*id),
            Input::Imm(_) => None,
        }
    }

    /// Returns the immediate value if this operand is a literal.
    #[must_use]
    #[inline]
    pub const fn as_imm(&self) -> Option<i64> {
        match self {
            Input::Imm(value) => Some(*value),
            _ => None,
        }
    }
}

/// An SSA value node.
///
/// Instructions form a doubly-linked chain within their owning block, with
/// all phi instructions preceding all non-phi instructions. Reads go through
/// the accessors below; mutation goes through [`crate::ir::Graph`] so that
/// the use-def and def-use halves of every edge stay consistent.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::ir::{Graph, Input, Type};
///
/// let mut graph = Graph::new(1, vec![Type::Int64]);
/// let block = graph.entry();
/// let x = graph.add_arg(block, 0)?;
/// let c = graph.add_const(block, 2)?;
/// let sum = graph.add_add(block, Input::Instr(x), Input::Instr(c))?;
///
/// assert_eq!(graph.instr(sum).inputs().len(), 2);
/// assert_eq!(graph.instr(x).users(), &[sum]);
/// # Ok::<(), tinyssa::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Identifier of this instruction, equal to its arena index.
    pub(crate) id: InstrId,
    /// The operation this instruction performs.
    pub(crate) opcode: Opcode,
    /// The type of the produced value.
    pub(crate) ty: Type,
    /// Optional flag bits.
    pub(crate) flags: InstrFlags,
    /// The block this instruction belongs to.
    pub(crate) block: BlockId,
    /// Previous instruction in the owning block's chain.
    pub(crate) prev: Option<InstrId>,
    /// Next instruction in the owning block's chain.
    pub(crate) next: Option<InstrId>,
    /// Ordered operand slots.
    pub(crate) inputs: Vec<Input>,
    /// Def-use edges: one entry per operand slot of a consumer referencing
    /// this instruction. Unordered; duplicates are meaningful (a consumer
    /// using this value in two slots contributes two entries).
    pub(crate) users: Vec<InstrId>,
}

impl Instruction {
    /// Returns the identifier of this instruction.
    #[must_use]
    #[inline]
    pub const fn id(&self) -> InstrId {
        self.id
    }

    /// Returns the opcode of this instruction.
    #[must_use]
    #[inline]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Returns the type of the value this instruction produces.
    #[must_use]
    #[inline]
    pub const fn ty(&self) -> Type {
        self.ty
    }

    /// Returns the flag bits of this instruction.
    #[must_use]
    #[inline]
    pub const fn flags(&self) -> InstrFlags {
        self.flags
    }

    /// Returns `true` if this instruction may throw at runtime.
    #[must_use]
    #[inline]
    pub const fn is_throwable(&self) -> bool {
        self.flags.contains(InstrFlags::THROWABLE)
    }

    /// Returns the block this instruction belongs to.
    #[must_use]
    #[inline]
    pub const fn block(&self) -> BlockId {
        self.block
    }

    /// Returns the previous instruction in the owning block's chain.
    #[must_use]
    #[inline]
    pub const fn prev(&self) -> Option<InstrId> {
        self.prev
    }

    /// Returns the next instruction in the owning block's chain.
    #[must_use]
    #[inline]
    pub const fn next(&self) -> Option<InstrId> {
        self.next
    }

    /// Returns the ordered operand slots of this instruction.
    #[must_use]
    #[inline]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Returns the operand at the given slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of bounds.
    #[must_use]
    #[inline]
    pub fn input(&self, slot: usize) -> Input {
        self.inputs[slot]
    }

    /// Returns the def-use edges of this instruction.
    ///
    /// The sequence is unordered and may contain the same consumer more than
    /// once when that consumer references this value in several operand slots.
    #[must_use]
    #[inline]
    pub fn users(&self) -> &[InstrId] {
        &self.users
    }

    /// Returns `true` if this is a phi instruction.
    #[must_use]
    #[inline]
    pub const fn is_phi(&self) -> bool {
        self.opcode.is_phi()
    }
}
