//! The function body: an arena of basic blocks and instructions.
//!
//! This module provides [`Graph`], the owner of all IR nodes. Blocks and
//! instructions are stored in arena vectors and referenced by
//! [`BlockId`]/[`InstrId`] handles; the arenas are append-only and never
//! compacted, so handles stay valid for the lifetime of the graph.
//!
//! # Edge discipline
//!
//! The IR is a cyclic structure (phi ↔ latch, predecessor ↔ successor,
//! def ↔ use), so every edge has two halves that must agree. All mutation
//! goes through the methods on [`Graph`], which maintain both halves:
//!
//! - [`Graph::add_successor_true`] / [`Graph::add_successor_false`] set the
//!   successor slot *and* push the source onto the target's predecessor set
//! - [`Graph::add_instruction`] and [`Graph::add_input`] register one user
//!   entry on the referenced instruction per operand slot
//!
//! # Examples
//!
//! ```rust,ignore
//! use tinyssa::ir::{Graph, Input, Type};
//!
//! // ret = arg0 - 1
//! let mut graph = Graph::new(1, vec![Type::Int64]);
//! let block = graph.entry();
//! let x = graph.add_arg(block, 0)?;
//! let dec = graph.add_sub(block, Input::Instr(x), Input::Imm(1))?;
//! graph.add_ret(block, Input::Instr(dec))?;
//! # Ok::<(), tinyssa::Error>(())
//! ```

use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    ir::{BasicBlock, BlockId, Input, InstrFlags, InstrId, Instruction, Opcode, Type},
    Result,
};

static GRAPH_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A function body: basic blocks, instructions and argument types.
///
/// The graph owns its blocks and instructions; block identifiers equal
/// their index in the block vector and the entry block is index 0 by
/// convention. Analyses borrow the graph immutably, the optimizer mutably;
/// concurrent mutation is not supported.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Process-wide unique identifier of this graph.
    id: u32,
    /// Argument types of the function.
    args: Vec<Type>,
    /// Block arena; a block's id equals its index.
    blocks: Vec<BasicBlock>,
    /// Instruction arena; an instruction's id equals its index.
    instrs: Vec<Instruction>,
}

impl Graph {
    /// Creates a graph with `block_count` empty blocks and the given
    /// argument types.
    ///
    /// Block 0 is the entry block. A `block_count` of zero yields an empty
    /// graph on which every analysis returns an empty artifact.
    #[must_use]
    pub fn new(block_count: usize, args: Vec<Type>) -> Self {
        Self {
            id: GRAPH_COUNTER.fetch_add(1, Ordering::Relaxed),
            args,
            blocks: (0..block_count).map(|i| BasicBlock::new(BlockId(i))).collect(),
            instrs: Vec::new(),
        }
    }

    /// Returns the unique identifier of this graph.
    #[must_use]
    #[inline]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the argument types of the function.
    #[must_use]
    #[inline]
    pub fn args(&self) -> &[Type] {
        &self.args
    }

    /// Returns the number of basic blocks.
    #[must_use]
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of instructions.
    #[must_use]
    #[inline]
    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    /// Returns `true` if the graph has no blocks.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the entry block identifier.
    ///
    /// The entry is block 0 by convention. The value is only meaningful on
    /// a non-empty graph; analyses check [`Graph::is_empty`] first.
    #[must_use]
    #[inline]
    pub const fn entry(&self) -> BlockId {
        BlockId(0)
    }

    /// Returns a reference to the block with the given identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid block of this graph.
    #[must_use]
    #[inline]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    #[inline]
    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// Returns an iterator over all blocks in index order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// Returns a reference to the instruction with the given identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid instruction of this graph.
    #[must_use]
    #[inline]
    pub fn instr(&self, id: InstrId) -> &Instruction {
        &self.instrs[id.index()]
    }

    #[inline]
    pub(crate) fn instr_mut(&mut self, id: InstrId) -> &mut Instruction {
        &mut self.instrs[id.index()]
    }

    /// Returns an iterator over all instructions in arena order.
    ///
    /// Arena order is creation order, not chain order; use
    /// [`Graph::block_instructions`] to walk a block's chain.
    pub fn instrs(&self) -> impl Iterator<Item = &Instruction> {
        self.instrs.iter()
    }

    /// Returns an iterator over a block's instruction chain, phis first.
    pub fn block_instructions(&self, block: BlockId) -> InstrChainIter<'_> {
        InstrChainIter {
            graph: self,
            cursor: self.block(block).first_instruction(),
        }
    }

    /// Makes `to` the fall-through / true successor of `from`.
    ///
    /// Sets `from.next1` and pushes `from` onto `to.preds`. Each successor
    /// slot may be assigned once.
    pub fn add_successor_true(&mut self, from: BlockId, to: BlockId) {
        debug_assert!(self.blocks[from.index()].next1.is_none());
        self.blocks[from.index()].next1 = Some(to);
        self.blocks[to.index()].preds.push(from);
    }

    /// Makes `to` the alternative successor of `from`.
    ///
    /// Sets `from.next2` and pushes `from` onto `to.preds`. Each successor
    /// slot may be assigned once.
    pub fn add_successor_false(&mut self, from: BlockId, to: BlockId) {
        debug_assert!(self.blocks[from.index()].next2.is_none());
        self.blocks[from.index()].next2 = Some(to);
        self.blocks[to.index()].preds.push(from);
    }

    /// Appends an instruction to a block's chain.
    ///
    /// The instruction is placed after the current last instruction; the
    /// block's `first_phi`/`first_not_phi`/`last` entry points are updated,
    /// and for every operand referencing another instruction one user entry
    /// is registered on the referenced instruction.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::PhiOrdering`] if `opcode` is `PHI` and the block
    ///   already contains a non-phi instruction
    /// - [`crate::Error::NotAPhi`] if a phi operand is passed for a non-phi
    ///   opcode
    /// - [`crate::Error::NotAPredecessor`] if a phi operand names a block
    ///   that is not a predecessor of `block`
    pub fn add_instruction(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        ty: Type,
        inputs: Vec<Input>,
    ) -> Result<InstrId> {
        self.add_instruction_with_flags(block, opcode, ty, inputs, InstrFlags::empty())
    }

    /// Appends an instruction with explicit flag bits.
    ///
    /// See [`Graph::add_instruction`] for the chain and edge discipline.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_instruction_with_flags(
        &mut self,
        block: BlockId,
        opcode: Opcode,
        ty: Type,
        inputs: Vec<Input>,
        flags: InstrFlags,
    ) -> Result<InstrId> {
        let id = InstrId(self.instrs.len());

        if opcode.is_phi() && self.blocks[block.index()].first_not_phi.is_some() {
            return Err(crate::Error::PhiOrdering(block));
        }
        for input in &inputs {
            self.check_phi_input(id, opcode, block, input)?;
        }

        let prev = self.blocks[block.index()].last;
        self.instrs.push(Instruction {
            id,
            opcode,
            ty,
            flags,
            block,
            prev,
            next: None,
            inputs,
            users: Vec::new(),
        });

        // Both halves of each use-def edge: one user entry per operand slot.
        let input_count = self.instrs[id.index()].inputs.len();
        for slot in 0..input_count {
            if let Some(def) = self.instrs[id.index()].inputs[slot].referenced() {
                self.instrs[def.index()].users.push(id);
            }
        }

        if let Some(prev) = prev {
            self.instrs[prev.index()].next = Some(id);
        }
        let bb = &mut self.blocks[block.index()];
        if opcode.is_phi() {
            if bb.first_phi.is_none() {
                bb.first_phi = Some(id);
            }
        } else if bb.first_not_phi.is_none() {
            bb.first_not_phi = Some(id);
        }
        bb.last = Some(id);

        Ok(id)
    }

    /// Appends an operand to an existing instruction and registers the
    /// def-use back edge.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::NotAPhi`] if `input` is a phi operand and `instr`
    ///   is not a phi
    /// - [`crate::Error::NotAPredecessor`] if a phi operand names a block
    ///   that is not a predecessor of the owning block
    pub fn add_input(&mut self, instr: InstrId, input: Input) -> Result<()> {
        let opcode = self.instrs[instr.index()].opcode;
        let block = self.instrs[instr.index()].block;
        self.check_phi_input(instr, opcode, block, &input)?;

        self.instrs[instr.index()].inputs.push(input);
        if let Some(def) = input.referenced() {
            self.instrs[def.index()].users.push(instr);
        }
        Ok(())
    }

    fn check_phi_input(
        &self,
        instr: InstrId,
        opcode: Opcode,
        block: BlockId,
        input: &Input,
    ) -> Result<()> {
        if let Input::Phi { pred, .. } = input {
            if !opcode.is_phi() {
                return Err(crate::Error::NotAPhi(instr));
            }
            if !self.blocks[block.index()].preds.contains(pred) {
                return Err(crate::Error::NotAPredecessor {
                    block,
                    pred: *pred,
                });
            }
        }
        Ok(())
    }

    /// Appends an `ARG` instruction loading the argument at `index`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_arg(&mut self, block: BlockId, index: i64) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Arg, Opcode::Arg.result_type(), vec![Input::Imm(index)])
    }

    /// Appends a `CONST` instruction with the given immediate value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_const(&mut self, block: BlockId, value: i64) -> Result<InstrId> {
        self.add_instruction(
            block,
            Opcode::Const,
            Opcode::Const.result_type(),
            vec![Input::Imm(value)],
        )
    }

    /// Appends a `PHI` instruction with no operands yet.
    ///
    /// Operands are added afterwards via [`Graph::add_phi_input`], once the
    /// incoming edges exist.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_phi(&mut self, block: BlockId) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Phi, Opcode::Phi.result_type(), Vec::new())
    }

    /// Appends a phi operand `(value, pred)` to an existing phi.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_input`].
    pub fn add_phi_input(&mut self, phi: InstrId, value: InstrId, pred: BlockId) -> Result<()> {
        self.add_input(phi, Input::Phi { value, pred })
    }

    /// Appends an `ADD` instruction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_add(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Add, Opcode::Add.result_type(), vec![a, b])
    }

    /// Appends a `SUB` instruction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_sub(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Sub, Opcode::Sub.result_type(), vec![a, b])
    }

    /// Appends a `MUL` instruction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_mul(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Mul, Opcode::Mul.result_type(), vec![a, b])
    }

    /// Appends an `AND` instruction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_and(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::And, Opcode::And.result_type(), vec![a, b])
    }

    /// Appends a `SHR` instruction (arithmetic right shift).
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_shr(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Shr, Opcode::Shr.result_type(), vec![a, b])
    }

    /// Appends an `EQ` comparison.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_eq(&mut self, block: BlockId, a: Input, b: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Eq, Opcode::Eq.result_type(), vec![a, b])
    }

    /// Appends a `RET` instruction returning `value`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Graph::add_instruction`].
    pub fn add_ret(&mut self, block: BlockId, value: Input) -> Result<InstrId> {
        self.add_instruction(block, Opcode::Ret, Opcode::Ret.result_type(), vec![value])
    }

    /// Renders one instruction as a human-readable line.
    ///
    /// The format is for debugging only; no stability is promised.
    #[must_use]
    pub fn dump_instr_debug(&self, id: InstrId) -> String {
        let inst = self.instr(id);
        let mut out = String::new();
        let _ = write!(out, "{} = {}", id, inst.opcode());
        if inst.is_throwable() {
            out.push_str(" !throw");
        }
        for (slot, input) in inst.inputs().iter().enumerate() {
            out.push_str(if slot == 0 { " " } else { ", " });
            match input {
                Input::Instr(def) => {
                    let _ = write!(out, "{def}");
                }
                Input::Imm(value) => {
                    let _ = write!(out, "{value}");
                }
                Input::Phi { value, pred } => {
                    let _ = write!(out, "({value}, {pred})");
                }
            }
        }
        if !inst.users().is_empty() {
            out.push_str(" ; users:");
            for user in inst.users() {
                let _ = write!(out, " {user}");
            }
        }
        out
    }

    /// Renders one block and its instruction chain as human-readable text.
    ///
    /// The format is for debugging only; no stability is promised.
    #[must_use]
    pub fn dump_block_debug(&self, id: BlockId) -> String {
        let block = self.block(id);
        let mut out = String::new();
        let _ = write!(out, "{id}:");
        if let Some(next1) = block.next1() {
            let _ = write!(out, " next1={next1}");
        }
        if let Some(next2) = block.next2() {
            let _ = write!(out, " next2={next2}");
        }
        if !block.preds().is_empty() {
            out.push_str(" preds:");
            for pred in block.preds() {
                let _ = write!(out, " {pred}");
            }
        }
        out.push('\n');
        for inst in self.block_instructions(id) {
            let _ = writeln!(out, "  {}", self.dump_instr_debug(inst));
        }
        out
    }

    /// Renders the whole graph as human-readable text.
    ///
    /// The format is for debugging only; no stability is promised.
    #[must_use]
    pub fn dump_debug(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "graph %{} args:", self.id);
        for arg in &self.args {
            let _ = write!(out, " {arg}");
        }
        out.push('\n');
        for block in &self.blocks {
            out.push_str(&self.dump_block_debug(block.id()));
        }
        out
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump_debug())
    }
}

/// Iterator over a block's instruction chain, phis first.
pub struct InstrChainIter<'g> {
    graph: &'g Graph,
    cursor: Option<InstrId>,
}

impl Iterator for InstrChainIter<'_> {
    type Item = InstrId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.graph.instr(id).next();
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ir::{BlockId, Input, InstrFlags, Opcode, Type},
        Error,
    };

    use super::*;

    #[test]
    fn test_new_graph() {
        let graph = Graph::new(3, vec![Type::Int64, Type::Int32]);
        assert_eq!(graph.block_count(), 3);
        assert_eq!(graph.args(), &[Type::Int64, Type::Int32]);
        assert_eq!(graph.entry(), BlockId::new(0));
        for (i, block) in graph.blocks().enumerate() {
            assert_eq!(block.id().index(), i);
        }
    }

    #[test]
    fn test_graph_ids_are_unique() {
        let a = Graph::new(1, vec![]);
        let b = Graph::new(1, vec![]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_successor_edges_update_preds() {
        let mut graph = Graph::new(3, vec![]);
        let (a, b, c) = (BlockId::new(0), BlockId::new(1), BlockId::new(2));
        graph.add_successor_true(a, b);
        graph.add_successor_false(a, c);
        graph.add_successor_true(b, c);

        assert_eq!(graph.block(a).next1(), Some(b));
        assert_eq!(graph.block(a).next2(), Some(c));
        assert_eq!(graph.block(b).preds(), &[a]);
        assert_eq!(graph.block(c).preds(), &[a, b]);
    }

    #[test]
    fn test_add_instruction_registers_users() {
        let mut graph = Graph::new(1, vec![Type::Int64]);
        let block = graph.entry();
        let x = graph.add_arg(block, 0).unwrap();
        let c = graph.add_const(block, 2).unwrap();
        let sum = graph
            .add_add(block, Input::Instr(x), Input::Instr(c))
            .unwrap();

        assert_eq!(graph.instr(x).users(), &[sum]);
        assert_eq!(graph.instr(c).users(), &[sum]);
        assert_eq!(graph.instr(sum).inputs(), &[Input::Instr(x), Input::Instr(c)]);
    }

    #[test]
    fn test_duplicate_operand_registers_two_users() {
        let mut graph = Graph::new(1, vec![Type::Int64]);
        let block = graph.entry();
        let x = graph.add_arg(block, 0).unwrap();
        let sub = graph
            .add_sub(block, Input::Instr(x), Input::Instr(x))
            .unwrap();

        // One user entry per operand slot.
        assert_eq!(graph.instr(x).users(), &[sub, sub]);
    }

    #[test]
    fn test_chain_partition() {
        let mut graph = Graph::new(2, vec![]);
        let (entry, body) = (BlockId::new(0), BlockId::new(1));
        graph.add_successor_true(entry, body);

        let phi1 = graph.add_phi(body).unwrap();
        let phi2 = graph.add_phi(body).unwrap();
        let c = graph.add_const(body, 1).unwrap();
        let sub = graph
            .add_sub(body, Input::Instr(phi1), Input::Instr(c))
            .unwrap();

        let block = graph.block(body);
        assert_eq!(block.first_phi(), Some(phi1));
        assert_eq!(block.first_not_phi(), Some(c));
        assert_eq!(block.last(), Some(sub));

        let chain: Vec<_> = graph.block_instructions(body).collect();
        assert_eq!(chain, vec![phi1, phi2, c, sub]);
        assert_eq!(graph.instr(c).prev(), Some(phi2));
        assert_eq!(graph.instr(phi2).next(), Some(c));
    }

    #[test]
    fn test_phi_after_non_phi_fails() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        graph.add_const(block, 1).unwrap();

        match graph.add_phi(block) {
            Err(Error::PhiOrdering(b)) => assert_eq!(b, block),
            other => panic!("expected PhiOrdering, got {other:?}"),
        }
    }

    #[test]
    fn test_phi_input_requires_phi() {
        let mut graph = Graph::new(2, vec![Type::Int64]);
        let (entry, body) = (BlockId::new(0), BlockId::new(1));
        graph.add_successor_true(entry, body);
        let x = graph.add_arg(entry, 0).unwrap();
        let c = graph.add_const(body, 1).unwrap();

        match graph.add_input(c, Input::Phi { value: x, pred: entry }) {
            Err(Error::NotAPhi(id)) => assert_eq!(id, c),
            other => panic!("expected NotAPhi, got {other:?}"),
        }
    }

    #[test]
    fn test_phi_input_requires_predecessor() {
        let mut graph = Graph::new(3, vec![Type::Int64]);
        let (entry, body, other) = (BlockId::new(0), BlockId::new(1), BlockId::new(2));
        graph.add_successor_true(entry, body);
        let x = graph.add_arg(entry, 0).unwrap();
        let phi = graph.add_phi(body).unwrap();

        match graph.add_phi_input(phi, x, other) {
            Err(Error::NotAPredecessor { block, pred }) => {
                assert_eq!(block, body);
                assert_eq!(pred, other);
            }
            other => panic!("expected NotAPredecessor, got {other:?}"),
        }
    }

    #[test]
    fn test_add_phi_input_registers_user() {
        let mut graph = Graph::new(2, vec![Type::Int64]);
        let (entry, body) = (BlockId::new(0), BlockId::new(1));
        graph.add_successor_true(entry, body);
        let x = graph.add_arg(entry, 0).unwrap();
        let phi = graph.add_phi(body).unwrap();
        graph.add_phi_input(phi, x, entry).unwrap();

        assert_eq!(graph.instr(x).users(), &[phi]);
        assert_eq!(
            graph.instr(phi).inputs(),
            &[Input::Phi { value: x, pred: entry }]
        );
    }

    #[test]
    fn test_throwable_flag() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let inst = graph
            .add_instruction_with_flags(
                block,
                Opcode::Const,
                Type::Int64,
                vec![Input::Imm(0)],
                InstrFlags::THROWABLE,
            )
            .unwrap();
        assert!(graph.instr(inst).is_throwable());
        assert!(graph.dump_instr_debug(inst).contains("!throw"));
    }

    #[test]
    fn test_dump_debug_contains_edges() {
        let mut graph = Graph::new(2, vec![Type::Int64]);
        let (entry, exit) = (BlockId::new(0), BlockId::new(1));
        graph.add_successor_true(entry, exit);
        let x = graph.add_arg(entry, 0).unwrap();
        graph.add_ret(exit, Input::Instr(x)).unwrap();

        let dump = graph.dump_debug();
        assert!(dump.contains("b0: next1=b1"));
        assert!(dump.contains("preds: b0"));
        assert!(dump.contains("%0 = ARG 0"));
        assert!(dump.contains("%1 = RET %0"));
    }
}
