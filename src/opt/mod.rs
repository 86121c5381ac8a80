//! Local optimizations over the instruction graph.
//!
//! # Key Components
//!
//! - [`constant_folding`] - folds `SUB`/`AND`/`SHR` with constant operands
//!   into `CONST` instructions
//! - [`peephole_pass`] - algebraic identities (`x - 0`, `x & x`,
//!   `x >> 0`, ...) rewritten into copies or constants
//! - [`optimize`] - the combined pipeline, iterated to a fixpoint
//! - [`as_constant`] - operand value lookup shared by both passes
//!
//! # Rewriting discipline
//!
//! Both passes walk the blocks in reverse postorder and each block's chain
//! front to back, sampling the `next` handle *before* rewriting the current
//! instruction so in-place mutation does not derail the iteration. Rewrites
//! never unlink instructions from the chain; an instruction whose value is
//! no longer needed is turned into a `CONST` stub that nothing refers to.
//!
//! Two primitives perform every rewrite and keep the def-use graph
//! consistent:
//!
//! - *Replace with constant*: the instruction itself becomes `CONST v`; it
//!   is dropped from its operands' user lists while its own users keep
//!   their entries and now read the constant.
//! - *Replace with operand*: every consumer slot is redirected to the
//!   target operand (user entries move with the slots, one entry per
//!   slot), then the instruction is detached from its operands and left
//!   behind as a dead `CONST` stub.

mod fold;
mod peephole;

pub use fold::{as_constant, constant_folding};
pub use peephole::peephole_pass;

use rustc_hash::FxHashSet;

use crate::{
    ir::{Graph, Input, InstrId, Opcode},
    Result,
};

/// Runs the combined optimization pipeline until a full round changes
/// nothing.
///
/// The running order within one round is constant folding, then the
/// peephole pass; a quiet round ends the pipeline, so folding always gets a
/// look at the peephole's output. Two rounds suffice for the supported
/// opcodes, but the fixpoint makes no assumption about that.
///
/// # Errors
///
/// Propagates the structural errors of [`constant_folding`]; the graph is
/// left untouched from the point of failure onward.
pub fn optimize(graph: &mut Graph) -> Result<()> {
    loop {
        let mut changed = constant_folding(graph)?;
        changed |= peephole_pass(graph);
        if !changed {
            break;
        }
    }
    Ok(())
}

/// Rewrites `id` into `CONST value` in place.
///
/// The instruction is removed from each of its operands' user lists (every
/// entry for it, so duplicate-slot consumers are fully detached). Its own
/// user list is untouched: consumers keep their slots and now read the
/// constant.
pub(crate) fn replace_with_const(graph: &mut Graph, id: InstrId, value: i64) {
    let inputs = std::mem::take(&mut graph.instr_mut(id).inputs);
    for input in &inputs {
        if let Some(def) = input.referenced() {
            graph.instr_mut(def).users.retain(|&user| user != id);
        }
    }

    let inst = graph.instr_mut(id);
    inst.opcode = Opcode::Const;
    inst.inputs = vec![Input::Imm(value)];
}

/// Redirects every consumer of `id` to `target` and leaves `id` behind as a
/// dead `CONST` stub.
///
/// For each consumer, every operand slot referencing `id` is rewritten to
/// `target`; when the target is an instruction, one user entry is appended
/// to it per redirected slot. Phi operand slots carry a (value, block)
/// pair, so they can be redirected to an instruction but not to an
/// immediate; such consumers keep reading the stub, which then holds the
/// immediate's value.
///
/// `target` must be a plain operand, not a phi operand.
pub(crate) fn replace_with_input(graph: &mut Graph, id: InstrId, target: Input) {
    debug_assert!(!matches!(target, Input::Phi { .. }));

    let users = std::mem::take(&mut graph.instr_mut(id).users);
    let mut processed: FxHashSet<InstrId> = FxHashSet::default();
    let mut residual: Vec<InstrId> = Vec::new();

    for user in users {
        if !processed.insert(user) {
            continue; // duplicate entry; all slots were handled already
        }
        let slot_count = graph.instr(user).inputs.len();
        for slot in 0..slot_count {
            let current = graph.instr(user).inputs[slot];
            match current {
                Input::Instr(referenced) if referenced == id => {
                    graph.instr_mut(user).inputs[slot] = target;
                    if let Some(t) = target.referenced() {
                        graph.instr_mut(t).users.push(user);
                    }
                }
                Input::Phi { value, pred } if value == id => match target {
                    Input::Instr(t) => {
                        graph.instr_mut(user).inputs[slot] = Input::Phi { value: t, pred };
                        graph.instr_mut(t).users.push(user);
                    }
                    _ => residual.push(user),
                },
                _ => {}
            }
        }
    }

    // Detach from the operands, then leave a constant stub behind.
    let inputs = std::mem::take(&mut graph.instr_mut(id).inputs);
    for input in &inputs {
        if let Some(def) = input.referenced() {
            graph.instr_mut(def).users.retain(|&user| user != id);
        }
    }

    let stub_value = if residual.is_empty() {
        0
    } else {
        target.as_imm().unwrap_or(0)
    };
    let inst = graph.instr_mut(id);
    inst.users = residual;
    inst.opcode = Opcode::Const;
    inst.inputs = vec![Input::Imm(stub_value)];
}
