//! Structural verification of a graph.
//!
//! This module provides [`verify_graph`], which checks the invariants the
//! rest of the library relies on:
//!
//! - **Use-def symmetry**: for every operand slot referencing instruction
//!   `J`, `J`'s user list holds exactly one matching entry, and every user
//!   entry corresponds to exactly one such slot (an exact multiset match,
//!   so a consumer using one value in two slots needs two entries)
//! - **Phi placement**: phi operands appear only on phi instructions and
//!   name a predecessor of the owning block
//! - **Constant shape**: a `CONST` has exactly one operand, an immediate
//! - **Chain ordering**: each block's chain is well linked, phis precede
//!   non-phis, and the `first_phi`/`first_not_phi`/`last` entry points
//!   agree with the chain
//! - **Edge symmetry**: the successor multiset and the predecessor multiset
//!   describe the same control-flow edges
//!
//! Verification is read-only and is primarily used by tests after
//! construction and after optimizer passes.

use rustc_hash::FxHashMap;

use crate::{
    ir::{BlockId, Graph, Input, InstrId, Opcode},
    Result,
};

/// Checks the structural invariants of a graph.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] naming the offending block or
/// instruction when any invariant does not hold.
pub fn verify_graph(graph: &Graph) -> Result<()> {
    verify_chains(graph)?;
    verify_operands(graph)?;
    verify_use_def_symmetry(graph)?;
    verify_edge_symmetry(graph)?;
    Ok(())
}

fn verify_chains(graph: &Graph) -> Result<()> {
    let mut chained = 0usize;

    for block in graph.blocks() {
        let id = block.id();
        let mut prev: Option<InstrId> = None;
        let mut seen_non_phi = false;
        let mut first_phi = None;
        let mut first_not_phi = None;

        for inst_id in graph.block_instructions(id) {
            let inst = graph.instr(inst_id);
            chained += 1;

            if inst.block() != id {
                return Err(malformed_error!(
                    "instruction {inst_id} is chained in {id} but owned by {}",
                    inst.block()
                ));
            }
            if inst.prev() != prev {
                return Err(malformed_error!("broken prev link at {inst_id} in {id}"));
            }
            if inst.is_phi() {
                if seen_non_phi {
                    return Err(malformed_error!("phi {inst_id} after a non-phi in {id}"));
                }
                first_phi = first_phi.or(Some(inst_id));
            } else {
                seen_non_phi = true;
                first_not_phi = first_not_phi.or(Some(inst_id));
            }
            prev = Some(inst_id);
        }

        if block.first_phi() != first_phi {
            return Err(malformed_error!("first_phi of {id} disagrees with its chain"));
        }
        if block.first_not_phi() != first_not_phi {
            return Err(malformed_error!(
                "first_not_phi of {id} disagrees with its chain"
            ));
        }
        if block.last() != prev {
            return Err(malformed_error!("last of {id} disagrees with its chain"));
        }
    }

    if chained != graph.instr_count() {
        return Err(malformed_error!(
            "{} instructions chained, {} allocated",
            chained,
            graph.instr_count()
        ));
    }
    Ok(())
}

fn verify_operands(graph: &Graph) -> Result<()> {
    for inst in graph.instrs() {
        for input in inst.inputs() {
            if let Input::Phi { pred, .. } = input {
                if !inst.is_phi() {
                    return Err(malformed_error!(
                        "phi operand on non-phi instruction {}",
                        inst.id()
                    ));
                }
                if !graph.block(inst.block()).preds().contains(pred) {
                    return Err(malformed_error!(
                        "phi {} names {pred} which is not a predecessor of {}",
                        inst.id(),
                        inst.block()
                    ));
                }
            }
        }

        if inst.opcode() == Opcode::Const
            && !(inst.inputs().len() == 1 && inst.input(0).as_imm().is_some())
        {
            return Err(malformed_error!(
                "CONST {} must have a single immediate operand",
                inst.id()
            ));
        }
    }
    Ok(())
}

fn verify_use_def_symmetry(graph: &Graph) -> Result<()> {
    // (def, user) -> number of operand slots on `user` referencing `def`
    let mut from_slots: FxHashMap<(InstrId, InstrId), usize> = FxHashMap::default();
    for inst in graph.instrs() {
        for input in inst.inputs() {
            if let Some(def) = input.referenced() {
                *from_slots.entry((def, inst.id())).or_default() += 1;
            }
        }
    }

    let mut from_users: FxHashMap<(InstrId, InstrId), usize> = FxHashMap::default();
    for inst in graph.instrs() {
        for &user in inst.users() {
            *from_users.entry((inst.id(), user)).or_default() += 1;
        }
    }

    for (&(def, user), &slots) in &from_slots {
        let entries = from_users.get(&(def, user)).copied().unwrap_or(0);
        if entries != slots {
            return Err(malformed_error!(format!(
                "{user} references {def} in {slots} slot(s) but {def} lists {entries} matching user entrie(s)"
            )));
        }
    }
    for (&(def, user), &entries) in &from_users {
        if !from_slots.contains_key(&(def, user)) {
            return Err(malformed_error!(format!(
                "{def} lists {user} as a user ({entries} entrie(s)) but no operand of {user} references it"
            )));
        }
    }
    Ok(())
}

fn verify_edge_symmetry(graph: &Graph) -> Result<()> {
    // (from, to) -> edge count from successor slots
    let mut succ_edges: FxHashMap<(BlockId, BlockId), usize> = FxHashMap::default();
    for block in graph.blocks() {
        for succ in [block.next1(), block.next2()].into_iter().flatten() {
            *succ_edges.entry((block.id(), succ)).or_default() += 1;
        }
    }

    let mut pred_edges: FxHashMap<(BlockId, BlockId), usize> = FxHashMap::default();
    for block in graph.blocks() {
        for &pred in block.preds() {
            *pred_edges.entry((pred, block.id())).or_default() += 1;
        }
    }

    if succ_edges != pred_edges {
        for (&(from, to), &count) in &succ_edges {
            if pred_edges.get(&(from, to)).copied().unwrap_or(0) != count {
                return Err(malformed_error!(
                    "edge {from} -> {to} is not mirrored in the predecessor set of {to}"
                ));
            }
        }
        for (&(from, to), _) in &pred_edges {
            if !succ_edges.contains_key(&(from, to)) {
                return Err(malformed_error!(
                    "{to} lists {from} as predecessor without a matching successor edge"
                ));
            }
        }
    }
    Ok(())
}
