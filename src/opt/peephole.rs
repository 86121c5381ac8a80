//! Peephole simplifications.
//!
//! Per-instruction algebraic rewrites on two-operand instructions:
//!
//! | Pattern | Rewrite |
//! |---|---|
//! | `SUB x, 0` | uses read `x` |
//! | `SUB x, x` | `CONST 0` |
//! | `AND x, x` | uses read `x` |
//! | `AND x, 0` / `AND 0, x` | `CONST 0` |
//! | `AND x, -1` / `AND -1, x` | uses read the other operand |
//! | `SHR x, 0` | uses read `x` |
//! | `SHR x, c` with `c >= 64` | `CONST 0` |
//!
//! Operands are "equal" when both are immediates with the same value or
//! both reference the same instruction; phi operand equality is not
//! defined. Constants are resolved through [`as_constant`], so a `CONST`
//! instruction operand counts as its value.

use crate::{
    analysis::{reverse_postorder, RootedGraph},
    ir::{Graph, Input, InstrId, Opcode},
    opt::{as_constant, replace_with_const, replace_with_input},
};

/// Runs the peephole simplifications across the whole graph.
///
/// Blocks are visited in reverse postorder, instructions front to back with
/// the `next` handle sampled before any rewrite. Instructions that do not
/// have exactly two operands are skipped.
///
/// # Returns
///
/// `true` if at least one instruction was rewritten.
pub fn peephole_pass(graph: &mut Graph) -> bool {
    if graph.is_empty() {
        return false;
    }

    let rpo = reverse_postorder(graph, RootedGraph::entry(graph));
    let mut changed = false;
    for block in rpo {
        let mut cursor = graph.block(block).first_instruction();
        while let Some(id) = cursor {
            let next = graph.instr(id).next();
            changed |= try_peephole(graph, id);
            cursor = next;
        }
    }
    changed
}

fn try_peephole(graph: &mut Graph, id: InstrId) -> bool {
    if graph.instr(id).inputs().len() != 2 {
        return false;
    }
    let opcode = graph.instr(id).opcode();
    let lhs = graph.instr(id).input(0);
    let rhs = graph.instr(id).input(1);

    match opcode {
        Opcode::Sub => {
            if as_constant(graph, rhs) == Some(0) {
                replace_with_input(graph, id, lhs);
                return true;
            }
            if inputs_match(lhs, rhs) {
                replace_with_const(graph, id, 0);
                return true;
            }
        }
        Opcode::And => {
            if inputs_match(lhs, rhs) {
                replace_with_input(graph, id, lhs);
                return true;
            }

            let v1 = as_constant(graph, lhs);
            let v2 = as_constant(graph, rhs);
            if v1 == Some(0) || v2 == Some(0) {
                replace_with_const(graph, id, 0);
                return true;
            }
            if v2 == Some(-1) {
                replace_with_input(graph, id, lhs);
                return true;
            }
            if v1 == Some(-1) {
                replace_with_input(graph, id, rhs);
                return true;
            }
        }
        Opcode::Shr => {
            let v2 = as_constant(graph, rhs);
            if v2 == Some(0) {
                replace_with_input(graph, id, lhs);
                return true;
            }
            if matches!(v2, Some(count) if count >= 64) {
                replace_with_const(graph, id, 0);
                return true;
            }
        }
        _ => {}
    }
    false
}

/// Operand identity: equal immediates or the same referenced instruction.
/// Phi operand equality is not defined.
fn inputs_match(a: Input, b: Input) -> bool {
    match (a, b) {
        (Input::Imm(x), Input::Imm(y)) => x == y,
        (Input::Instr(x), Input::Instr(y)) => x == y,
        _ => false,
    }
}
