//! Constant folding.
//!
//! Folds `SUB`, `AND` and `SHR` instructions whose operands both resolve to
//! constants into `CONST` instructions holding the 64-bit signed result.
//! Blocks are visited in reverse postorder and instructions front to back,
//! so a chain of foldable instructions collapses in a single pass.
//!
//! Folding does not look through phis: phi operands are per-edge values and
//! folding them would require edge-level constant agreement.

use crate::{
    analysis::{reverse_postorder, RootedGraph},
    ir::{Graph, Input, InstrId, Opcode},
    opt::replace_with_const,
    Result,
};

/// Resolves an operand to a constant value, if it is one.
///
/// An operand is constant when it is an immediate literal, or a reference
/// to a `CONST` instruction whose single operand is an immediate literal.
/// Phi operands never resolve.
///
/// # Examples
///
/// ```rust,ignore
/// use tinyssa::{ir::{Graph, Input, Type}, opt::as_constant};
///
/// let mut graph = Graph::new(1, vec![]);
/// let block = graph.entry();
/// let c = graph.add_const(block, 7)?;
///
/// assert_eq!(as_constant(&graph, Input::Imm(3)), Some(3));
/// assert_eq!(as_constant(&graph, Input::Instr(c)), Some(7));
/// # Ok::<(), tinyssa::Error>(())
/// ```
#[must_use]
pub fn as_constant(graph: &Graph, input: Input) -> Option<i64> {
    match input {
        Input::Imm(value) => Some(value),
        Input::Instr(def) => {
            let inst = graph.instr(def);
            if inst.opcode() == Opcode::Const {
                inst.inputs().first().and_then(Input::as_imm)
            } else {
                None
            }
        }
        Input::Phi { .. } => None,
    }
}

/// Folds constant `SUB`/`AND`/`SHR` instructions across the whole graph.
///
/// # Returns
///
/// `true` if at least one instruction was rewritten.
///
/// # Errors
///
/// [`crate::Error::OperandCount`] if a `SUB`, `AND` or `SHR` instruction
/// does not have exactly two operands; the pass stops at the offending
/// instruction and the graph is left untouched from that point forward.
pub fn constant_folding(graph: &mut Graph) -> Result<bool> {
    if graph.is_empty() {
        return Ok(false);
    }

    let rpo = reverse_postorder(graph, RootedGraph::entry(graph));
    let mut changed = false;
    for block in rpo {
        let mut cursor = graph.block(block).first_instruction();
        while let Some(id) = cursor {
            // Sampled before the rewrite so mutation cannot derail iteration
            let next = graph.instr(id).next();
            changed |= try_fold(graph, id)?;
            cursor = next;
        }
    }
    Ok(changed)
}

fn try_fold(graph: &mut Graph, id: InstrId) -> Result<bool> {
    let opcode = graph.instr(id).opcode();
    if !matches!(opcode, Opcode::Sub | Opcode::And | Opcode::Shr) {
        return Ok(false);
    }

    let found = graph.instr(id).inputs().len();
    if found != 2 {
        return Err(crate::Error::OperandCount {
            opcode,
            expected: 2,
            found,
        });
    }

    let lhs = graph.instr(id).input(0);
    let rhs = graph.instr(id).input(1);
    let (Some(v1), Some(v2)) = (as_constant(graph, lhs), as_constant(graph, rhs)) else {
        return Ok(false);
    };

    let result = if opcode == Opcode::Sub {
        v1.wrapping_sub(v2)
    } else if opcode == Opcode::And {
        v1 & v2
    } else {
        shift_right(v1, v2)
    };

    replace_with_const(graph, id, result);
    Ok(true)
}

/// Arithmetic right shift on a signed 64-bit value.
///
/// Shift counts outside `0..64` yield 0, matching the peephole rule for
/// oversized counts and avoiding undefined hardware behavior.
fn shift_right(value: i64, count: i64) -> i64 {
    if (0..64).contains(&count) {
        value >> count
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ir::{verify_graph, Type},
        Error,
    };

    use super::*;

    #[test]
    fn test_as_constant() {
        let mut graph = Graph::new(1, vec![Type::Int64]);
        let block = graph.entry();
        let x = graph.add_arg(block, 0).unwrap();
        let c = graph.add_const(block, 7).unwrap();

        assert_eq!(as_constant(&graph, Input::Imm(3)), Some(3));
        assert_eq!(as_constant(&graph, Input::Instr(c)), Some(7));
        assert_eq!(as_constant(&graph, Input::Instr(x)), None);
        assert_eq!(
            as_constant(&graph, Input::Phi { value: c, pred: block }),
            None
        );
    }

    #[test]
    fn test_fold_sub() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let c = graph.add_const(block, 100).unwrap();
        let sub = graph
            .add_sub(block, Input::Instr(c), Input::Imm(20))
            .unwrap();

        assert!(constant_folding(&mut graph).unwrap());
        assert_eq!(graph.instr(sub).opcode(), Opcode::Const);
        assert_eq!(graph.instr(sub).inputs(), &[Input::Imm(80)]);
        assert!(graph.instr(c).users().is_empty());
        verify_graph(&graph).unwrap();
    }

    #[test]
    fn test_fold_and_shr() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let and = graph
            .add_and(block, Input::Imm(0b1101), Input::Imm(0b0110))
            .unwrap();
        let shr = graph.add_shr(block, Input::Imm(-16), Input::Imm(2)).unwrap();

        assert!(constant_folding(&mut graph).unwrap());
        assert_eq!(graph.instr(and).inputs(), &[Input::Imm(0b0100)]);
        // Arithmetic shift keeps the sign
        assert_eq!(graph.instr(shr).inputs(), &[Input::Imm(-4)]);
    }

    #[test]
    fn test_fold_chain_in_one_pass() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let c = graph.add_const(block, 64).unwrap();
        let half = graph
            .add_shr(block, Input::Instr(c), Input::Imm(1))
            .unwrap();
        let dec = graph
            .add_sub(block, Input::Instr(half), Input::Imm(2))
            .unwrap();

        assert!(constant_folding(&mut graph).unwrap());
        assert_eq!(graph.instr(half).inputs(), &[Input::Imm(32)]);
        assert_eq!(graph.instr(dec).inputs(), &[Input::Imm(30)]);
    }

    #[test]
    fn test_oversized_shift_folds_to_zero() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let shr = graph
            .add_shr(block, Input::Imm(-1), Input::Imm(64))
            .unwrap();

        assert!(constant_folding(&mut graph).unwrap());
        assert_eq!(graph.instr(shr).inputs(), &[Input::Imm(0)]);
    }

    #[test]
    fn test_non_constant_left_alone() {
        let mut graph = Graph::new(1, vec![Type::Int64]);
        let block = graph.entry();
        let x = graph.add_arg(block, 0).unwrap();
        let sub = graph
            .add_sub(block, Input::Instr(x), Input::Imm(1))
            .unwrap();

        assert!(!constant_folding(&mut graph).unwrap());
        assert_eq!(graph.instr(sub).opcode(), Opcode::Sub);
    }

    #[test]
    fn test_ill_formed_operand_count_aborts() {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let sub = graph
            .add_instruction(block, Opcode::Sub, Type::Int64, vec![Input::Imm(1)])
            .unwrap();

        match constant_folding(&mut graph) {
            Err(Error::OperandCount {
                opcode,
                expected,
                found,
            }) => {
                assert_eq!(opcode, Opcode::Sub);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected OperandCount, got {other:?}"),
        }
        // Untouched from the failure point forward
        assert_eq!(graph.instr(sub).opcode(), Opcode::Sub);
    }

    #[test]
    fn test_empty_graph_is_noop() {
        let mut graph = Graph::new(0, vec![]);
        assert!(!constant_folding(&mut graph).unwrap());
    }
}
