//! Integration tests for constant folding, the peephole pass and the
//! combined pipeline, including the evaluation-preservation checks.

use tinyssa::prelude::*;

/// Evaluates an instruction against concrete argument values.
///
/// Covers everything the optimizer tests build; phis are out of scope for
/// straight-line evaluation.
fn eval(graph: &Graph, inst: InstrId, args: &[i64]) -> i64 {
    let slot = |index: usize| eval_input(graph, graph.instr(inst).input(index), args);
    match graph.instr(inst).opcode() {
        Opcode::Const | Opcode::Ret => slot(0),
        Opcode::Arg => args[usize::try_from(slot(0)).unwrap()],
        Opcode::Add => slot(0).wrapping_add(slot(1)),
        Opcode::Sub => slot(0).wrapping_sub(slot(1)),
        Opcode::Mul => slot(0).wrapping_mul(slot(1)),
        Opcode::And => slot(0) & slot(1),
        Opcode::Shr => {
            let count = slot(1);
            if (0..64).contains(&count) {
                slot(0) >> count
            } else {
                0
            }
        }
        Opcode::Eq => i64::from(slot(0) == slot(1)),
        Opcode::Phi => panic!("phi evaluation needs an edge context"),
    }
}

fn eval_input(graph: &Graph, input: Input, args: &[i64]) -> i64 {
    match input {
        Input::Imm(value) => value,
        Input::Instr(def) => eval(graph, def, args),
        Input::Phi { .. } => panic!("phi operand in straight-line evaluation"),
    }
}

fn assert_const(graph: &Graph, inst: InstrId, value: i64) {
    assert_eq!(graph.instr(inst).opcode(), Opcode::Const);
    assert_eq!(graph.instr(inst).inputs(), &[Input::Imm(value)]);
}

#[test]
fn folding_chain() {
    let mut graph = Graph::new(1, vec![]);
    let block = graph.entry();
    let v0 = graph.add_const(block, 100).unwrap();
    let v1 = graph.add_sub(block, Input::Instr(v0), Input::Imm(20)).unwrap();
    let v2 = graph.add_shr(block, Input::Instr(v1), Input::Imm(3)).unwrap();
    let v3 = graph.add_and(block, Input::Instr(v2), Input::Imm(7)).unwrap();
    let v4 = graph
        .add_sub(block, Input::Instr(v3), Input::Instr(v2))
        .unwrap();

    assert!(constant_folding(&mut graph).unwrap());

    assert_const(&graph, v1, 80);
    assert_const(&graph, v2, 10);
    assert_const(&graph, v3, 2);
    assert_const(&graph, v4, -8);
    verify_graph(&graph).unwrap();
}

#[test]
fn folding_matches_signed_64_bit_arithmetic() {
    let cases: &[(Opcode, i64, i64, i64)] = &[
        (Opcode::Sub, i64::MIN, 1, i64::MAX),
        (Opcode::Sub, -5, -12, 7),
        (Opcode::And, -1, 0x00ff_00ff, 0x00ff_00ff),
        (Opcode::And, i64::MIN, -1, i64::MIN),
        (Opcode::Shr, -8, 1, -4),
        (Opcode::Shr, i64::MIN, 63, -1),
        (Opcode::Shr, -1, 64, 0),
        (Opcode::Shr, 12345, 70, 0),
    ];

    for &(opcode, lhs, rhs, expected) in cases {
        let mut graph = Graph::new(1, vec![]);
        let block = graph.entry();
        let inst = graph
            .add_instruction(
                block,
                opcode,
                opcode.result_type(),
                vec![Input::Imm(lhs), Input::Imm(rhs)],
            )
            .unwrap();

        constant_folding(&mut graph).unwrap();
        assert_const(&graph, inst, expected);
    }
}

#[test]
fn peephole_coverage() {
    let mut graph = Graph::new(1, vec![Type::Int64]);
    let block = graph.entry();
    let x = graph.add_arg(block, 0).unwrap();
    let c0 = graph.add_const(block, 0).unwrap();
    let cm1 = graph.add_const(block, -1).unwrap();

    let sub_x_0 = graph.add_sub(block, Input::Instr(x), Input::Instr(c0)).unwrap();
    let sub_x_x = graph.add_sub(block, Input::Instr(x), Input::Instr(x)).unwrap();
    let and_x_0 = graph.add_and(block, Input::Instr(x), Input::Instr(c0)).unwrap();
    let and_x_m1 = graph.add_and(block, Input::Instr(x), Input::Instr(cm1)).unwrap();
    let and_m1_x = graph.add_and(block, Input::Instr(cm1), Input::Instr(x)).unwrap();
    let and_x_x = graph.add_and(block, Input::Instr(x), Input::Instr(x)).unwrap();
    let shr_x_0 = graph.add_shr(block, Input::Instr(x), Input::Instr(c0)).unwrap();
    let shr_x_70 = graph.add_shr(block, Input::Instr(x), Input::Imm(70)).unwrap();

    // One downstream probe per rewritten instruction
    let forwarded = [sub_x_0, and_x_m1, and_m1_x, and_x_x, shr_x_0];
    let probes: Vec<InstrId> = forwarded
        .iter()
        .chain([sub_x_x, and_x_0, shr_x_70].iter())
        .map(|&inst| {
            graph
                .add_mul(block, Input::Instr(inst), Input::Imm(1))
                .unwrap()
        })
        .collect();

    let before: Vec<i64> = probes.iter().map(|&p| eval(&graph, p, &[13])).collect();

    assert!(peephole_pass(&mut graph));
    verify_graph(&graph).unwrap();

    // Forwarding rewrites: the probes now read x directly
    for probe in &probes[..forwarded.len()] {
        assert_eq!(graph.instr(*probe).input(0), Input::Instr(x));
    }
    // Constant rewrites: the instruction itself became the constant
    assert_const(&graph, sub_x_x, 0);
    assert_const(&graph, and_x_0, 0);
    assert_const(&graph, shr_x_70, 0);

    // Every consumer computes the same value as before the rewrite
    let after: Vec<i64> = probes.iter().map(|&p| eval(&graph, p, &[13])).collect();
    assert_eq!(before, after);
}

#[test]
fn peephole_handles_duplicate_user_entries() {
    let mut graph = Graph::new(1, vec![Type::Int64]);
    let block = graph.entry();
    let x = graph.add_arg(block, 0).unwrap();
    let sub = graph.add_sub(block, Input::Instr(x), Input::Imm(0)).unwrap();
    // The same consumer reads the def in both slots
    let square = graph
        .add_mul(block, Input::Instr(sub), Input::Instr(sub))
        .unwrap();

    assert!(peephole_pass(&mut graph));

    assert_eq!(
        graph.instr(square).inputs(),
        &[Input::Instr(x), Input::Instr(x)]
    );
    assert_eq!(graph.instr(x).users(), &[square, square]);
    assert!(graph.instr(sub).users().is_empty());
    verify_graph(&graph).unwrap();

    assert_eq!(eval(&graph, square, &[9]), 81);
}

#[test]
fn combined_pipeline() {
    let mut graph = Graph::new(1, vec![Type::Int64]);
    let block = graph.entry();
    let x = graph.add_arg(block, 0).unwrap();
    let p = graph.add_sub(block, Input::Instr(x), Input::Instr(x)).unwrap();
    let c = graph.add_const(block, 10).unwrap();
    let r = graph.add_sub(block, Input::Instr(c), Input::Instr(p)).unwrap();
    let ret = graph.add_ret(block, Input::Instr(r)).unwrap();

    optimize(&mut graph).unwrap();
    verify_graph(&graph).unwrap();

    // p collapsed to zero, and the return reads the constant 10 directly
    assert_const(&graph, p, 0);
    let ret_operand = graph.instr(ret).input(0);
    assert_eq!(ret_operand, Input::Instr(c));
    assert_eq!(as_constant(&graph, ret_operand), Some(10));
    assert_eq!(eval(&graph, ret, &[42]), 10);
}

#[test]
fn optimize_reaches_a_fixpoint() {
    let mut graph = Graph::new(1, vec![Type::Int64]);
    let block = graph.entry();
    let x = graph.add_arg(block, 0).unwrap();
    let v0 = graph.add_const(block, 100).unwrap();
    let v1 = graph.add_sub(block, Input::Instr(v0), Input::Imm(36)).unwrap();
    let v2 = graph.add_shr(block, Input::Instr(v1), Input::Imm(3)).unwrap();
    let masked = graph.add_and(block, Input::Instr(x), Input::Instr(v2)).unwrap();
    let noop = graph.add_sub(block, Input::Instr(masked), Input::Imm(0)).unwrap();
    graph.add_ret(block, Input::Instr(noop)).unwrap();

    optimize(&mut graph).unwrap();
    let first = graph.dump_debug();

    optimize(&mut graph).unwrap();
    let second = graph.dump_debug();

    assert_eq!(first, second);
    verify_graph(&graph).unwrap();
}

#[test]
fn optimizer_preserves_downstream_values() {
    // A little bit of everything: folding feeds the peephole and both
    // rewrite under a live consumer.
    let mut graph = Graph::new(1, vec![Type::Int64]);
    let block = graph.entry();
    let x = graph.add_arg(block, 0).unwrap();
    let c = graph.add_const(block, 8).unwrap();
    let shift = graph.add_shr(block, Input::Instr(c), Input::Imm(3)).unwrap();
    let diff = graph
        .add_sub(block, Input::Instr(x), Input::Instr(shift))
        .unwrap();
    let mask = graph
        .add_and(block, Input::Instr(diff), Input::Imm(-1))
        .unwrap();
    let ret = graph.add_ret(block, Input::Instr(mask)).unwrap();

    let args = [-3, 0, 1, 255, i64::MIN];
    let before: Vec<i64> = args.iter().map(|&a| eval(&graph, ret, &[a])).collect();

    optimize(&mut graph).unwrap();
    verify_graph(&graph).unwrap();

    let after: Vec<i64> = args.iter().map(|&a| eval(&graph, ret, &[a])).collect();
    assert_eq!(before, after);
}

#[test]
fn passes_are_noops_on_empty_graphs() {
    let mut graph = Graph::new(0, vec![]);
    assert!(!constant_folding(&mut graph).unwrap());
    assert!(!peephole_pass(&mut graph));
    optimize(&mut graph).unwrap();
}

#[test]
fn folding_skips_phis_even_with_constant_operands() {
    let mut graph = Graph::new(3, vec![]);
    let (entry, left, join) = (BlockId::new(0), BlockId::new(1), BlockId::new(2));
    graph.add_successor_true(entry, left);
    graph.add_successor_false(entry, join);
    graph.add_successor_true(left, join);

    let c1 = graph.add_const(entry, 4).unwrap();
    let c2 = graph.add_const(left, 4).unwrap();
    let phi = graph.add_phi(join).unwrap();
    graph.add_phi_input(phi, c1, entry).unwrap();
    graph.add_phi_input(phi, c2, left).unwrap();

    optimize(&mut graph).unwrap();

    // Folding across phis is out of scope even when all operands agree
    assert_eq!(graph.instr(phi).opcode(), Opcode::Phi);
    verify_graph(&graph).unwrap();
}

#[test]
fn folding_runs_across_blocks_in_reverse_postorder() {
    // The def sits in the entry, the use downstream; one folding pass must
    // see the folded def when it reaches the use.
    let mut graph = Graph::new(2, vec![]);
    let (entry, exit) = (BlockId::new(0), BlockId::new(1));
    graph.add_successor_true(entry, exit);

    let c = graph.add_const(entry, 32).unwrap();
    let upstream = graph.add_sub(entry, Input::Instr(c), Input::Imm(2)).unwrap();
    let downstream = graph
        .add_sub(exit, Input::Instr(upstream), Input::Imm(10))
        .unwrap();

    assert!(constant_folding(&mut graph).unwrap());
    assert_const(&graph, upstream, 30);
    assert_const(&graph, downstream, 20);
    verify_graph(&graph).unwrap();
}
