use crate::{
    analysis::{Digraph, Graph},
    ir::{BinaryOp, BlockRef, InstKind, InstRef, Program},
};
use std::collections::HashMap;

/// Returns `true` if `a` and `b` must keep their relative order.
///
/// Two instructions are dependent iff both perform I/O, one performs I/O
/// and the other can trap, or one uses the other's value. The relation is
/// reflexive and symmetric; it seeds the undirected scheduling graph of a
/// block.
pub fn dependent(program: &Program, a: InstRef, b: InstRef) -> bool {
    if a == b {
        return true;
    }
    let a_io = program.kind(a).is_io();
    let b_io = program.kind(b).is_io();
    if a_io && b_io {
        return true;
    }
    if (a_io && can_trap(program, b)) || (b_io && can_trap(program, a)) {
        return true;
    }
    uses(program, a, b) || uses(program, b, a)
}

/// Returns `true` if the instruction can trap at run time.
///
/// Currently only a division whose right operand is not a constant.
fn can_trap(program: &Program, inst: InstRef) -> bool {
    match program.kind(inst) {
        InstKind::Binary {
            op: BinaryOp::Div,
            args,
        } => program.as_const(args[1]).is_none(),
        _ => false,
    }
}

/// Returns `true` if `user` references the value of `def` in any operand
/// slot.
fn uses(program: &Program, user: InstRef, def: InstRef) -> bool {
    let kind = program.kind(user);
    (0..kind.operand_count()).any(|index| kind.operand(index) == def)
}

/// Builds the undirected dependence graph over a block's instructions.
///
/// Nodes are body indices; edges connect every dependent pair. The
/// reflexive self edges are left implicit.
pub fn block_dependence(program: &Program, block: BlockRef) -> Graph {
    let body = program.block(block).body();
    let mut graph = Graph::new(body.len());
    for (a_index, a) in body.iter().enumerate() {
        for (b_index, b) in body.iter().enumerate().skip(a_index + 1) {
            if dependent(program, *a, *b) {
                graph.add_edge(a_index, b_index);
            }
        }
    }
    graph
}

/// Builds the directed control-flow graph over the live blocks.
///
/// Nodes are positions in the program's block order; edges go from every
/// block to the targets of its terminator, including both the callee and
/// the fall-through block of a call.
pub fn flow_graph(program: &Program) -> Digraph {
    let order = program.block_order();
    let index_of: HashMap<BlockRef, usize> = order
        .iter()
        .enumerate()
        .map(|(index, block)| (*block, index))
        .collect();
    let mut graph = Digraph::new(order.len());
    for (from, block) in order.iter().enumerate() {
        let Some(term) = program.block(*block).terminator() else {
            continue;
        };
        for succ in program.kind(term).successors() {
            if let Some(to) = index_of.get(&succ) {
                graph.add_edge(from, *to);
            }
        }
    }
    graph
}
