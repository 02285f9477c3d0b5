use crate::ir::{InstKind, JmpOp, Program};
use core::fmt::Write as _;

/// Renders the control-flow graph of a [`Program`] in DOT format.
///
/// Nodes are keyed by block id and labeled with the block display name;
/// call terminators contribute a `call` edge to the callee and a `ret`
/// edge to the fall-through block, and implicit fallthrough edges render
/// dashed.
pub fn dot_graph(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", program.name());
    for (block, data) in program.blocks() {
        let _ = writeln!(
            out,
            "    b{} [label=\"{}\"];",
            block.index(),
            data.display_name()
        );
    }
    for (block, data) in program.blocks() {
        let Some(term) = data.terminator() else {
            continue;
        };
        match *program.kind(term) {
            InstKind::Call { callee, next } => {
                let _ = writeln!(
                    out,
                    "    b{} -> b{} [label=\"call\"];",
                    block.index(),
                    callee.index()
                );
                let _ = writeln!(
                    out,
                    "    b{} -> b{} [label=\"ret\"];",
                    block.index(),
                    next.index()
                );
            }
            InstKind::Jmp { op, dest } => {
                let style = match op {
                    JmpOp::Jmp => "",
                    JmpOp::Fallthrough => " [style=dashed]",
                };
                let _ = writeln!(out, "    b{} -> b{}{style};", block.index(), dest.index());
            }
            InstKind::JmpCond {
                op,
                then_dest,
                else_dest,
                ..
            } => {
                let _ = writeln!(
                    out,
                    "    b{} -> b{} [label=\"{op}\"];",
                    block.index(),
                    then_dest.index()
                );
                let _ = writeln!(
                    out,
                    "    b{} -> b{} [label=\"else\"];",
                    block.index(),
                    else_dest.index()
                );
            }
            _ => {}
        }
    }
    out.push_str("}\n");
    out
}
