//! The language-neutral SSA intermediate representation (NIR).
//!
//! A [`Program`] owns two arenas, one of [`Block`]s and one of [`Inst`]s;
//! entities refer to each other by [`BlockRef`] and [`InstRef`] handles.
//! Values, side-effecting statements, and terminators share the flat
//! [`InstKind`] union; SSA def-use edges are bidirectional and maintained
//! exclusively by the program's gate functions.
//!
//! Construction happens in two phases: [`Program::build`] lowers the token
//! stream block by block through the abstract [`StackFrame`], and
//! [`Program::connect`] wires up entry, caller, and return sets while
//! detecting call-stack underflow and trimming unreachable blocks.

mod block;
mod builder;
mod connect;
mod display;
mod dot;
mod inst;
mod program;
mod stack;

pub use self::{
    block::{Block, BlockRef, Label},
    display::DisplayProgram,
    dot::dot_graph,
    inst::{
        BinaryOp, CondOp, Inst, InstKind, InstRef, JmpOp, PhiArg, PrintOp, ReadOp, UnaryOp, Use,
    },
    program::Program,
    stack::{FrameEffects, StackFrame},
};
