//! Intraprocedural analyses over the SSA program.

mod dependence;
mod graph;

pub use self::{
    dependence::{block_dependence, dependent, flow_graph},
    graph::{BitMatrix, Digraph, Graph},
};
