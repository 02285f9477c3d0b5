mod ast;
mod graph;
mod ir;
mod pack;
mod unpack;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// The Whitespace compiler.
#[derive(Debug, Parser)]
#[command(name = "wsc", version, about = "Whitespace compiler", long_about = None)]
pub struct WscApp {
    #[command(subcommand)]
    command: Command,
}

impl WscApp {
    /// Executes the chosen subcommand.
    pub fn execute(self) -> Result<ExitCode> {
        match self.command {
            Command::Pack(command) => command.execute(),
            Command::Unpack(command) => command.execute(),
            Command::Ast(command) => command.execute(),
            Command::Ir(command) => command.execute(),
            Command::Graph(command) => command.execute(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode Whitespace source into the bit-packed format.
    Pack(pack::PackCommand),
    /// Decode a bit-packed file back into Whitespace source.
    Unpack(unpack::UnpackCommand),
    /// Print the token listing of a program.
    Ast(ast::AstCommand),
    /// Print the SSA intermediate representation of a program.
    Ir(ir::IrCommand),
    /// Print the control-flow graph of a program.
    Graph(graph::GraphCommand),
}
