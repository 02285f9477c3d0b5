use crate::utils;
use anyhow::Result;
use clap::{Args, ValueEnum};
use std::{path::PathBuf, process::ExitCode};
use wsc::{analysis, ir::Program, passes};

/// Prints the control-flow graph of a program.
#[derive(Debug, Args)]
pub struct GraphCommand {
    /// The Whitespace source file (`.ws` or bit-packed `.wsx`).
    file: PathBuf,
    /// The output format.
    #[arg(long, value_enum, default_value = "dot")]
    format: Format,
    /// Skip constant folding and print concatenation.
    #[arg(long)]
    no_fold: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Graphviz DOT output.
    Dot,
    /// A plain successor listing.
    Text,
}

impl GraphCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let tokens = utils::lex_program(&self.file)?;
        let (mut program, mut errors) = Program::build(&tokens);
        if let Err(underflow) = program.connect() {
            errors.push(underflow.into());
        }
        if !self.no_fold {
            passes::optimize(&mut program);
        }
        match self.format {
            Format::Dot => print!("{}", wsc::ir::dot_graph(&program)),
            Format::Text => {
                let graph = analysis::flow_graph(&program);
                let order = program.block_order();
                for (index, block) in order.iter().enumerate() {
                    let successors: Vec<String> = graph
                        .successors(index)
                        .map(|succ| program.block(order[succ]).display_name())
                        .collect();
                    println!(
                        "{} -> {}",
                        program.block(*block).display_name(),
                        successors.join(" ")
                    );
                }
            }
        }
        if errors.is_empty() {
            Ok(ExitCode::SUCCESS)
        } else {
            utils::report_errors(&tokens, &errors);
            Ok(ExitCode::FAILURE)
        }
    }
}
