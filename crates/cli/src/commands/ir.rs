use crate::utils;
use anyhow::Result;
use clap::Args;
use std::{path::PathBuf, process::ExitCode};
use wsc::{ir::Program, passes};

/// Prints the SSA intermediate representation of a program.
#[derive(Debug, Args)]
pub struct IrCommand {
    /// The Whitespace source file (`.ws` or bit-packed `.wsx`).
    file: PathBuf,
    /// Skip constant folding and print concatenation.
    #[arg(long)]
    no_fold: bool,
}

impl IrCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let tokens = utils::lex_program(&self.file)?;
        let (mut program, mut errors) = Program::build(&tokens);
        if let Err(underflow) = program.connect() {
            errors.push(underflow.into());
        }
        if !self.no_fold {
            passes::optimize(&mut program);
        }
        print!("{}", program.display());
        if errors.is_empty() {
            Ok(ExitCode::SUCCESS)
        } else {
            utils::report_errors(&tokens, &errors);
            Ok(ExitCode::FAILURE)
        }
    }
}
