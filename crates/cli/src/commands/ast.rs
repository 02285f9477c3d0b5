use crate::utils;
use anyhow::Result;
use clap::Args;
use std::{path::PathBuf, process::ExitCode};

/// Prints the token listing of a program, one mnemonic per line.
#[derive(Debug, Args)]
pub struct AstCommand {
    /// The Whitespace source file (`.ws` or bit-packed `.wsx`).
    file: PathBuf,
}

impl AstCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let tokens = utils::lex_program(&self.file)?;
        for token in &tokens.tokens {
            println!("{token}");
        }
        Ok(ExitCode::SUCCESS)
    }
}
