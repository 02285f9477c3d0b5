use crate::utils;
use anyhow::{Context, Result};
use clap::Args;
use std::{fs, path::PathBuf, process::ExitCode};

/// Encodes Whitespace source into the bit-packed format.
#[derive(Debug, Args)]
pub struct PackCommand {
    /// The Whitespace source file.
    file: PathBuf,
    /// Read the source as visible `S`/`T`/`L` letters.
    #[arg(long)]
    ascii: bool,
    /// The output file; defaults to the input with a `.wsx` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl PackCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let source = if self.ascii {
            let text = fs::read_to_string(&self.file)
                .with_context(|| format!("failed to read `{}`", self.file.display()))?;
            wsc_ws::from_visible(&text)
        } else {
            utils::read_source(&self.file)?
        };
        let packed = wsc_ws::pack(&source);
        let output = self
            .output
            .unwrap_or_else(|| self.file.with_extension("wsx"));
        fs::write(&output, packed)
            .with_context(|| format!("failed to write `{}`", output.display()))?;
        Ok(ExitCode::SUCCESS)
    }
}
