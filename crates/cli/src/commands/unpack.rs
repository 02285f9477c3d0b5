use anyhow::{Context, Result};
use clap::Args;
use std::{fs, path::PathBuf, process::ExitCode};

/// Decodes a bit-packed file back into Whitespace source.
#[derive(Debug, Args)]
pub struct UnpackCommand {
    /// The bit-packed `.wsx` file.
    file: PathBuf,
    /// Write the source as visible `S`/`T`/`L` letters.
    #[arg(long)]
    ascii: bool,
    /// The output file; defaults to the input with a `.ws` extension.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl UnpackCommand {
    pub fn execute(self) -> Result<ExitCode> {
        let packed = fs::read(&self.file)
            .with_context(|| format!("failed to read `{}`", self.file.display()))?;
        let source = wsc_ws::unpack(&packed)
            .with_context(|| format!("failed to unpack `{}`", self.file.display()))?;
        let output = self.output.unwrap_or_else(|| self.file.with_extension("ws"));
        if self.ascii {
            fs::write(&output, wsc_ws::to_visible(&source))
                .with_context(|| format!("failed to write `{}`", output.display()))?;
        } else {
            fs::write(&output, source)
                .with_context(|| format!("failed to write `{}`", output.display()))?;
        }
        Ok(ExitCode::SUCCESS)
    }
}
