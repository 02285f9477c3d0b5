use anyhow::{bail, Context, Result};
use std::{fs, path::Path, rc::Rc};
use wsc_core::SourceFile;
use wsc_ws::TokenProgram;

/// Reads Whitespace source from `path`.
///
/// A `.wsx` file is unpacked from the bit-packed format first, so every
/// command accepts both encodings.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read `{}`", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "wsx") {
        return wsc_ws::unpack(&bytes)
            .with_context(|| format!("failed to unpack `{}`", path.display()));
    }
    Ok(bytes)
}

/// Lexes `path` into a token program, applying the `.map` sidecar if one
/// exists next to the source file.
pub fn lex_program(path: &Path) -> Result<TokenProgram> {
    let source = read_source(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = Rc::new(SourceFile::new(name, &source));
    let mut tokens = match wsc_ws::lex(file.clone(), &source) {
        Ok(tokens) => tokens,
        Err(error) => {
            bail!("{}: {error}", file.display_pos(error.pos));
        }
    };
    let sidecar = path.with_extension("map");
    if sidecar.exists() {
        let text = fs::read_to_string(&sidecar)
            .with_context(|| format!("failed to read `{}`", sidecar.display()))?;
        let names = wsc_ws::parse_source_map(&text)
            .map_err(|error| anyhow::anyhow!("{}: {error}", sidecar.display()))?;
        tokens.apply_names(&names);
    }
    Ok(tokens)
}

/// Prints collected compile errors to stderr, with source positions where
/// available.
pub fn report_errors(tokens: &TokenProgram, errors: &[wsc::Error]) {
    for error in errors {
        match error.pos() {
            Some(pos) => eprintln!("{}: {error}", tokens.file.display_pos(pos)),
            None => eprintln!("{}: {error}", tokens.file.name()),
        }
    }
}
