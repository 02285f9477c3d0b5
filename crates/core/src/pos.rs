use core::fmt::{self, Display};

/// An opaque source position: a byte offset into the source file.
///
/// Every token, instruction, and value carries a [`Pos`]; the owning
/// [`SourceFile`] renders it as `filename:line:column`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos(u32);

impl Pos {
    /// Creates a [`Pos`] from a byte offset.
    pub fn new(offset: usize) -> Self {
        let offset: u32 = offset
            .try_into()
            .unwrap_or_else(|err| panic!("source offset exceeds u32: {err}"));
        Self(offset)
    }

    /// Returns the byte offset of the position.
    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

/// A resolved line and column, both 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// A source file with its line index.
///
/// Resolves [`Pos`] values to [`Location`]s. The line index is computed once
/// at construction from the raw source bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    /// Creates a [`SourceFile`] from its name and contents.
    pub fn new(name: impl Into<String>, text: &[u8]) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self {
            name: name.into(),
            line_starts,
        }
    }

    /// Returns the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves `pos` to its 1-based line and column.
    pub fn location(&self, pos: Pos) -> Location {
        let offset = pos.0;
        let line = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        Location {
            line: line as u32 + 1,
            column: offset - self.line_starts[line] + 1,
        }
    }

    /// Renders `pos` as `filename:line:column`.
    pub fn display_pos(&self, pos: Pos) -> DisplayPos<'_> {
        DisplayPos { file: self, pos }
    }
}

/// Displays a [`Pos`] as `filename:line:column`.
#[derive(Debug)]
pub struct DisplayPos<'a> {
    file: &'a SourceFile,
    pos: Pos,
}

impl Display for DisplayPos<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.file.location(self.pos);
        write!(
            f,
            "{}:{}:{}",
            self.file.name(),
            location.line,
            location.column
        )
    }
}
