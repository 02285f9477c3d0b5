use core::fmt::{self, Display};
use std::rc::Rc;
use wsc_core::{Int, IntMap};

/// Human label names parsed from a `.map` sidecar, keyed by label id.
pub type LabelNames = IntMap<Rc<str>>;

/// An error raised while parsing a `.map` sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapError {
    /// The kind of the error.
    pub kind: SourceMapErrorKind,
    /// The 1-based line the error was found on.
    pub line: usize,
}

/// The kind of a [`SourceMapError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMapErrorKind {
    /// A line without the `<label>:<name>` shape.
    MalformedLine,
    /// A label id that is not a decimal number.
    MalformedLabel(String),
    /// The same label id mapped twice.
    DuplicateLabel(Rc<Int>),
}

impl core::error::Error for SourceMapError {}

impl Display for SourceMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SourceMapErrorKind::MalformedLine => {
                write!(f, "line {}: expected `<label>:<name>`", self.line)
            }
            SourceMapErrorKind::MalformedLabel(text) => {
                write!(f, "line {}: malformed label `{text}`", self.line)
            }
            SourceMapErrorKind::DuplicateLabel(label) => {
                write!(f, "line {}: duplicate label {label}", self.line)
            }
        }
    }
}

/// Parses a `.map` sidecar: lines of the form `<decimal-label>:<name>`.
///
/// Empty lines are ignored. Duplicate labels are an error.
///
/// # Errors
///
/// If a line is malformed or maps a label twice.
pub fn parse_source_map(text: &str) -> Result<LabelNames, SourceMapError> {
    let mut names = LabelNames::new();
    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if line.is_empty() {
            continue;
        }
        let Some((label, name)) = line.split_once(':') else {
            return Err(SourceMapError {
                kind: SourceMapErrorKind::MalformedLine,
                line: line_no,
            });
        };
        let label: Int = label.parse().map_err(|_| SourceMapError {
            kind: SourceMapErrorKind::MalformedLabel(label.to_string()),
            line: line_no,
        })?;
        if label.is_negative() {
            return Err(SourceMapError {
                kind: SourceMapErrorKind::MalformedLabel(label.to_string()),
                line: line_no,
            });
        }
        let label = Rc::new(label);
        if names.has(&label) {
            return Err(SourceMapError {
                kind: SourceMapErrorKind::DuplicateLabel(label),
                line: line_no,
            });
        }
        names.put(label, Rc::from(name));
    }
    Ok(names)
}
