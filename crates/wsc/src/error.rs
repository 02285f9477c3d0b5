use crate::ir::BlockRef;
use core::fmt::{self, Display};
use std::rc::Rc;
use wsc_core::{Int, Pos};
use wsc_ws::TokenKind;

/// The root error type of the compiler core.
///
/// Non-fatal errors are collected into a list while compilation continues,
/// so as many errors as possible are reported per invocation. The driver
/// decides which of them abort the pipeline.
#[derive(Debug)]
pub struct Error {
    kind: Box<ErrorKind>,
}

impl Error {
    /// Creates a new [`Error`] from the [`ErrorKind`].
    #[cold]
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns the [`ErrorKind`] of the [`Error`].
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the source position of the error if it has one.
    pub fn pos(&self) -> Option<Pos> {
        match &*self.kind {
            ErrorKind::Token(error) => Some(error.pos),
            ErrorKind::RetUnderflow(_) => None,
        }
    }
}

impl core::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Token(error) => error.fmt(f),
            ErrorKind::RetUnderflow(error) => error.fmt(f),
        }
    }
}

impl From<TokenError> for Error {
    fn from(error: TokenError) -> Self {
        Self::from_kind(ErrorKind::Token(error))
    }
}

impl From<RetUnderflowError> for Error {
    fn from(error: RetUnderflowError) -> Self {
        Self::from_kind(ErrorKind::RetUnderflow(error))
    }
}

/// The kinds of errors the compiler core reports.
#[derive(Debug)]
pub enum ErrorKind {
    /// An error attached to a single token.
    Token(TokenError),
    /// Reachable `ret` instructions without a caller.
    RetUnderflow(RetUnderflowError),
}

/// An error attached to a single token of the source program.
#[derive(Debug, Clone)]
pub struct TokenError {
    /// What is wrong with the token.
    pub kind: TokenErrorKind,
    /// The kind of the offending token.
    pub token: TokenKind,
    /// The start position of the offending token.
    pub pos: Pos,
}

/// The kind of a [`TokenError`].
#[derive(Debug, Clone)]
pub enum TokenErrorKind {
    /// The same label is defined more than once.
    LabelNotUnique { label: Rc<Int> },
    /// A flow instruction targets a label that is never defined.
    LabelDoesNotExist { label: Rc<Int> },
    /// A `copy` or `slide` argument is negative.
    ArgumentNegative { arg: Rc<Int> },
    /// A `copy` or `slide` argument does not fit the address space.
    ArgumentOverflow { arg: Rc<Int> },
}

impl core::error::Error for TokenError {}

impl Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenErrorKind::LabelNotUnique { label } => {
                write!(f, "label is not unique: {label}")
            }
            TokenErrorKind::LabelDoesNotExist { label } => {
                write!(f, "label does not exist: {label}")
            }
            TokenErrorKind::ArgumentNegative { arg } => {
                write!(f, "argument of `{}` is negative: {arg}", self.token)
            }
            TokenErrorKind::ArgumentOverflow { arg } => {
                write!(f, "argument of `{}` overflows: {arg}", self.token)
            }
        }
    }
}

/// Reachable `ret` instructions that can run with an empty call stack.
///
/// Each trace is the path of blocks from the offending `ret` back toward
/// the program entry, one block per step of the control-flow traversal that
/// discovered it. The error is non-fatal: code generation can proceed and
/// guard the offending paths at run time.
#[derive(Debug, Default)]
pub struct RetUnderflowError {
    /// One trace per offending `ret`, ordered by discovery.
    pub traces: Vec<Vec<BlockRef>>,
}

impl RetUnderflowError {
    /// Returns `true` if no underflow was found.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

impl core::error::Error for RetUnderflowError {}

impl Display for RetUnderflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call stack underflow:")?;
        for trace in &self.traces {
            write!(f, " [")?;
            for (step, block) in trace.iter().enumerate() {
                if step > 0 {
                    write!(f, " <- ")?;
                }
                write!(f, "block_{}", block.index())?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
