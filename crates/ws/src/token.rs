use core::fmt::{self, Display};
use std::rc::Rc;
use wsc_core::{Int, Pos, SourceFile};

/// The kind of a Whitespace instruction token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Push a number onto the stack.
    Push,
    /// Duplicate the top of the stack.
    Dup,
    /// Copy the n-th stack item onto the top.
    Copy,
    /// Swap the top two stack items.
    Swap,
    /// Discard the top of the stack.
    Drop,
    /// Discard n items beneath the top, keeping the top.
    Slide,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Store a value into the heap.
    Store,
    /// Load a value from the heap.
    Retrieve,
    /// Mark a location with a label.
    Label,
    /// Call a subroutine.
    Call,
    /// Unconditional jump.
    Jmp,
    /// Jump if the top of the stack is zero.
    Jz,
    /// Jump if the top of the stack is negative.
    Jn,
    /// Return from a subroutine.
    Ret,
    /// End the program.
    End,
    /// Print the top of the stack as a character.
    Printc,
    /// Print the top of the stack as a number.
    Printi,
    /// Read a character into the heap.
    Readc,
    /// Read a number into the heap.
    Readi,
}

impl TokenKind {
    /// Returns `true` if the kind is a stack manipulation instruction.
    pub fn is_stack(self) -> bool {
        matches!(
            self,
            Self::Push | Self::Dup | Self::Copy | Self::Swap | Self::Drop | Self::Slide
        )
    }

    /// Returns `true` if the kind is an arithmetic instruction.
    pub fn is_arith(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }

    /// Returns `true` if the kind is a heap access instruction.
    pub fn is_heap(self) -> bool {
        matches!(self, Self::Store | Self::Retrieve)
    }

    /// Returns `true` if the kind is a control flow instruction.
    pub fn is_flow(self) -> bool {
        matches!(
            self,
            Self::Label | Self::Call | Self::Jmp | Self::Jz | Self::Jn | Self::Ret | Self::End
        )
    }

    /// Returns `true` if the kind is an I/O instruction.
    pub fn is_io(self) -> bool {
        matches!(
            self,
            Self::Printc | Self::Printi | Self::Readc | Self::Readi
        )
    }

    /// Returns `true` if tokens of this kind carry an argument.
    ///
    /// `push`, `copy`, and `slide` carry a signed number; `label`, `call`,
    /// `jmp`, `jz`, and `jn` carry an unsigned label.
    pub fn has_arg(self) -> bool {
        matches!(
            self,
            Self::Push
                | Self::Copy
                | Self::Slide
                | Self::Label
                | Self::Call
                | Self::Jmp
                | Self::Jz
                | Self::Jn
        )
    }

    /// Returns `true` if the argument of this kind is an unsigned label id.
    pub fn has_label_arg(self) -> bool {
        matches!(
            self,
            Self::Label | Self::Call | Self::Jmp | Self::Jz | Self::Jn
        )
    }

    /// Returns `true` if the kind unconditionally ends a basic block.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Self::Call | Self::Jmp | Self::Jz | Self::Jn | Self::Ret | Self::End
        )
    }

    /// Returns the assembly mnemonic of the kind.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Dup => "dup",
            Self::Copy => "copy",
            Self::Swap => "swap",
            Self::Drop => "drop",
            Self::Slide => "slide",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Store => "store",
            Self::Retrieve => "retrieve",
            Self::Label => "label",
            Self::Call => "call",
            Self::Jmp => "jmp",
            Self::Jz => "jz",
            Self::Jn => "jn",
            Self::Ret => "ret",
            Self::End => "end",
            Self::Printc => "printc",
            Self::Printi => "printi",
            Self::Readc => "readc",
            Self::Readi => "readi",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single Whitespace instruction token.
#[derive(Debug, Clone)]
pub struct Token {
    /// The instruction kind.
    pub kind: TokenKind,
    /// The argument, present iff [`TokenKind::has_arg`].
    pub arg: Option<Rc<Int>>,
    /// Optional human-readable argument text from the `.map` sidecar.
    pub arg_string: Option<Rc<str>>,
    /// Position of the first significant character of the token.
    pub start: Pos,
    /// Position one past the last significant character of the token.
    pub end: Pos,
}

impl Token {
    /// Creates a token without an argument.
    pub fn new(kind: TokenKind, start: Pos, end: Pos) -> Self {
        debug_assert!(!kind.has_arg());
        Self {
            kind,
            arg: None,
            arg_string: None,
            start,
            end,
        }
    }

    /// Creates a token with an argument.
    pub fn with_arg(kind: TokenKind, arg: Rc<Int>, start: Pos, end: Pos) -> Self {
        debug_assert!(kind.has_arg());
        Self {
            kind,
            arg: Some(arg),
            arg_string: None,
            start,
            end,
        }
    }

    /// Returns the argument of the token.
    ///
    /// # Panics
    ///
    /// If the token kind carries no argument; the lexer guarantees the
    /// argument is present for every kind with [`TokenKind::has_arg`].
    pub fn arg(&self) -> &Rc<Int> {
        self.arg
            .as_ref()
            .unwrap_or_else(|| panic!("token `{}` carries no argument", self.kind))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.mnemonic())?;
        if let Some(name) = &self.arg_string {
            write!(f, " {name}")?;
        } else if let Some(arg) = &self.arg {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A tokenized Whitespace program with its source file.
#[derive(Debug, Clone)]
pub struct TokenProgram {
    /// The source file the tokens were scanned from.
    pub file: Rc<SourceFile>,
    /// The scanned tokens in source order.
    pub tokens: Vec<Token>,
}

impl TokenProgram {
    /// Creates a [`TokenProgram`] from a file and its tokens.
    pub fn new(file: Rc<SourceFile>, tokens: Vec<Token>) -> Self {
        Self { file, tokens }
    }

    /// Attaches human label names to every token with a label argument.
    pub fn apply_names(&mut self, names: &crate::LabelNames) {
        for token in &mut self.tokens {
            if !token.kind.has_label_arg() {
                continue;
            }
            if let Some(arg) = &token.arg {
                if let Some(name) = names.get(arg) {
                    token.arg_string = Some(name.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TokenKind;

    #[test]
    fn groups_partition_the_kinds() {
        use TokenKind::*;
        let all = [
            Push, Dup, Copy, Swap, Drop, Slide, Add, Sub, Mul, Div, Mod, Store, Retrieve, Label,
            Call, Jmp, Jz, Jn, Ret, End, Printc, Printi, Readc, Readi,
        ];
        for kind in all {
            let groups = [
                kind.is_stack(),
                kind.is_arith(),
                kind.is_heap(),
                kind.is_flow(),
                kind.is_io(),
            ];
            assert_eq!(
                groups.iter().filter(|g| **g).count(),
                1,
                "{kind} must be in exactly one group"
            );
        }
    }

    #[test]
    fn has_arg_matches_the_argument_kinds() {
        use TokenKind::*;
        for kind in [Push, Copy, Slide, Label, Call, Jmp, Jz, Jn] {
            assert!(kind.has_arg(), "{kind}");
        }
        for kind in [Dup, Swap, Drop, Add, Store, Ret, End, Printc, Readi] {
            assert!(!kind.has_arg(), "{kind}");
        }
    }
}
