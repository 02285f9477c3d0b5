use crate::{Token, TokenKind, TokenProgram};
use core::fmt::{self, Display};
use std::rc::Rc;
use wsc_core::{Int, Pos, SourceFile};

/// A syntactic error raised while scanning Whitespace source.
///
/// Lexical errors are fatal at the front-end boundary; the IR builder never
/// sees a partially scanned program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// Where it went wrong.
    pub pos: Pos,
}

/// The kind of a [`LexError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// The source ended in the middle of an instruction or argument.
    UnexpectedEof,
    /// An instruction encoding that is not part of the prefix tree.
    UnrecognizedOpcode(String),
    /// A number argument started with `lf` instead of a sign.
    MissingSign,
}

impl core::error::Error for LexError {}

impl Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnexpectedEof => {
                write!(f, "unexpected end of source inside an instruction")
            }
            LexErrorKind::UnrecognizedOpcode(seq) => {
                write!(f, "unrecognized instruction encoding `{seq}`")
            }
            LexErrorKind::MissingSign => write!(f, "number argument is missing its sign"),
        }
    }
}

/// One significant source character.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Stl {
    S,
    T,
    L,
}

impl Stl {
    fn letter(self) -> char {
        match self {
            Self::S => 'S',
            Self::T => 'T',
            Self::L => 'L',
        }
    }
}

/// Scans Whitespace source bytes into a [`TokenProgram`].
///
/// Space, tab, and line feed are significant; every other byte is ignored
/// and never counted in token positions.
///
/// # Errors
///
/// If the source ends inside an instruction or argument, or an encoding is
/// not part of the instruction prefix tree.
pub fn lex(file: Rc<SourceFile>, src: &[u8]) -> Result<TokenProgram, LexError> {
    let mut lexer = Lexer {
        src,
        offset: 0,
        end: 0,
        start: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(TokenProgram::new(file, tokens))
}

struct Lexer<'a> {
    src: &'a [u8],
    /// The scan cursor.
    offset: usize,
    /// One past the last significant character consumed.
    end: usize,
    /// Offset of the first significant character of the current token.
    start: usize,
}

impl Lexer<'_> {
    /// Consumes the next significant character if any.
    fn bump(&mut self) -> Option<Stl> {
        while let Some(byte) = self.src.get(self.offset) {
            self.offset += 1;
            let stl = match byte {
                b' ' => Stl::S,
                b'\t' => Stl::T,
                b'\n' => Stl::L,
                _ => continue,
            };
            self.end = self.offset;
            return Some(stl);
        }
        None
    }

    /// Consumes the next significant character of an already started token.
    fn expect(&mut self) -> Result<Stl, LexError> {
        self.bump().ok_or(LexError {
            kind: LexErrorKind::UnexpectedEof,
            pos: Pos::new(self.end),
        })
    }

    fn unrecognized<T>(&self, seq: &[Stl]) -> Result<T, LexError> {
        Err(LexError {
            kind: LexErrorKind::UnrecognizedOpcode(seq.iter().map(|stl| stl.letter()).collect()),
            pos: Pos::new(self.start),
        })
    }

    /// Scans the next token, or `None` at a clean end of source.
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let Some(first) = self.bump() else {
            return Ok(None);
        };
        self.start = self.end - 1;
        let kind = match first {
            Stl::S => match self.expect()? {
                Stl::S => TokenKind::Push,
                Stl::T => match self.expect()? {
                    Stl::S => TokenKind::Copy,
                    Stl::L => TokenKind::Slide,
                    Stl::T => return self.unrecognized(&[Stl::S, Stl::T, Stl::T]),
                },
                Stl::L => match self.expect()? {
                    Stl::S => TokenKind::Dup,
                    Stl::T => TokenKind::Swap,
                    Stl::L => TokenKind::Drop,
                },
            },
            Stl::T => match self.expect()? {
                Stl::S => match self.expect()? {
                    Stl::S => match self.expect()? {
                        Stl::S => TokenKind::Add,
                        Stl::T => TokenKind::Sub,
                        Stl::L => TokenKind::Mul,
                    },
                    Stl::T => match self.expect()? {
                        Stl::S => TokenKind::Div,
                        Stl::T => TokenKind::Mod,
                        Stl::L => return self.unrecognized(&[Stl::T, Stl::S, Stl::T, Stl::L]),
                    },
                    Stl::L => return self.unrecognized(&[Stl::T, Stl::S, Stl::L]),
                },
                Stl::T => match self.expect()? {
                    Stl::S => TokenKind::Store,
                    Stl::T => TokenKind::Retrieve,
                    Stl::L => return self.unrecognized(&[Stl::T, Stl::T, Stl::L]),
                },
                Stl::L => match self.expect()? {
                    Stl::S => match self.expect()? {
                        Stl::S => TokenKind::Printc,
                        Stl::T => TokenKind::Printi,
                        Stl::L => return self.unrecognized(&[Stl::T, Stl::L, Stl::S, Stl::L]),
                    },
                    Stl::T => match self.expect()? {
                        Stl::S => TokenKind::Readc,
                        Stl::T => TokenKind::Readi,
                        Stl::L => return self.unrecognized(&[Stl::T, Stl::L, Stl::T, Stl::L]),
                    },
                    Stl::L => return self.unrecognized(&[Stl::T, Stl::L, Stl::L]),
                },
            },
            Stl::L => match self.expect()? {
                Stl::S => match self.expect()? {
                    Stl::S => TokenKind::Label,
                    Stl::T => TokenKind::Call,
                    Stl::L => TokenKind::Jmp,
                },
                Stl::T => match self.expect()? {
                    Stl::S => TokenKind::Jz,
                    Stl::T => TokenKind::Jn,
                    Stl::L => TokenKind::Ret,
                },
                Stl::L => match self.expect()? {
                    Stl::L => TokenKind::End,
                    other => return self.unrecognized(&[Stl::L, Stl::L, other]),
                },
            },
        };
        let token = if kind.has_arg() {
            let arg = if kind.has_label_arg() {
                self.label()?
            } else {
                self.number()?
            };
            Token::with_arg(kind, arg, Pos::new(self.start), Pos::new(self.end))
        } else {
            Token::new(kind, Pos::new(self.start), Pos::new(self.end))
        };
        Ok(Some(token))
    }

    /// Scans a signed number: a sign, binary digits, then `lf`.
    fn number(&mut self) -> Result<Rc<Int>, LexError> {
        let negative = match self.expect()? {
            Stl::S => false,
            Stl::T => true,
            Stl::L => {
                return Err(LexError {
                    kind: LexErrorKind::MissingSign,
                    pos: Pos::new(self.end - 1),
                })
            }
        };
        let bits = self.bits()?;
        Ok(Rc::new(Int::from_bits(negative, bits)))
    }

    /// Scans an unsigned label: binary digits, then `lf`.
    fn label(&mut self) -> Result<Rc<Int>, LexError> {
        let bits = self.bits()?;
        Ok(Rc::new(Int::from_bits(false, bits)))
    }

    /// Scans binary digits up to and including the terminating `lf`.
    fn bits(&mut self) -> Result<Vec<bool>, LexError> {
        let mut bits = Vec::new();
        loop {
            match self.expect()? {
                Stl::S => bits.push(false),
                Stl::T => bits.push(true),
                Stl::L => return Ok(bits),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{lex, LexErrorKind};
    use crate::TokenKind;
    use assert_matches::assert_matches;
    use std::rc::Rc;
    use wsc_core::{Int, SourceFile};

    fn kinds_of(src: &str) -> Vec<TokenKind> {
        let file = Rc::new(SourceFile::new("test.ws", src.as_bytes()));
        lex(file, src.as_bytes())
            .unwrap()
            .tokens
            .iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn scans_push_printc_end() {
        let src = "   \t\n\t\n  \n\n\n";
        let file = Rc::new(SourceFile::new("test.ws", src.as_bytes()));
        let program = lex(file, src.as_bytes()).unwrap();
        let kinds: Vec<_> = program.tokens.iter().map(|token| token.kind).collect();
        assert_eq!(kinds, [TokenKind::Push, TokenKind::Printc, TokenKind::End]);
        assert_eq!(**program.tokens[0].arg(), Int::from(1i64));
        assert_eq!(program.tokens[0].start.offset(), 0);
        assert_eq!(program.tokens[0].end.offset(), 5);
    }

    #[test]
    fn ignores_insignificant_bytes() {
        // Comment characters interleave freely with the encoding of push 1.
        let noisy = " x x \tq\n";
        let file = Rc::new(SourceFile::new("test.ws", noisy.as_bytes()));
        let program = lex(file, noisy.as_bytes()).unwrap();
        assert_eq!(program.tokens.len(), 1);
        let token = &program.tokens[0];
        assert_eq!(token.kind, TokenKind::Push);
        assert_eq!(**token.arg(), Int::from(1i64));
        // Start points at the first space, end one past the terminating lf.
        assert_eq!(token.start.offset(), 0);
        assert_eq!(token.end.offset(), 8);
    }

    #[test]
    fn scans_every_argless_opcode() {
        let cases: &[(&str, TokenKind)] = &[
            (" \n ", TokenKind::Dup),
            (" \n\t", TokenKind::Swap),
            (" \n\n", TokenKind::Drop),
            ("\t   ", TokenKind::Add),
            ("\t  \t", TokenKind::Sub),
            ("\t  \n", TokenKind::Mul),
            ("\t \t ", TokenKind::Div),
            ("\t \t\t", TokenKind::Mod),
            ("\t\t ", TokenKind::Store),
            ("\t\t\t", TokenKind::Retrieve),
            ("\n\t\n", TokenKind::Ret),
            ("\n\n\n", TokenKind::End),
            ("\t\n  ", TokenKind::Printc),
            ("\t\n \t", TokenKind::Printi),
            ("\t\n\t ", TokenKind::Readc),
            ("\t\n\t\t", TokenKind::Readi),
        ];
        for (src, kind) in cases {
            assert_eq!(kinds_of(src), [*kind], "{kind}");
        }
    }

    #[test]
    fn scans_labeled_flow() {
        // label 2; call 2; jmp 0; jz 1; jn 1
        let src = "\n  \t \n\n \t\t \n\n \n\n\n\t \t\n\n\t\t\t\n";
        let kinds = kinds_of(src);
        assert_eq!(
            kinds,
            [
                TokenKind::Label,
                TokenKind::Call,
                TokenKind::Jmp,
                TokenKind::Jz,
                TokenKind::Jn,
            ]
        );
    }

    #[test]
    fn negative_number_arguments() {
        // push -6: SS T 110 L
        let src = "  \t\t\t \n";
        let file = Rc::new(SourceFile::new("test.ws", src.as_bytes()));
        let program = lex(file, src.as_bytes()).unwrap();
        assert_eq!(**program.tokens[0].arg(), Int::from(-6i64));
    }

    #[test]
    fn empty_digits_denote_zero() {
        // push +<empty>
        let src = "   \n";
        let file = Rc::new(SourceFile::new("test.ws", src.as_bytes()));
        let program = lex(file, src.as_bytes()).unwrap();
        assert_eq!(**program.tokens[0].arg(), Int::from(0i64));
    }

    #[test]
    fn eof_inside_instruction_is_an_error() {
        let file = Rc::new(SourceFile::new("test.ws", b" "));
        let err = lex(file, b" ").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnexpectedEof);
    }

    #[test]
    fn eof_inside_number_is_an_error() {
        let file = Rc::new(SourceFile::new("test.ws", b"   \t\t"));
        let err = lex(file, b"   \t\t").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnexpectedEof);
    }

    #[test]
    fn unassigned_encodings_are_errors() {
        let file = Rc::new(SourceFile::new("test.ws", b" \t\t"));
        let err = lex(file, b" \t\t").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnrecognizedOpcode(seq) if seq == "STT");
    }

    #[test]
    fn number_without_sign_is_an_error() {
        // push followed directly by lf
        let file = Rc::new(SourceFile::new("test.ws", b"  \n"));
        let err = lex(file, b"  \n").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::MissingSign);
    }
}
