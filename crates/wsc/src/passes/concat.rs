use crate::ir::{InstKind, InstRef, PrintOp, Program};
use core::fmt::Write as _;
use core::mem;
use std::rc::Rc;

/// Reduces runs of constant prints to a single string print per run.
///
/// A `printc` of a constant contributes its code point (invalid code
/// points become U+FFFD), a `printi` of a constant its decimal rendering,
/// and a `prints` its string. The flush that lowering appends after every
/// print is absorbed into the run; one flush follows the merged print.
/// Any other instruction ends the run, and a run of a single print is
/// left untouched.
pub fn concat_prints(program: &mut Program) {
    for block in program.block_order().to_vec() {
        let body = mem::take(&mut program.block_mut(block).body);
        let mut out = Vec::with_capacity(body.len());
        let mut run = Run::default();
        for inst in body {
            match piece_of(program, inst) {
                Piece::Print(text) => {
                    run.text.push_str(&text);
                    run.prints.push(inst);
                    run.insts.push(inst);
                }
                Piece::Flush if !run.insts.is_empty() => {
                    run.insts.push(inst);
                }
                _ => {
                    run.flush_into(program, &mut out);
                    out.push(inst);
                }
            }
        }
        run.flush_into(program, &mut out);
        program.block_mut(block).body = out;
    }
}

/// The contribution of one instruction to a constant print run.
enum Piece {
    /// A constant print and its rendered text.
    Print(String),
    /// A flush directly following a print of the current run.
    Flush,
    /// Anything else; ends the run.
    Other,
}

fn piece_of(program: &Program, inst: InstRef) -> Piece {
    match program.kind(inst) {
        InstKind::Print { op, value } => {
            let mut text = String::new();
            match (op, program.kind(value[0])) {
                (PrintOp::Printc, InstKind::IntConst(value)) => {
                    text.push(value.to_code_point().unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                (PrintOp::Printi, InstKind::IntConst(value)) => {
                    let _ = write!(text, "{value}");
                }
                (PrintOp::Prints, InstKind::StringConst(value)) => {
                    text.push_str(value);
                }
                _ => return Piece::Other,
            }
            Piece::Print(text)
        }
        InstKind::Flush => Piece::Flush,
        _ => Piece::Other,
    }
}

/// One accumulating run of constant prints and their flushes.
#[derive(Default)]
struct Run {
    text: String,
    prints: Vec<InstRef>,
    insts: Vec<InstRef>,
}

impl Run {
    /// Ends the run: merges it into a single `prints` if it covers more
    /// than one print, otherwise emits it unchanged.
    fn flush_into(&mut self, program: &mut Program, out: &mut Vec<InstRef>) {
        if self.prints.len() < 2 {
            out.append(&mut self.insts);
            self.text.clear();
            self.prints.clear();
            return;
        }
        let pos = program.inst(self.prints[0]).pos();
        for print in self.prints.drain(..) {
            program.clear_operands(print);
        }
        let text: Rc<str> = Rc::from(self.text.as_str());
        let string = program.new_inst(InstKind::StringConst(text), pos);
        let print = program.new_inst(
            InstKind::Print {
                op: PrintOp::Prints,
                value: [string],
            },
            pos,
        );
        let flush = program.new_inst(InstKind::Flush, pos);
        out.push(print);
        out.push(flush);
        self.text.clear();
        self.insts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::concat_prints;
    use crate::ir::{BlockRef, InstKind, InstRef, PrintOp, Program};
    use assert_matches::assert_matches;
    use std::rc::Rc;
    use wsc_core::{Int, Pos, SourceFile};

    struct Builder {
        program: Program,
        block: BlockRef,
    }

    impl Builder {
        fn new() -> Self {
            let mut program = Program::new(Rc::new(SourceFile::new("test.ws", b"")));
            let block = program.alloc_block();
            Self { program, block }
        }

        fn print_const(&mut self, op: PrintOp, value: i64) {
            let value = self
                .program
                .int_const(Rc::new(Int::from(value)), Pos::new(0));
            self.print(op, value);
        }

        fn print(&mut self, op: PrintOp, value: InstRef) {
            let print = self
                .program
                .new_inst(InstKind::Print { op, value: [value] }, Pos::new(0));
            self.program.push_inst(self.block, print);
            let flush = self.program.new_inst(InstKind::Flush, Pos::new(0));
            self.program.push_inst(self.block, flush);
        }

        fn body(&self) -> Vec<InstRef> {
            self.program.block(self.block).body().to_vec()
        }

        fn assert_prints(&self, inst: InstRef, expected: &str) {
            let InstKind::Print { op: PrintOp::Prints, value } = self.program.kind(inst) else {
                panic!("expected a prints instruction");
            };
            let InstKind::StringConst(text) = self.program.kind(value[0]) else {
                panic!("expected a string operand");
            };
            assert_eq!(&**text, expected);
        }
    }

    #[test]
    fn merges_mixed_character_and_integer_prints() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 'A' as i64);
        b.print_const(PrintOp::Printc, 66);
        b.print_const(PrintOp::Printi, 23);
        concat_prints(&mut b.program);
        let body = b.body();
        assert_eq!(body.len(), 2);
        b.assert_prints(body[0], "AB23");
        assert_matches!(b.program.kind(body[1]), InstKind::Flush);
    }

    #[test]
    fn a_single_print_is_left_alone() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 'A' as i64);
        concat_prints(&mut b.program);
        let body = b.body();
        assert_eq!(body.len(), 2);
        assert_matches!(
            b.program.kind(body[0]),
            InstKind::Print {
                op: PrintOp::Printc,
                ..
            }
        );
        assert_matches!(b.program.kind(body[1]), InstKind::Flush);
    }

    #[test]
    fn non_print_instructions_end_the_run() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 'A' as i64);
        b.print_const(PrintOp::Printc, 66);
        let addr = b.program.int_const(Rc::new(Int::from(0i64)), Pos::new(0));
        let read = b.program.new_inst(
            InstKind::Read {
                op: crate::ir::ReadOp::Readc,
            },
            Pos::new(0),
        );
        b.program.push_inst(b.block, read);
        let store = b.program.new_inst(
            InstKind::StoreHeap { args: [addr, read] },
            Pos::new(0),
        );
        b.program.push_inst(b.block, store);
        b.print_const(PrintOp::Printi, 7);
        concat_prints(&mut b.program);
        let body = b.body();
        // "AB" merged; the read and store stay; the lone printi stays.
        assert_eq!(body.len(), 6);
        b.assert_prints(body[0], "AB");
        assert_matches!(b.program.kind(body[2]), InstKind::Read { .. });
        assert_matches!(b.program.kind(body[3]), InstKind::StoreHeap { .. });
        assert_matches!(
            b.program.kind(body[4]),
            InstKind::Print {
                op: PrintOp::Printi,
                ..
            }
        );
    }

    #[test]
    fn non_constant_prints_break_the_run() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 'A' as i64);
        let read = b.program.new_inst(
            InstKind::Read {
                op: crate::ir::ReadOp::Readi,
            },
            Pos::new(0),
        );
        b.program.push_inst(b.block, read);
        b.print(PrintOp::Printi, read);
        b.print_const(PrintOp::Printc, 'B' as i64);
        concat_prints(&mut b.program);
        // Nothing merges: runs of one on both sides of the dynamic print.
        assert_eq!(b.body().len(), 7);
    }

    #[test]
    fn invalid_code_points_become_replacement_characters() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 0xD800);
        b.print_const(PrintOp::Printc, -5);
        concat_prints(&mut b.program);
        let body = b.body();
        b.assert_prints(body[0], "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn merged_prints_release_their_constant_uses() {
        let mut b = Builder::new();
        b.print_const(PrintOp::Printc, 'A' as i64);
        b.print_const(PrintOp::Printc, 'B' as i64);
        let a = b.program.int_const(Rc::new(Int::from('A' as i64)), Pos::new(0));
        concat_prints(&mut b.program);
        assert!(b.program.inst(a).uses().is_empty());
    }
}
