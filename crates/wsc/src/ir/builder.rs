use crate::{
    error::{Error, TokenError, TokenErrorKind},
    ir::{
        BinaryOp, BlockRef, CondOp, FrameEffects, InstKind, InstRef, JmpOp, Label, PrintOp,
        Program, ReadOp, StackFrame,
    },
};
use std::rc::Rc;
use wsc_core::{Int, IntMap, Pos};
use wsc_ws::{Token, TokenKind, TokenProgram};

impl Program {
    /// Builds the SSA program from a token stream.
    ///
    /// Label errors and malformed arguments are collected, not thrown;
    /// lowering proceeds past them so as many errors as possible are
    /// reported. The returned program still needs [`Program::connect`] to
    /// populate its entry, caller, and return sets.
    pub fn build(tokens: &TokenProgram) -> (Program, Vec<Error>) {
        let mut builder = Builder {
            tokens: &tokens.tokens,
            program: Program::new(tokens.file.clone()),
            errors: Vec::new(),
            labels: IntMap::new(),
            label_uses: IntMap::new(),
            label_blocks: IntMap::new(),
        };
        builder.collect_labels();
        let ranges = builder.split_blocks();
        let blocks = builder.alloc_blocks(&ranges);
        for (block, range) in blocks {
            match range {
                Some((start, end)) => builder.lower_block(block, start, end),
                None => builder.lower_implicit_end(block),
            }
        }
        (builder.program, builder.errors)
    }
}

struct Builder<'a> {
    tokens: &'a [Token],
    program: Program,
    errors: Vec<Error>,
    /// Label id to defining token index.
    labels: IntMap<usize>,
    /// Label id to using token indices.
    label_uses: IntMap<Vec<usize>>,
    /// Label id to labeled block.
    label_blocks: IntMap<BlockRef>,
}

impl Builder<'_> {
    fn token_error(&mut self, kind: TokenErrorKind, token: &Token) {
        self.errors.push(Error::from(TokenError {
            kind,
            token: token.kind,
            pos: token.start,
        }));
    }

    /// Walks the tokens once, recording label definitions and uses.
    ///
    /// A duplicate definition and every use of an undefined label yield one
    /// error each.
    fn collect_labels(&mut self) {
        for (index, token) in self.tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Label => {
                    let (_, inserted) = self.labels.get_or_put(token.arg().clone(), index);
                    if !inserted {
                        self.token_error(
                            TokenErrorKind::LabelNotUnique {
                                label: token.arg().clone(),
                            },
                            token,
                        );
                    }
                }
                TokenKind::Call | TokenKind::Jmp | TokenKind::Jz | TokenKind::Jn => {
                    let (uses, _) = self.label_uses.get_or_put(token.arg().clone(), Vec::new());
                    uses.push(index);
                }
                _ => {}
            }
        }
        let mut undefined = Vec::new();
        for (label, uses) in self.label_uses.pairs() {
            if !self.labels.has(label) {
                undefined.extend(uses.iter().copied());
            }
        }
        undefined.sort_unstable();
        for index in undefined {
            let token = &self.tokens[index];
            self.token_error(
                TokenErrorKind::LabelDoesNotExist {
                    label: token.arg().clone(),
                },
                token,
            );
        }
    }

    /// Splits the token stream at control-flow boundaries.
    ///
    /// A boundary exists immediately after every flow terminator and
    /// immediately before every label that is the target of some use;
    /// labels nobody jumps to do not split. `None` stands for the trailing
    /// implicit `end` block.
    fn split_blocks(&self) -> Vec<Option<(usize, usize)>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for (index, token) in self.tokens.iter().enumerate() {
            if token.kind.is_terminator() {
                ranges.push(Some((start, index + 1)));
                start = index + 1;
            } else if token.kind == TokenKind::Label
                && index > start
                && self.label_uses.has(token.arg())
            {
                ranges.push(Some((start, index)));
                start = index;
            }
        }
        if start < self.tokens.len() || self.tokens.is_empty() {
            if start < self.tokens.len() {
                ranges.push(Some((start, self.tokens.len())));
            }
            // The stream does not end in a terminator.
            ranges.push(None);
        }
        ranges
    }

    /// Allocates one block per range, links siblings, and registers the
    /// label-to-block table for the leading labels of every block.
    fn alloc_blocks(
        &mut self,
        ranges: &[Option<(usize, usize)>],
    ) -> Vec<(BlockRef, Option<(usize, usize)>)> {
        let mut blocks = Vec::with_capacity(ranges.len());
        let mut prev: Option<BlockRef> = None;
        for range in ranges {
            let block = self.program.alloc_block();
            if let Some(prev) = prev {
                self.program.block_mut(prev).next = Some(block);
                self.program.block_mut(block).prev = Some(prev);
            }
            prev = Some(block);
            if let Some((start, end)) = *range {
                for token in &self.tokens[start..end] {
                    if token.kind != TokenKind::Label {
                        break;
                    }
                    self.program.block_mut(block).labels.push(Label {
                        id: token.arg().clone(),
                        name: token.arg_string.clone(),
                    });
                    self.label_blocks.get_or_put(token.arg().clone(), block);
                }
            }
            blocks.push((block, *range));
        }
        blocks
    }

    /// Lowers the tokens of one block into SSA instructions.
    fn lower_block(&mut self, block: BlockRef, start: usize, end: usize) {
        let mut frame = StackFrame::new();
        let mut fx = Effects {
            program: &mut self.program,
            block,
        };
        let mut errors = Vec::new();
        for token in &self.tokens[start..end] {
            let pos = token.start;
            match token.kind {
                TokenKind::Push => {
                    let value = fx.program.int_const(token.arg().clone(), pos);
                    frame.push(value);
                }
                TokenKind::Dup => frame.dup(&mut fx, pos),
                TokenKind::Copy => {
                    if let Some(n) = checked_arg(token, &mut errors) {
                        frame.copy(n, &mut fx, pos);
                    }
                }
                TokenKind::Swap => frame.swap(&mut fx, pos),
                TokenKind::Drop => frame.drop_top(&mut fx, pos),
                TokenKind::Slide => {
                    if let Some(n) = checked_arg(token, &mut errors) {
                        frame.slide(n, &mut fx, pos);
                    }
                }
                TokenKind::Add => fx.binary(&mut frame, BinaryOp::Add, pos),
                TokenKind::Sub => fx.binary(&mut frame, BinaryOp::Sub, pos),
                TokenKind::Mul => fx.binary(&mut frame, BinaryOp::Mul, pos),
                TokenKind::Div => fx.binary(&mut frame, BinaryOp::Div, pos),
                TokenKind::Mod => fx.binary(&mut frame, BinaryOp::Mod, pos),
                TokenKind::Store => {
                    let (addr, value) = frame.pop2(&mut fx, pos);
                    fx.append(
                        InstKind::StoreHeap {
                            args: [addr, value],
                        },
                        pos,
                    );
                }
                TokenKind::Retrieve => {
                    let addr = frame.pop(&mut fx, pos);
                    let load = fx.append(InstKind::LoadHeap { addr: [addr] }, pos);
                    frame.push(load);
                }
                TokenKind::Label => {
                    // Leading labels are attached at allocation; labels in
                    // the middle of a block have no users and are ignored.
                }
                TokenKind::Call => {
                    if let Some(callee) = self.label_blocks.get(token.arg()).copied() {
                        let next = fx.next_block();
                        let term = fx
                            .program
                            .new_inst(InstKind::Call { callee, next }, pos);
                        fx.program.set_terminator(block, term);
                    }
                }
                TokenKind::Jmp => {
                    if let Some(dest) = self.label_blocks.get(token.arg()).copied() {
                        let term = fx.program.new_inst(
                            InstKind::Jmp {
                                op: JmpOp::Jmp,
                                dest,
                            },
                            pos,
                        );
                        fx.program.set_terminator(block, term);
                    }
                }
                TokenKind::Jz | TokenKind::Jn => {
                    let cond = frame.pop(&mut fx, pos);
                    if let Some(then_dest) = self.label_blocks.get(token.arg()).copied() {
                        let op = match token.kind {
                            TokenKind::Jz => CondOp::Jz,
                            _ => CondOp::Jn,
                        };
                        let else_dest = fx.next_block();
                        let term = fx.program.new_inst(
                            InstKind::JmpCond {
                                op,
                                cond: [cond],
                                then_dest,
                                else_dest,
                            },
                            pos,
                        );
                        fx.program.set_terminator(block, term);
                    }
                }
                TokenKind::Ret => {
                    let term = fx.program.new_inst(InstKind::Ret, pos);
                    fx.program.set_terminator(block, term);
                }
                TokenKind::End => {
                    let term = fx.program.new_inst(InstKind::Exit, pos);
                    fx.program.set_terminator(block, term);
                }
                TokenKind::Printc => fx.print(&mut frame, PrintOp::Printc, pos),
                TokenKind::Printi => fx.print(&mut frame, PrintOp::Printi, pos),
                TokenKind::Readc => fx.read(&mut frame, ReadOp::Readc, pos),
                TokenKind::Readi => fx.read(&mut frame, ReadOp::Readi, pos),
            }
        }
        let end_pos = self.tokens[end - 1].end;
        self.finish_block(block, frame, end_pos);
        self.errors.extend(errors);
    }

    /// Lowers the trailing implicit `end` block.
    fn lower_implicit_end(&mut self, block: BlockRef) {
        let pos = self
            .tokens
            .last()
            .map(|token| token.end)
            .unwrap_or_default();
        let term = self.program.new_inst(InstKind::Exit, pos);
        self.program.set_terminator(block, term);
    }

    /// Emits the once-per-block stack side effects and the default
    /// terminator, then retains the frame for printing.
    fn finish_block(&mut self, block: BlockRef, frame: StackFrame, pos: Pos) {
        let delta = frame.len() as i64 - frame.pops() as i64;
        if delta != 0 {
            let offset = self.program.new_inst(InstKind::OffsetStack { delta }, pos);
            self.program.push_inst(block, offset);
        }
        let len = frame.len();
        for (index, value) in frame.values().iter().copied().enumerate() {
            let depth = len - index;
            let store = self.program.new_inst(
                InstKind::StoreStack {
                    depth,
                    value: [value],
                },
                pos,
            );
            self.program.push_inst(block, store);
        }
        if self.program.block(block).terminator.is_none() {
            let term = match self.program.block(block).next {
                Some(next) => self.program.new_inst(
                    InstKind::Jmp {
                        op: JmpOp::Fallthrough,
                        dest: next,
                    },
                    pos,
                ),
                None => self.program.new_inst(InstKind::Exit, pos),
            };
            self.program.set_terminator(block, term);
        }
        self.program.block_mut(block).frame = frame;
    }
}

/// Validates a `copy` or `slide` argument.
fn checked_arg(token: &Token, errors: &mut Vec<Error>) -> Option<usize> {
    let arg: &Rc<Int> = token.arg();
    if arg.is_negative() {
        errors.push(Error::from(TokenError {
            kind: TokenErrorKind::ArgumentNegative { arg: arg.clone() },
            token: token.kind,
            pos: token.start,
        }));
        return None;
    }
    match arg.to_usize() {
        Some(n) => Some(n),
        None => {
            errors.push(Error::from(TokenError {
                kind: TokenErrorKind::ArgumentOverflow { arg: arg.clone() },
                token: token.kind,
                pos: token.start,
            }));
            None
        }
    }
}

/// Appends the access and load instructions the frame raises while a
/// block's tokens are lowered.
struct Effects<'a> {
    program: &'a mut Program,
    block: BlockRef,
}

impl Effects<'_> {
    fn append(&mut self, kind: InstKind, pos: Pos) -> InstRef {
        let inst = self.program.new_inst(kind, pos);
        self.program.push_inst(self.block, inst);
        inst
    }

    fn binary(&mut self, frame: &mut StackFrame, op: BinaryOp, pos: Pos) {
        let (lhs, rhs) = frame.pop2(self, pos);
        let inst = self.append(
            InstKind::Binary {
                op,
                args: [lhs, rhs],
            },
            pos,
        );
        frame.push(inst);
    }

    fn print(&mut self, frame: &mut StackFrame, op: PrintOp, pos: Pos) {
        let value = frame.pop(self, pos);
        self.append(InstKind::Print { op, value: [value] }, pos);
        self.append(InstKind::Flush, pos);
    }

    fn read(&mut self, frame: &mut StackFrame, op: ReadOp, pos: Pos) {
        let addr = frame.pop(self, pos);
        let read = self.append(InstKind::Read { op }, pos);
        self.append(
            InstKind::StoreHeap {
                args: [addr, read],
            },
            pos,
        );
    }

    fn next_block(&self) -> BlockRef {
        self.program
            .block(self.block)
            .next
            .unwrap_or_else(|| panic!("terminated block without a following block"))
    }
}

impl FrameEffects for Effects<'_> {
    fn on_access(&mut self, depth: usize, pos: Pos) {
        self.append(InstKind::AccessStack { size: depth }, pos);
    }

    fn on_load(&mut self, depth: usize, pos: Pos) -> InstRef {
        self.append(InstKind::LoadStack { depth }, pos)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ir::{BinaryOp, InstKind, JmpOp, Program},
        ErrorKind, TokenErrorKind,
    };
    use assert_matches::assert_matches;
    use std::rc::Rc;
    use wsc_core::{Int, Pos, SourceFile};
    use wsc_ws::{Token, TokenKind, TokenProgram};

    fn tok(kind: TokenKind) -> Token {
        Token::new(kind, Pos::new(0), Pos::new(1))
    }

    fn tok_arg(kind: TokenKind, arg: i64) -> Token {
        Token::with_arg(kind, Rc::new(Int::from(arg)), Pos::new(0), Pos::new(1))
    }

    fn build(tokens: Vec<Token>) -> (Program, Vec<crate::Error>) {
        let file = Rc::new(SourceFile::new("test.ws", b""));
        Program::build(&TokenProgram::new(file, tokens))
    }

    #[test]
    fn lowers_arithmetic_over_the_frame() {
        use TokenKind::*;
        let (program, errors) = build(vec![
            tok_arg(Push, 1),
            tok(Add),
            tok(Mul),
            tok_arg(Label, 1),
            tok_arg(Copy, 5),
            tok(Mod),
            tok_arg(Slide, 2),
        ]);
        assert!(errors.is_empty());
        // The code block plus the trailing implicit end block.
        assert_eq!(program.block_order().len(), 2);
        let entry = program.entry();
        let body: Vec<_> = program.block(entry).body().to_vec();
        assert_eq!(body.len(), 11);
        assert_matches!(program.kind(body[0]), InstKind::AccessStack { size: 1 });
        assert_matches!(program.kind(body[1]), InstKind::LoadStack { depth: 1 });
        assert_matches!(
            program.kind(body[2]),
            InstKind::Binary {
                op: BinaryOp::Add,
                ..
            }
        );
        assert_matches!(program.kind(body[3]), InstKind::AccessStack { size: 2 });
        assert_matches!(program.kind(body[4]), InstKind::LoadStack { depth: 2 });
        assert_matches!(
            program.kind(body[5]),
            InstKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        );
        assert_matches!(program.kind(body[6]), InstKind::AccessStack { size: 7 });
        assert_matches!(program.kind(body[7]), InstKind::LoadStack { depth: 7 });
        assert_matches!(
            program.kind(body[8]),
            InstKind::Binary {
                op: BinaryOp::Mod,
                ..
            }
        );
        assert_matches!(program.kind(body[9]), InstKind::OffsetStack { delta: -3 });
        assert_matches!(program.kind(body[10]), InstKind::StoreStack { depth: 1, .. });
        // The add takes the under-frame load as lhs and the constant as rhs.
        let InstKind::Binary { args, .. } = program.kind(body[2]) else {
            unreachable!()
        };
        assert_eq!(args[0], body[1]);
        assert_eq!(**program.as_const(args[1]).unwrap(), Int::from(1i64));
        let term = program.block(entry).terminator().unwrap();
        assert_matches!(
            program.kind(term),
            InstKind::Jmp {
                op: JmpOp::Fallthrough,
                ..
            }
        );
    }

    #[test]
    fn splits_after_terminators_and_before_used_labels() {
        use TokenKind::*;
        let (program, errors) = build(vec![
            tok_arg(Push, 1),
            tok_arg(Jz, 1),
            tok_arg(Label, 1),
            tok(End),
        ]);
        assert!(errors.is_empty());
        assert_eq!(program.block_order().len(), 2);
        let entry = program.entry();
        let target = program.block(entry).next().unwrap();
        assert_eq!(program.block(target).labels().len(), 1);
        assert_eq!(*program.block(target).labels()[0].id, Int::from(1i64));
        let term = program.block(entry).terminator().unwrap();
        assert_matches!(
            program.kind(term),
            InstKind::JmpCond { then_dest, else_dest, .. }
                if *then_dest == target && *else_dest == target
        );
    }

    #[test]
    fn unused_labels_do_not_split() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Push, 1), tok_arg(Label, 5), tok(Drop)]);
        assert!(errors.is_empty());
        // One code block and the implicit end block; label 5 never splits.
        assert_eq!(program.block_order().len(), 2);
        assert!(program.block(program.entry()).labels().is_empty());
    }

    #[test]
    fn leading_unused_labels_attach_to_their_block() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Label, 5), tok_arg(Push, 1), tok(Drop)]);
        assert!(errors.is_empty());
        let labels = program.block(program.entry()).labels();
        assert_eq!(labels.len(), 1);
        assert_eq!(*labels[0].id, Int::from(5i64));
    }

    #[test]
    fn duplicate_labels_are_collected() {
        use TokenKind::*;
        let (_, errors) = build(vec![tok_arg(Label, 1), tok_arg(Label, 1), tok(End)]);
        assert_eq!(errors.len(), 1);
        assert_matches!(
            errors[0].kind(),
            ErrorKind::Token(error)
                if matches!(&error.kind, TokenErrorKind::LabelNotUnique { label } if **label == Int::from(1i64))
        );
    }

    #[test]
    fn undefined_labels_error_once_per_use() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Call, 7), tok_arg(Jmp, 7), tok(End)]);
        assert_eq!(errors.len(), 2);
        for error in &errors {
            assert_matches!(
                error.kind(),
                ErrorKind::Token(error)
                    if matches!(&error.kind, TokenErrorKind::LabelDoesNotExist { label } if **label == Int::from(7i64))
            );
        }
        // Lowering proceeded: every block is terminated.
        for (_, block) in program.blocks() {
            assert!(block.terminator().is_some());
        }
    }

    #[test]
    fn negative_copy_arguments_are_collected() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Push, 1), tok_arg(Copy, -2), tok(End)]);
        assert_eq!(errors.len(), 1);
        assert_matches!(
            errors[0].kind(),
            ErrorKind::Token(error) if matches!(&error.kind, TokenErrorKind::ArgumentNegative { .. })
        );
        // The copy is skipped; the pushed constant still reaches the stack.
        assert_eq!(program.block(program.entry()).frame().len(), 1);
    }

    #[test]
    fn empty_programs_get_a_single_exit_block() {
        let (program, errors) = build(Vec::new());
        assert!(errors.is_empty());
        assert_eq!(program.block_order().len(), 1);
        let term = program.block(program.entry()).terminator().unwrap();
        assert_matches!(program.kind(term), InstKind::Exit);
    }

    #[test]
    fn reads_store_through_their_address() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Push, 5), tok(Readi), tok(End)]);
        assert!(errors.is_empty());
        let body: Vec<_> = program.block(program.entry()).body().to_vec();
        assert_eq!(body.len(), 2);
        assert_matches!(program.kind(body[0]), InstKind::Read { .. });
        let InstKind::StoreHeap { args } = program.kind(body[1]) else {
            panic!("read must lower to a heap store");
        };
        assert_eq!(**program.as_const(args[0]).unwrap(), Int::from(5i64));
        assert_eq!(args[1], body[0]);
    }

    #[test]
    fn prints_append_a_flush() {
        use TokenKind::*;
        let (program, errors) = build(vec![tok_arg(Push, 65), tok(Printc), tok(End)]);
        assert!(errors.is_empty());
        let body: Vec<_> = program.block(program.entry()).body().to_vec();
        assert_eq!(body.len(), 2);
        assert_matches!(program.kind(body[0]), InstKind::Print { .. });
        assert_matches!(program.kind(body[1]), InstKind::Flush);
    }

    #[test]
    fn stores_pop_value_then_address() {
        use TokenKind::*;
        let (program, errors) = build(vec![
            tok_arg(Push, 8),
            tok_arg(Push, 9),
            tok(Store),
            tok(End),
        ]);
        assert!(errors.is_empty());
        let body: Vec<_> = program.block(program.entry()).body().to_vec();
        assert_eq!(body.len(), 1);
        let InstKind::StoreHeap { args } = program.kind(body[0]) else {
            panic!("store must lower to a heap store");
        };
        assert_eq!(**program.as_const(args[0]).unwrap(), Int::from(8i64));
        assert_eq!(**program.as_const(args[1]).unwrap(), Int::from(9i64));
    }
}
