use crate::{
    error::RetUnderflowError,
    ir::{BlockRef, InstKind, Program},
};

impl Program {
    /// Connects the control-flow graph and trims unreachable blocks.
    ///
    /// Three phases run in order: straight-line predecessors are recorded
    /// in every block's `entries`; a traversal from the entry block
    /// resolves callers and `ret` targets; blocks the traversal never
    /// reached are removed.
    ///
    /// # Errors
    ///
    /// Returns a [`RetUnderflowError`] carrying one trace per `ret` that
    /// can run with an empty call stack. The graph is fully connected
    /// regardless; the error is non-fatal and code generation may proceed
    /// with runtime guards on the offending paths.
    pub fn connect(&mut self) -> Result<(), RetUnderflowError> {
        self.connect_entries();
        let entry = self.entry();
        let traces = self.connect_callers(entry, None);
        self.trim_unreachable();
        if traces.is_empty() {
            Ok(())
        } else {
            Err(RetUnderflowError { traces })
        }
    }

    /// Records straight-line predecessors.
    ///
    /// The entry block receives its sentinel predecessor first. A call
    /// links only its callee here; the fall-through edge to its `next` is
    /// established by return resolution.
    fn connect_entries(&mut self) {
        let entry = self.entry();
        self.block_mut(entry).add_entry(None);
        for block in self.block_order().to_vec() {
            let term = self
                .block(block)
                .terminator()
                .unwrap_or_else(|| panic!("block_{} has no terminator", self.block(block).id()));
            match *self.kind(term) {
                InstKind::Call { callee, .. } => {
                    self.block_mut(callee).add_entry(Some(block));
                }
                InstKind::Jmp { dest, .. } => {
                    self.block_mut(dest).add_entry(Some(block));
                }
                InstKind::JmpCond {
                    then_dest,
                    else_dest,
                    ..
                } => {
                    self.block_mut(then_dest).add_entry(Some(block));
                    self.block_mut(else_dest).add_entry(Some(block));
                }
                InstKind::Ret | InstKind::Exit => {}
                ref other => panic!("block_{} ends in a non-terminator: {other:?}", block.index()),
            }
        }
    }

    /// Resolves callers and `ret` targets by descending from `block`.
    ///
    /// The descent is idempotent per `(block, caller)` pair: revisiting a
    /// block with a known caller returns immediately, which both
    /// terminates cycles and keeps `callers` free of duplicates. A `ret`
    /// reached with the root caller is a call-stack underflow; its trace
    /// grows by one block per step as the recursion unwinds toward the
    /// entry.
    fn connect_callers(
        &mut self,
        block: BlockRef,
        caller: Option<BlockRef>,
    ) -> Vec<Vec<BlockRef>> {
        if self.block(block).callers.contains(&caller) {
            return Vec::new();
        }
        self.block_mut(block).callers.push(caller);
        let term = self
            .block(block)
            .terminator()
            .unwrap_or_else(|| panic!("block_{} has no terminator", self.block(block).id()));
        let mut traces = match *self.kind(term) {
            InstKind::Call { callee, next } => {
                let mut traces = self.connect_callers(callee, Some(block));
                traces.extend(self.connect_callers(next, caller));
                // Any ret reachable in the callee's subtree is a
                // predecessor of the fall-through block.
                for ret in self.block(block).returns.clone() {
                    self.block_mut(next).add_entry(Some(ret));
                }
                traces
            }
            InstKind::Jmp { dest, .. } => self.connect_callers(dest, caller),
            InstKind::JmpCond {
                then_dest,
                else_dest,
                ..
            } => {
                let mut traces = self.connect_callers(then_dest, caller);
                traces.extend(self.connect_callers(else_dest, caller));
                traces
            }
            InstKind::Ret => match caller {
                Some(caller) => {
                    if !self.block(caller).returns.contains(&block) {
                        self.block_mut(caller).returns.push(block);
                    }
                    Vec::new()
                }
                None => vec![Vec::new()],
            },
            InstKind::Exit => Vec::new(),
            ref other => panic!("block_{} ends in a non-terminator: {other:?}", block.index()),
        };
        for trace in &mut traces {
            trace.push(block);
        }
        traces
    }

    /// Removes every block the caller traversal never reached.
    ///
    /// Removed blocks are unlinked from their siblings and erased from
    /// their successors' entry lists; their arena slots stay alive.
    fn trim_unreachable(&mut self) {
        let dead: Vec<BlockRef> = self
            .block_order()
            .iter()
            .copied()
            .filter(|block| self.block(*block).callers.is_empty())
            .collect();
        for block in dead {
            let term = self.block(block).terminator();
            let successors = term
                .map(|term| self.kind(term).successors())
                .unwrap_or_default();
            for succ in successors {
                self.block_mut(succ).entries.retain(|pred| *pred != Some(block));
            }
            self.unlink_block(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{InstKind, Program};
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

    fn build(tokens: Vec<Token>) -> Program {
        let file = Rc::new(SourceFile::new("test.ws", b""));
        let (program, errors) = Program::build(&TokenProgram::new(file, tokens));
        assert!(errors.is_empty());
        program
    }

    #[test]
    fn fallthrough_and_jump_share_an_entry() {
        use TokenKind::*;
        let mut program = build(vec![
            tok_arg(Push, 1),
            tok_arg(Jz, 1),
            tok_arg(Label, 1),
            tok(End),
        ]);
        program.connect().unwrap();
        let entry = program.entry();
        let target = program.block(entry).next().unwrap();
        // Reached both as jump target and as fall through; one entry.
        assert_eq!(program.block(target).entries(), [Some(entry)]);
        assert_eq!(program.block(entry).entries(), [None]);
        assert_eq!(program.block(entry).callers(), [None]);
        assert_eq!(program.block(target).callers(), [None]);
    }

    #[test]
    fn ret_without_caller_is_an_underflow() {
        use TokenKind::*;
        let mut program = build(vec![tok(Ret), tok(End)]);
        let entry = program.entry();
        let error = program.connect().unwrap_err();
        assert_eq!(error.traces, [vec![entry]]);
        // The trailing end block is unreachable and trimmed.
        assert_eq!(program.block_order(), [entry]);
    }

    #[test]
    fn calls_resolve_their_returns() {
        use TokenKind::*;
        let mut program = build(vec![
            tok_arg(Call, 1),
            tok(End),
            tok_arg(Label, 1),
            tok(Ret),
        ]);
        program.connect().unwrap();
        let order = program.block_order().to_vec();
        let [caller, next, callee] = order[..] else {
            panic!("expected three blocks");
        };
        assert_eq!(program.block(caller).returns(), [callee]);
        assert_eq!(program.block(callee).callers(), [Some(caller)]);
        assert_eq!(program.block(callee).entries(), [Some(caller)]);
        // The fall-through block is entered from the returning ret block.
        assert_eq!(program.block(next).entries(), [Some(callee)]);
        assert_eq!(program.block(next).callers(), [None]);
    }

    #[test]
    fn one_returns_entry_per_call_site() {
        use TokenKind::*;
        let mut program = build(vec![
            tok_arg(Call, 1),
            tok_arg(Call, 1),
            tok(End),
            tok_arg(Label, 1),
            tok(Ret),
        ]);
        program.connect().unwrap();
        let order = program.block_order().to_vec();
        let [first, second, _end, callee] = order[..] else {
            panic!("expected four blocks");
        };
        assert_eq!(program.block(first).returns(), [callee]);
        assert_eq!(program.block(second).returns(), [callee]);
        assert_eq!(
            program.block(callee).callers(),
            [Some(first), Some(second)]
        );
    }

    #[test]
    fn unreachable_blocks_are_trimmed() {
        use TokenKind::*;
        let mut program = build(vec![
            tok_arg(Jmp, 1),
            tok_arg(Push, 0),
            tok(End),
            tok_arg(Label, 1),
            tok(End),
        ]);
        let before = program.block_order().to_vec();
        assert_eq!(before.len(), 3);
        program.connect().unwrap();
        let entry = program.entry();
        let target = before[2];
        assert_eq!(program.block_order(), [entry, target]);
        // Siblings relink around the removed block.
        assert_eq!(program.block(entry).next(), Some(target));
        assert_eq!(program.block(target).prev(), Some(entry));
    }

    #[test]
    fn self_loops_terminate_and_record_their_entry() {
        use TokenKind::*;
        let mut program = build(vec![tok_arg(Label, 1), tok_arg(Jmp, 1)]);
        program.connect().unwrap();
        let entry = program.entry();
        assert_eq!(program.block(entry).entries(), [None, Some(entry)]);
        assert_eq!(program.block(entry).callers(), [None]);
    }

    #[test]
    fn recursive_calls_put_a_block_in_its_own_callers() {
        use TokenKind::*;
        // f calls itself; the program never terminates but connects fine.
        let mut program = build(vec![
            tok_arg(Call, 1),
            tok(End),
            tok_arg(Label, 1),
            tok_arg(Call, 1),
            tok(Ret),
        ]);
        program.connect().unwrap();
        let order = program.block_order().to_vec();
        let [entry, _end, callee, _ret] = order[..] else {
            panic!("expected four blocks");
        };
        assert!(program.block(callee).callers().contains(&Some(entry)));
        assert!(program.block(callee).callers().contains(&Some(callee)));
    }

    #[test]
    fn underflow_traces_walk_back_toward_entry() {
        use TokenKind::*;
        // jmp 1 -> label 1: ret; the trace is [ret block, jmp block].
        let mut program = build(vec![tok_arg(Jmp, 1), tok_arg(Label, 1), tok(Ret)]);
        let entry = program.entry();
        let ret_block = program.block(entry).next().unwrap();
        let error = program.connect().unwrap_err();
        assert_eq!(error.traces, [vec![ret_block, entry]]);
    }

    #[test]
    fn every_entry_lists_a_real_successor_edge() {
        use TokenKind::*;
        let mut program = build(vec![
            tok_arg(Push, 0),
            tok_arg(Jz, 2),
            tok_arg(Call, 1),
            tok(End),
            tok_arg(Label, 1),
            tok(Ret),
            tok_arg(Label, 2),
            tok(End),
        ]);
        program.connect().unwrap();
        for (block, data) in program.blocks() {
            for pred in data.entries().iter().flatten() {
                let term = program.block(*pred).terminator().unwrap();
                let direct = program.kind(term).successors().contains(&block);
                // A call fall-through is entered from returning blocks.
                let via_return = matches!(
                    program.kind(term),
                    InstKind::Ret
                ) && program.block_order().iter().any(|caller| {
                    program.block(*caller).returns().contains(pred)
                        && program.block(*caller).next() == Some(block)
                });
                assert!(direct || via_return, "entry without successor edge");
            }
        }
        let term = program.block(program.entry()).terminator().unwrap();
        assert_matches!(program.kind(term), InstKind::JmpCond { .. });
    }
}
