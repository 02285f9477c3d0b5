use crate::ir::{InstRef, StackFrame};
use core::fmt::{self, Display};
use std::rc::Rc;
use wsc_core::{ArenaIndex, Int};

/// A reference to a basic block in the program's block arena.
///
/// Block arena slots are never deallocated; trimming only removes blocks
/// from the program's ordered block list, so every [`BlockRef`] stays
/// resolvable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockRef(u32);

impl BlockRef {
    /// Returns the raw index of the reference.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArenaIndex for BlockRef {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn from_usize(value: usize) -> Self {
        let value: u32 = value
            .try_into()
            .unwrap_or_else(|err| panic!("cannot allocate more than u32::MAX blocks: {err}"));
        Self(value)
    }
}

/// A label attached to the head of a basic block.
#[derive(Debug, Clone)]
pub struct Label {
    /// The label id from the source program.
    pub id: Rc<Int>,
    /// The human name from the `.map` sidecar if any.
    pub name: Option<Rc<str>>,
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "label_{}", self.id),
        }
    }
}

/// A basic block: a straight-line instruction sequence with one terminator.
///
/// `entries`, `callers`, and `returns` are populated by the connection
/// phase. An entry of `None` is the sentinel predecessor of the program
/// entry block; a caller of `None` is the root of the call stack.
#[derive(Debug)]
pub struct Block {
    pub(crate) id: u32,
    pub(crate) labels: Vec<Label>,
    pub(crate) body: Vec<InstRef>,
    pub(crate) terminator: Option<InstRef>,
    pub(crate) entries: Vec<Option<BlockRef>>,
    pub(crate) callers: Vec<Option<BlockRef>>,
    pub(crate) returns: Vec<BlockRef>,
    pub(crate) prev: Option<BlockRef>,
    pub(crate) next: Option<BlockRef>,
    pub(crate) frame: StackFrame,
}

impl Block {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            labels: Vec::new(),
            body: Vec::new(),
            terminator: None,
            entries: Vec::new(),
            callers: Vec::new(),
            returns: Vec::new(),
            prev: None,
            next: None,
            frame: StackFrame::default(),
        }
    }

    /// Returns the block id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the labels at the head of the block.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Returns the non-terminator instructions of the block in order.
    pub fn body(&self) -> &[InstRef] {
        &self.body
    }

    /// Returns the terminator, or `None` while the block is under
    /// construction.
    pub fn terminator(&self) -> Option<InstRef> {
        self.terminator
    }

    /// Returns the predecessors in control flow.
    ///
    /// `None` is the sentinel predecessor of the program entry block.
    pub fn entries(&self) -> &[Option<BlockRef>] {
        &self.entries
    }

    /// Returns the blocks whose dynamic control flow can reach this block
    /// through the call stack; `None` is the root caller.
    pub fn callers(&self) -> &[Option<BlockRef>] {
        &self.callers
    }

    /// Returns the `ret`-terminated blocks that can return to this block's
    /// `next`.
    pub fn returns(&self) -> &[BlockRef] {
        &self.returns
    }

    /// Returns the previous block in source order.
    pub fn prev(&self) -> Option<BlockRef> {
        self.prev
    }

    /// Returns the next block in source order.
    pub fn next(&self) -> Option<BlockRef> {
        self.next
    }

    /// Returns the final abstract stack frame of the block.
    pub fn frame(&self) -> &StackFrame {
        &self.frame
    }

    /// Returns the derived display name of the block.
    ///
    /// Blocks with labels are named after their first label, other blocks
    /// after their id.
    pub fn display_name(&self) -> String {
        match self.labels.first() {
            Some(label) => label.to_string(),
            None => format!("block_{}", self.id),
        }
    }

    pub(crate) fn add_entry(&mut self, pred: Option<BlockRef>) {
        if !self.entries.contains(&pred) {
            self.entries.push(pred);
        }
    }
}
