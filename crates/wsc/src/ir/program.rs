use crate::ir::{Block, BlockRef, Inst, InstKind, InstRef, Use};
use core::mem;
use std::rc::Rc;
use wsc_core::{Arena, Int, IntMap, Pos, SourceFile};

/// A compiled program: the arenas of blocks and instructions, the ordered
/// live-block list, and the interned integer constants.
///
/// Blocks and instructions refer to each other exclusively through arena
/// indices; the arenas never deallocate, so references stay valid across
/// trimming and optimization. Every mutation of an operand slot goes
/// through the gate functions [`Program::set_operand`],
/// [`Program::replace_uses`], and [`Program::clear_operands`] so that the
/// def-use edges stay bidirectionally consistent.
#[derive(Debug)]
pub struct Program {
    name: String,
    file: Rc<SourceFile>,
    insts: Arena<InstRef, Inst>,
    blocks: Arena<BlockRef, Block>,
    order: Vec<BlockRef>,
    entry: Option<BlockRef>,
    consts: IntMap<InstRef>,
    next_block_id: u32,
}

impl Program {
    /// Creates an empty program for `file`.
    pub fn new(file: Rc<SourceFile>) -> Self {
        let name = file
            .name()
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file.name())
            .to_string();
        Self {
            name,
            file,
            insts: Arena::new(),
            blocks: Arena::new(),
            order: Vec::new(),
            entry: None,
            consts: IntMap::new(),
            next_block_id: 0,
        }
    }

    /// Returns the program name, derived from the source file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source file of the program.
    pub fn file(&self) -> &Rc<SourceFile> {
        &self.file
    }

    /// Returns the entry block.
    ///
    /// # Panics
    ///
    /// If the program has no blocks yet.
    pub fn entry(&self) -> BlockRef {
        self.entry
            .unwrap_or_else(|| panic!("program `{}` has no entry block", self.name))
    }

    pub(crate) fn set_entry(&mut self, entry: BlockRef) {
        self.entry = Some(entry);
    }

    /// Returns the live blocks in source order.
    pub fn block_order(&self) -> &[BlockRef] {
        &self.order
    }

    /// Returns an iterator over the live blocks in source order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockRef, &Block)> + '_ {
        self.order.iter().map(|block| (*block, &self.blocks[*block]))
    }

    /// Returns a shared reference to `block`.
    pub fn block(&self, block: BlockRef) -> &Block {
        &self.blocks[block]
    }

    pub(crate) fn block_mut(&mut self, block: BlockRef) -> &mut Block {
        &mut self.blocks[block]
    }

    /// Returns a shared reference to `inst`.
    pub fn inst(&self, inst: InstRef) -> &Inst {
        &self.insts[inst]
    }

    /// Returns an iterator over every instruction ever allocated,
    /// including ones that optimization dropped from their blocks.
    pub fn insts(&self) -> wsc_core::Iter<'_, InstRef, Inst> {
        self.insts.iter()
    }

    /// Returns the kind of `inst`.
    pub fn kind(&self, inst: InstRef) -> &InstKind {
        self.insts[inst].kind()
    }

    /// Returns the interned integer of `inst` if it is a constant.
    pub fn as_const(&self, inst: InstRef) -> Option<&Rc<Int>> {
        match self.kind(inst) {
            InstKind::IntConst(value) => Some(value),
            _ => None,
        }
    }

    /// Allocates a new empty block at the end of the program.
    pub(crate) fn alloc_block(&mut self) -> BlockRef {
        let id = self.next_block_id;
        self.next_block_id += 1;
        let block = self.blocks.alloc(Block::new(id));
        self.order.push(block);
        if self.entry.is_none() {
            self.entry = Some(block);
        }
        block
    }

    /// Creates an instruction and registers a use for each operand slot.
    pub(crate) fn new_inst(&mut self, kind: InstKind, pos: Pos) -> InstRef {
        debug_assert!(
            !matches!(kind, InstKind::IntConst(_)),
            "integer constants must be interned through `int_const`"
        );
        self.alloc_inst(kind, pos)
    }

    /// Returns the interned constant instruction for `value`.
    ///
    /// Equal integers share one instruction per program, so reference
    /// equality on [`InstRef`]s decides value equality for constants.
    pub(crate) fn int_const(&mut self, value: Rc<Int>, pos: Pos) -> InstRef {
        if let Some(existing) = self.consts.get(&value) {
            return *existing;
        }
        let inst = self.alloc_inst(InstKind::IntConst(value.clone()), pos);
        self.consts.put(value, inst);
        inst
    }

    fn alloc_inst(&mut self, kind: InstKind, pos: Pos) -> InstRef {
        let user = self.insts.next_index();
        for index in 0..kind.operand_count() {
            let def = kind.operand(index);
            self.insts[def].uses_mut().push(Use {
                user,
                operand_index: index as u32,
            });
        }
        self.insts.alloc(Inst::new(kind, pos))
    }

    /// Appends `inst` to the body of `block`.
    pub(crate) fn push_inst(&mut self, block: BlockRef, inst: InstRef) {
        self.blocks[block].body.push(inst);
    }

    /// Sets the terminator of `block`.
    ///
    /// # Panics
    ///
    /// If the block already has a terminator; a block is terminated exactly
    /// once.
    pub(crate) fn set_terminator(&mut self, block: BlockRef, inst: InstRef) {
        debug_assert!(self.insts[inst].kind().is_terminator());
        if self.blocks[block].terminator.is_some() {
            panic!("block_{} is already terminated", self.blocks[block].id);
        }
        self.blocks[block].terminator = Some(inst);
    }

    /// Rewrites operand slot `index` of `user` to refer to `def`.
    ///
    /// The use edge is removed from the old def and registered with the
    /// new one.
    pub fn set_operand(&mut self, user: InstRef, index: usize, def: InstRef) {
        let old = self.insts[user].kind().operand(index);
        self.remove_use(old, user, index);
        self.insts[user].kind_mut().set_operand(index, def);
        self.insts[def].uses_mut().push(Use {
            user,
            operand_index: index as u32,
        });
    }

    /// Replaces all uses of `old` with `new`.
    ///
    /// Every user of `old` is rewritten to refer to `new` and the use
    /// edges move to `new`'s use list; `old` is left without uses. The use
    /// list is snapshotted before traversal, so users may alias.
    ///
    /// # Panics
    ///
    /// If a use edge of `old` does not point back at `old`; that indicates
    /// a bug in the compiler itself.
    pub fn replace_uses(&mut self, old: InstRef, new: InstRef) {
        let uses = mem::take(self.insts[old].uses_mut());
        for edge in &uses {
            let slot = self.insts[edge.user].kind().operand(edge.operand_index as usize);
            if slot != old {
                panic!(
                    "use edge of instruction {} does not match its def",
                    old.index()
                );
            }
            self.insts[edge.user]
                .kind_mut()
                .set_operand(edge.operand_index as usize, new);
        }
        self.insts[new].uses_mut().extend(uses);
    }

    /// Clears every operand slot of `inst`, removing its use edges from
    /// the defs.
    ///
    /// Called before an instruction is dropped from its block so no def
    /// keeps a dangling use edge.
    pub fn clear_operands(&mut self, inst: InstRef) {
        let count = self.insts[inst].kind().operand_count();
        let operands: Vec<InstRef> = (0..count)
            .map(|index| self.insts[inst].kind().operand(index))
            .collect();
        for (index, def) in operands.into_iter().enumerate() {
            self.remove_use(def, inst, index);
        }
    }

    fn remove_use(&mut self, def: InstRef, user: InstRef, operand_index: usize) {
        let uses = self.insts[def].uses_mut();
        let position = uses
            .iter()
            .position(|edge| edge.user == user && edge.operand_index == operand_index as u32)
            .unwrap_or_else(|| {
                panic!(
                    "use of instruction {} by instruction {} is not registered",
                    def.index(),
                    user.index()
                )
            });
        uses.swap_remove(position);
    }

    /// Removes `block` from the live-block order, unlinking its siblings.
    pub(crate) fn unlink_block(&mut self, block: BlockRef) {
        let prev = self.blocks[block].prev;
        let next = self.blocks[block].next;
        if let Some(prev) = prev {
            self.blocks[prev].next = next;
        }
        if let Some(next) = next {
            self.blocks[next].prev = prev;
        }
        self.blocks[block].prev = None;
        self.blocks[block].next = None;
        self.order.retain(|live| *live != block);
    }
}
