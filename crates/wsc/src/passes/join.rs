use crate::ir::{BlockRef, InstKind, Program};
use core::mem;

/// Joins blocks into their sole entry where the entry simply jumps on.
///
/// A block is joined when its only predecessor is an unconditional jump
/// or fallthrough pointing at it and it is not the program entry. The
/// bodies concatenate; since every block's stack side effects are explicit
/// and ordered, concatenation preserves runtime semantics even when the
/// joined block loads beneath its own frame. Runs until no join applies.
pub fn join_simple_entries(program: &mut Program) {
    loop {
        let Some((entry, block)) = find_join(program) else {
            return;
        };
        join(program, entry, block);
    }
}

/// Finds a `(entry, block)` pair where `block` can fold into `entry`.
fn find_join(program: &Program) -> Option<(BlockRef, BlockRef)> {
    for (block, data) in program.blocks() {
        let [Some(pred)] = data.entries() else {
            continue;
        };
        let pred = *pred;
        if pred == block {
            continue;
        }
        let Some(term) = program.block(pred).terminator() else {
            continue;
        };
        match program.kind(term) {
            InstKind::Jmp { dest, .. } if *dest == block => return Some((pred, block)),
            _ => {}
        }
    }
    None
}

/// Concatenates `block` onto `entry` and removes `block` from the program.
fn join(program: &mut Program, entry: BlockRef, block: BlockRef) {
    // The entry adopts the block's body and terminator; its own jump
    // terminator has no operands and is simply abandoned.
    let body = mem::take(&mut program.block_mut(block).body);
    program.block_mut(entry).body.extend(body);
    let term = program.block_mut(block).terminator.take();
    program.block_mut(entry).terminator = term;
    // Successor edges of the joined block now originate from the entry.
    let successors = term
        .map(|term| program.kind(term).successors())
        .unwrap_or_default();
    for succ in successors {
        let entries = &mut program.block_mut(succ).entries;
        entries.retain(|pred| *pred != Some(block));
        if !entries.contains(&Some(entry)) {
            entries.push(Some(entry));
        }
    }
    // Caller and return bookkeeping that referred to the joined block now
    // refers to the entry.
    for other in program.block_order().to_vec() {
        let data = program.block_mut(other);
        for ret in &mut data.returns {
            if *ret == block {
                *ret = entry;
            }
        }
        for caller in &mut data.callers {
            if *caller == Some(block) {
                *caller = Some(entry);
            }
        }
        dedup_in_place(&mut data.returns);
        dedup_in_place(&mut data.callers);
    }
    program.unlink_block(block);
}

/// Removes duplicates while keeping first occurrences in order.
fn dedup_in_place<T: PartialEq + Copy>(list: &mut Vec<T>) {
    let mut seen = Vec::with_capacity(list.len());
    list.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(*item);
            true
        }
    });
}
