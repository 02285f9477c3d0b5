use crate::ir::InstRef;
use wsc_core::Pos;

/// The effects seam between the abstract stack frame and the IR builder.
///
/// The frame raises `on_access` whenever it touches a position beneath
/// itself for the first time and `on_load` when such a position must be
/// materialized as a value. The builder appends the matching stack
/// assertion and load instructions; the access instruction always precedes
/// the load, and both precede the instruction that consumes the value.
pub trait FrameEffects {
    /// Called when the deepest touched under-frame position grows to
    /// `depth`.
    fn on_access(&mut self, depth: usize, pos: Pos);

    /// Materializes the value at `depth` beneath the frame.
    ///
    /// Called at most once per position; the frame memoizes the result.
    fn on_load(&mut self, depth: usize, pos: Pos) -> InstRef;
}

/// The abstract stack frame of a basic block.
///
/// Models the Whitespace operand stack symbolically while a block is
/// lowered: values pushed within the block stay in `values`; positions
/// beneath the block's frame are materialized on demand as placeholder
/// loads and memoized in `under`. `pops` counts how far the block has
/// popped beneath its own frame and `accesses` the deepest position it has
/// touched at all.
#[derive(Debug, Default, Clone)]
pub struct StackFrame {
    values: Vec<InstRef>,
    under: Vec<Option<InstRef>>,
    pops: usize,
    accesses: usize,
}

impl StackFrame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of values currently on the frame.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the frame holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the values on the frame, bottom first.
    pub fn values(&self) -> &[InstRef] {
        &self.values
    }

    /// Returns the memoized under-frame placeholders, position 1 first.
    pub fn under(&self) -> &[Option<InstRef>] {
        &self.under
    }

    /// Returns how many values the block has popped beneath its frame.
    pub fn pops(&self) -> usize {
        self.pops
    }

    /// Returns the deepest under-frame position touched by the block.
    pub fn accesses(&self) -> usize {
        self.accesses
    }

    /// Pushes a value onto the frame.
    pub fn push(&mut self, value: InstRef) {
        self.values.push(value);
    }

    /// Pops the top of the stack.
    pub fn pop(&mut self, fx: &mut impl FrameEffects, pos: Pos) -> InstRef {
        match self.values.pop() {
            Some(value) => value,
            None => {
                self.pops += 1;
                self.access(fx, self.pops, pos);
                self.load(fx, self.pops, pos)
            }
        }
    }

    /// Pops the top two stack entries as `(lhs, rhs)`, `rhs` topmost.
    ///
    /// When both entries come from beneath the frame the two accesses
    /// collapse into a single one at the combined depth.
    pub fn pop2(&mut self, fx: &mut impl FrameEffects, pos: Pos) -> (InstRef, InstRef) {
        if self.values.is_empty() {
            self.pops += 2;
            self.access(fx, self.pops, pos);
            let rhs = self.load(fx, self.pops - 1, pos);
            let lhs = self.load(fx, self.pops, pos);
            (lhs, rhs)
        } else {
            let rhs = self.pop(fx, pos);
            let lhs = self.pop(fx, pos);
            (lhs, rhs)
        }
    }

    /// Pops the top of the stack and discards it.
    ///
    /// Discarded under-frame positions are accessed but never materialized.
    pub fn drop_top(&mut self, fx: &mut impl FrameEffects, pos: Pos) {
        if self.values.pop().is_none() {
            self.pops += 1;
            self.access(fx, self.pops, pos);
        }
    }

    /// Pops `n` entries, discarding them.
    pub fn drop_n(&mut self, n: usize, fx: &mut impl FrameEffects, pos: Pos) {
        let drained = n.min(self.values.len());
        self.values.truncate(self.values.len() - drained);
        let below = n - drained;
        if below > 0 {
            self.pops += below;
            self.access(fx, self.pops, pos);
        }
    }

    /// Pushes the top of the stack again.
    pub fn dup(&mut self, fx: &mut impl FrameEffects, pos: Pos) {
        let top = self.top(fx, pos);
        self.push(top);
    }

    /// Pushes the `n`-th stack entry counted from the top.
    pub fn copy(&mut self, n: usize, fx: &mut impl FrameEffects, pos: Pos) {
        let value = self.at(n, fx, pos);
        self.push(value);
    }

    /// Swaps the top two stack entries, then simplifies.
    pub fn swap(&mut self, fx: &mut impl FrameEffects, pos: Pos) {
        let top = self.pop(fx, pos);
        let below = self.pop(fx, pos);
        self.push(top);
        self.push(below);
        self.simplify();
    }

    /// Pops the top, discards `n` entries beneath it, pushes the top back,
    /// then simplifies.
    pub fn slide(&mut self, n: usize, fx: &mut impl FrameEffects, pos: Pos) {
        let top = self.pop(fx, pos);
        self.drop_n(n, fx, pos);
        self.push(top);
        self.simplify();
    }

    /// Returns the top of the stack without popping it.
    pub fn top(&mut self, fx: &mut impl FrameEffects, pos: Pos) -> InstRef {
        self.at(0, fx, pos)
    }

    /// Returns the `n`-th stack entry counted from the top without popping.
    ///
    /// Entries beneath the frame are materialized through the effects seam
    /// and memoized per position.
    pub fn at(&mut self, n: usize, fx: &mut impl FrameEffects, pos: Pos) -> InstRef {
        if n < self.values.len() {
            return self.values[self.values.len() - n - 1];
        }
        let depth = self.pops + n - self.values.len() + 1;
        self.access(fx, depth, pos);
        self.load(fx, depth, pos)
    }

    /// Cancels identity shuffles against the under-frame placeholders.
    ///
    /// While the bottom of `values` is exactly the placeholder for the
    /// last position popped beneath the frame, that pop and push cancel;
    /// this keeps `swap; swap` and `slide 0` from leaving residue.
    pub fn simplify(&mut self) {
        while self.pops > 0 {
            let restored = self
                .under
                .get(self.pops - 1)
                .copied()
                .flatten()
                .is_some_and(|placeholder| self.values.first() == Some(&placeholder));
            if !restored {
                break;
            }
            self.values.remove(0);
            self.pops -= 1;
        }
    }

    /// Rewrites every occurrence of `old` on the frame to `new`.
    ///
    /// Keeps the frame consistent when the optimizer replaces values.
    pub(crate) fn replace_value(&mut self, old: InstRef, new: InstRef) {
        for value in &mut self.values {
            if *value == old {
                *value = new;
            }
        }
        for slot in self.under.iter_mut().flatten() {
            if *slot == old {
                *slot = new;
            }
        }
    }

    fn access(&mut self, fx: &mut impl FrameEffects, depth: usize, pos: Pos) {
        if depth > self.accesses {
            self.accesses = depth;
            fx.on_access(depth, pos);
        }
    }

    fn load(&mut self, fx: &mut impl FrameEffects, depth: usize, pos: Pos) -> InstRef {
        if self.under.len() < depth {
            self.under.resize(depth, None);
        }
        match self.under[depth - 1] {
            Some(placeholder) => placeholder,
            None => {
                let placeholder = fx.on_load(depth, pos);
                self.under[depth - 1] = Some(placeholder);
                placeholder
            }
        }
    }
}
