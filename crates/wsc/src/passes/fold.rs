use crate::ir::{BinaryOp, BlockRef, InstKind, InstRef, Program, UnaryOp};
use std::rc::Rc;
use wsc_core::{Int, Pos};

/// Folds constant arithmetic and applies identity and strength-reduction
/// rules over every block, mutating the program in place.
///
/// Expressions over two interned constants evaluate at compile time; a
/// constant zero divisor panics, as does a shift amount that does not fit
/// the address space. `lshr` is never folded. Strength reduction is
/// restricted to powers of two: multiplication, division, and modulus by
/// `2^k` become shifts and masks. The pass is idempotent.
pub fn fold_constants(program: &mut Program) {
    for block in program.block_order().to_vec() {
        fold_block(program, block);
    }
}

fn fold_block(program: &mut Program, block: BlockRef) {
    let mut index = 0;
    while index < program.block(block).body().len() {
        let inst = program.block(block).body()[index];
        let advance = match *program.kind(inst) {
            InstKind::Binary {
                op,
                args: [lhs, rhs],
            } => fold_binary(program, block, index, inst, op, lhs, rhs),
            InstKind::Unary {
                op: UnaryOp::Neg,
                arg: [arg],
            } => fold_neg(program, block, index, inst, arg),
            _ => true,
        };
        if advance {
            index += 1;
        }
    }
}

/// Folds one binary expression; returns `false` iff the instruction at
/// `index` was removed from the body.
fn fold_binary(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    inst: InstRef,
    op: BinaryOp,
    lhs: InstRef,
    rhs: InstRef,
) -> bool {
    let pos = program.inst(inst).pos();
    let lhs_const = program.as_const(lhs).cloned();
    let rhs_const = program.as_const(rhs).cloned();
    if let (Some(lhs_value), Some(rhs_value)) = (&lhs_const, &rhs_const) {
        let Some(value) = eval_binary(op, lhs_value, rhs_value) else {
            return true;
        };
        let folded = program.int_const(Rc::new(value), pos);
        replace_inst(program, block, index, inst, folded);
        return false;
    }
    if let Some(value) = &lhs_const {
        match op {
            BinaryOp::Add if value.is_zero() => {
                replace_inst(program, block, index, inst, rhs);
                return false;
            }
            BinaryOp::Sub if value.is_zero() => {
                rewrite_neg(program, block, index, inst, rhs, pos);
                return true;
            }
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod if value.is_zero() => {
                // 0 / x and 0 mod x fold without a divisor check; a zero
                // divisor traps at run time, not here.
                let zero = program.int_const(Rc::new(Int::zero()), pos);
                replace_inst(program, block, index, inst, zero);
                return false;
            }
            BinaryOp::Mul if value.is_one() => {
                replace_inst(program, block, index, inst, rhs);
                return false;
            }
            BinaryOp::Mul if value.is_neg_one() => {
                rewrite_neg(program, block, index, inst, rhs, pos);
                return true;
            }
            _ => {}
        }
    }
    if let Some(value) = &rhs_const {
        match op {
            BinaryOp::Div | BinaryOp::Mod if value.is_zero() => {
                panic!("division by zero in `{op}` at {}", pos.offset());
            }
            BinaryOp::Add | BinaryOp::Sub if value.is_zero() => {
                replace_inst(program, block, index, inst, lhs);
                return false;
            }
            BinaryOp::Mul if value.is_zero() => {
                let zero = program.int_const(Rc::new(Int::zero()), pos);
                replace_inst(program, block, index, inst, zero);
                return false;
            }
            BinaryOp::Mul | BinaryOp::Div if value.is_one() => {
                replace_inst(program, block, index, inst, lhs);
                return false;
            }
            BinaryOp::Mod if value.is_one() => {
                let zero = program.int_const(Rc::new(Int::zero()), pos);
                replace_inst(program, block, index, inst, zero);
                return false;
            }
            BinaryOp::Mul | BinaryOp::Div if value.is_neg_one() => {
                rewrite_neg(program, block, index, inst, lhs, pos);
                return true;
            }
            BinaryOp::Mod if value.is_neg_one() => {
                let zero = program.int_const(Rc::new(Int::zero()), pos);
                replace_inst(program, block, index, inst, zero);
                return false;
            }
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if let Some(log2) = value.checked_log2() {
                    reduce_power_of_two(program, block, index, inst, op, lhs, value, log2, pos);
                    return true;
                }
            }
            _ => {}
        }
    }
    if lhs == rhs {
        let replacement = match op {
            BinaryOp::Sub | BinaryOp::Mod => Some(Int::zero()),
            BinaryOp::Div => Some(Int::from(1i64)),
            _ => None,
        };
        if let Some(value) = replacement {
            let folded = program.int_const(Rc::new(value), pos);
            replace_inst(program, block, index, inst, folded);
            return false;
        }
    }
    true
}

/// Folds `neg` of a constant; returns `false` iff the instruction was
/// removed.
fn fold_neg(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    inst: InstRef,
    arg: InstRef,
) -> bool {
    let Some(value) = program.as_const(arg).cloned() else {
        return true;
    };
    let pos = program.inst(inst).pos();
    let folded = program.int_const(Rc::new(value.neg()), pos);
    replace_inst(program, block, index, inst, folded);
    false
}

/// Evaluates a binary operator over two constants; `None` for `lshr`,
/// which is never folded.
///
/// # Panics
///
/// On a zero divisor or a shift amount that does not fit a `usize`.
fn eval_binary(op: BinaryOp, lhs: &Int, rhs: &Int) -> Option<Int> {
    let value = match op {
        BinaryOp::Add => lhs.add(rhs),
        BinaryOp::Sub => lhs.sub(rhs),
        BinaryOp::Mul => lhs.mul(rhs),
        BinaryOp::Div => lhs.div(rhs),
        BinaryOp::Mod => lhs.rem(rhs),
        BinaryOp::Shl => lhs.shl(rhs),
        BinaryOp::AShr => lhs.shr(rhs),
        BinaryOp::LShr => return None,
        BinaryOp::And => lhs.and(rhs),
        BinaryOp::Or => lhs.or(rhs),
        BinaryOp::Xor => lhs.xor(rhs),
    };
    Some(value)
}

/// Rewrites `x * 2^k`, `x / 2^k`, and `x mod 2^k` into shift and mask
/// form.
#[allow(clippy::too_many_arguments)]
fn reduce_power_of_two(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    inst: InstRef,
    op: BinaryOp,
    lhs: InstRef,
    rhs_value: &Int,
    log2: u64,
    pos: Pos,
) {
    let (op, rhs) = match op {
        BinaryOp::Mul => (BinaryOp::Shl, Int::from(log2 as i64)),
        BinaryOp::Div => (BinaryOp::AShr, Int::from(log2 as i64)),
        BinaryOp::Mod => (BinaryOp::And, rhs_value.sub(&Int::from(1i64))),
        _ => unreachable!("only mul, div, and mod reduce to shifts"),
    };
    let rhs = program.int_const(Rc::new(rhs), pos);
    rewrite_inst(
        program,
        block,
        index,
        inst,
        InstKind::Binary {
            op,
            args: [lhs, rhs],
        },
        pos,
    );
}

fn rewrite_neg(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    inst: InstRef,
    arg: InstRef,
    pos: Pos,
) {
    rewrite_inst(
        program,
        block,
        index,
        inst,
        InstKind::Unary {
            op: UnaryOp::Neg,
            arg: [arg],
        },
        pos,
    );
}

/// Replaces all uses of `old` with the existing value `new` and drops
/// `old` from the block body.
fn replace_inst(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    old: InstRef,
    new: InstRef,
) {
    program.replace_uses(old, new);
    program.clear_operands(old);
    program.block_mut(block).body.remove(index);
    program.block_mut(block).frame.replace_value(old, new);
}

/// Replaces `old` with a freshly built instruction in the same body slot.
fn rewrite_inst(
    program: &mut Program,
    block: BlockRef,
    index: usize,
    old: InstRef,
    kind: InstKind,
    pos: Pos,
) -> InstRef {
    let new = program.new_inst(kind, pos);
    program.replace_uses(old, new);
    program.clear_operands(old);
    program.block_mut(block).body[index] = new;
    program.block_mut(block).frame.replace_value(old, new);
    new
}
