//! Branches, `switch` and `ret`.
//!
//! Every edge reconciles the evaluation stack into its target before the
//! terminator is emitted, so casts needed by phis land in this block.

use ilc_meta::{Instruction, Opcode, Operand, TypeSig};
use ilc_ssa::{Backend, BlockId, FloatPredicate, IntPredicate, ValueId};

use super::compare::{compare_values, Relation};
use super::CodeEmitter;
use crate::cast::coerce;
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::{ir_type, is_signed};
use crate::CodegenResult;

/// Branch to `target` when `cond` holds, otherwise fall through.
fn conditional(ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, cond: ValueId, target: usize) -> CodegenResult<()> {
    let next = ctx.index + 1;
    let then_block = ctx.reconcile(b, target)?;
    if target == next {
        b.br(then_block);
        return Ok(());
    }
    let else_block = ctx.reconcile(b, next)?;
    b.cond_br(cond, then_block, else_block);
    Ok(())
}

/// Test `value` against zero, null or `0.0`: inequality for `brtrue`,
/// equality for `brfalse`.
fn test_zero(b: &mut dyn Backend, value: &StackElement, is_zero: bool) -> ValueId {
    if b.classify(value.ty).is_float() {
        let zero = b.const_float(value.ty, 0.0);
        let pred = if is_zero { FloatPredicate::Oeq } else { FloatPredicate::Une };
        b.fcmp(pred, value.value, zero)
    } else {
        let zero = b.const_null(value.ty);
        let pred = if is_zero { IntPredicate::Eq } else { IntPredicate::Ne };
        b.icmp(pred, value.value, zero)
    }
}

pub struct Branch;

impl CodeEmitter for Branch {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let target = ctx.target_operand(instr)?;
        let block = ctx.reconcile(b, target)?;
        b.br(block);
        Ok(())
    }
}

/// `brtrue` and `brfalse`.
pub struct BranchIf;

impl CodeEmitter for BranchIf {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let target = ctx.target_operand(instr)?;
        let value = ctx.pop()?;
        let is_zero = matches!(instr.opcode, Opcode::Brfalse | Opcode::BrfalseS);
        let cond = test_zero(b, &value, is_zero);
        conditional(ctx, b, cond, target)
    }
}

/// `beq`, `bge`, ... and their short and unsigned forms.
pub struct CompareBranch;

impl CodeEmitter for CompareBranch {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let (relation, unsigned) = match instr.opcode {
            Opcode::Beq | Opcode::BeqS => (Relation::Eq, false),
            Opcode::Bge | Opcode::BgeS => (Relation::Ge, false),
            Opcode::Bgt | Opcode::BgtS => (Relation::Gt, false),
            Opcode::Ble | Opcode::BleS => (Relation::Le, false),
            Opcode::Blt | Opcode::BltS => (Relation::Lt, false),
            Opcode::BneUn | Opcode::BneUnS => (Relation::Ne, true),
            Opcode::BgeUn | Opcode::BgeUnS => (Relation::Ge, true),
            Opcode::BgtUn | Opcode::BgtUnS => (Relation::Gt, true),
            Opcode::BleUn | Opcode::BleUnS => (Relation::Le, true),
            Opcode::BltUn | Opcode::BltUnS => (Relation::Lt, true),
            _ => return Err(ctx.malformed("not a compare-and-branch")),
        };
        let target = ctx.target_operand(instr)?;
        let rhs = ctx.pop()?;
        let lhs = ctx.pop()?;
        let cond = compare_values(ctx, b, lhs, rhs, relation, unsigned);
        conditional(ctx, b, cond, target)
    }
}

fn edge(
    ctx: &mut MethodContext<'_, '_>,
    b: &mut dyn Backend,
    reconciled: &mut Vec<(usize, BlockId)>,
    target: usize,
) -> CodegenResult<BlockId> {
    if let Some((_, block)) = reconciled.iter().find(|(t, _)| *t == target) {
        return Ok(*block);
    }
    let block = ctx.reconcile(b, target)?;
    reconciled.push((target, block));
    Ok(block)
}

pub struct Switch;

impl CodeEmitter for Switch {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let Operand::Switch(targets) = &instr.operand else {
            return Err(ctx.malformed("expected a jump table"));
        };
        let selector = ctx.pop()?;
        let i32_ty = b.int_type(32);
        let value = coerce(b, selector.value, i32_ty, is_signed(ctx.asm(), &selector.sig));

        // Each distinct target is one edge.
        let mut reconciled: Vec<(usize, BlockId)> = Vec::new();
        let mut cases = Vec::with_capacity(targets.len());
        for (case, target) in targets.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap, reason = "jump tables are far smaller than i64::MAX")]
            let case = case as i64;
            cases.push((case, edge(ctx, b, &mut reconciled, *target)?));
        }
        let next = ctx.index + 1;
        let default = edge(ctx, b, &mut reconciled, next)?;
        b.switch(value, default, &cases);
        Ok(())
    }
}

pub struct Return;

impl CodeEmitter for Return {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let ret = &ctx.def().return_type;
        if *ret == TypeSig::Void {
            b.ret(None);
            return Ok(());
        }
        let ty = ir_type(ctx.cx, b, ret)?;
        let element = ctx.pop()?;
        let value = coerce(b, element.value, ty, is_signed(ctx.asm(), &element.sig));
        b.ret(Some(value));
        Ok(())
    }
}
