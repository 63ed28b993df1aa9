//! `ceq`, `cgt`, `clt` and their unsigned forms, plus the comparison
//! lowering shared with the compare-and-branch instructions.

use ilc_meta::{Instruction, Opcode, TypeSig};
use ilc_ssa::{Backend, CastOp, FloatPredicate, IntPredicate, ValueId};

use super::CodeEmitter;
use crate::cast::{coerce, help_int_cast, help_possible_ptr_cast};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::is_signed;
use crate::CodegenResult;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Relation {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

fn int_predicate(relation: Relation, unsigned: bool) -> IntPredicate {
    match (relation, unsigned) {
        (Relation::Eq, _) => IntPredicate::Eq,
        (Relation::Ne, _) => IntPredicate::Ne,
        (Relation::Gt, false) => IntPredicate::Sgt,
        (Relation::Gt, true) => IntPredicate::Ugt,
        (Relation::Ge, false) => IntPredicate::Sge,
        (Relation::Ge, true) => IntPredicate::Uge,
        (Relation::Lt, false) => IntPredicate::Slt,
        (Relation::Lt, true) => IntPredicate::Ult,
        (Relation::Le, false) => IntPredicate::Sle,
        (Relation::Le, true) => IntPredicate::Ule,
    }
}

/// For floats the `.un` forms are true when the operands are unordered.
/// Inequality always is.
fn float_predicate(relation: Relation, unordered: bool) -> FloatPredicate {
    match (relation, unordered) {
        (Relation::Eq, false) => FloatPredicate::Oeq,
        (Relation::Eq, true) => FloatPredicate::Ueq,
        (Relation::Ne, _) => FloatPredicate::Une,
        (Relation::Gt, false) => FloatPredicate::Ogt,
        (Relation::Gt, true) => FloatPredicate::Ugt,
        (Relation::Ge, false) => FloatPredicate::Oge,
        (Relation::Ge, true) => FloatPredicate::Uge,
        (Relation::Lt, false) => FloatPredicate::Olt,
        (Relation::Lt, true) => FloatPredicate::Ult,
        (Relation::Le, false) => FloatPredicate::Ole,
        (Relation::Le, true) => FloatPredicate::Ule,
    }
}

/// Compare two stack elements, producing an `i1`.
pub(super) fn compare_values(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    mut lhs: StackElement,
    mut rhs: StackElement,
    relation: Relation,
    unsigned: bool,
) -> ValueId {
    let asm = ctx.asm();
    if lhs.sig.is_float() || rhs.sig.is_float() {
        let bits = if lhs.sig == TypeSig::R4 && rhs.sig == TypeSig::R4 { 32 } else { 64 };
        let ty = b.float_type(bits);
        let l = coerce(b, lhs.value, ty, is_signed(asm, &lhs.sig));
        let r = coerce(b, rhs.value, ty, is_signed(asm, &rhs.sig));
        return b.fcmp(float_predicate(relation, unsigned), l, r);
    }

    let lhs_ptr = b.classify(lhs.ty).is_pointer();
    let rhs_ptr = b.classify(rhs.ty).is_pointer();
    if lhs_ptr && rhs_ptr && matches!(relation, Relation::Eq | Relation::Ne) {
        let r = if lhs.ty == rhs.ty {
            rhs.value
        } else {
            b.cast(CastOp::BitCast, rhs.value, lhs.ty)
        };
        return b.icmp(int_predicate(relation, unsigned), lhs.value, r);
    }
    let (lhs_ptr, rhs_ptr) = help_possible_ptr_cast(asm, b, &mut lhs, &mut rhs);
    // Addresses compare unsigned.
    let unsigned = unsigned || lhs_ptr || rhs_ptr;
    help_int_cast(asm, b, &mut lhs, &mut rhs);
    b.icmp(int_predicate(relation, unsigned), lhs.value, rhs.value)
}

pub struct Compare;

impl CodeEmitter for Compare {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let (relation, unsigned) = match instr.opcode {
            Opcode::Ceq => (Relation::Eq, false),
            Opcode::Cgt => (Relation::Gt, false),
            Opcode::CgtUn => (Relation::Gt, true),
            Opcode::Clt => (Relation::Lt, false),
            Opcode::CltUn => (Relation::Lt, true),
            _ => return Err(ctx.malformed("not a comparison")),
        };
        let rhs = ctx.pop()?;
        let lhs = ctx.pop()?;
        let flag = compare_values(ctx, b, lhs, rhs, relation, unsigned);
        let i32_ty = b.int_type(32);
        let value = b.int_cast(flag, i32_ty, false);
        ctx.push(StackElement::new(value, TypeSig::I4, i32_ty));
        Ok(())
    }
}
