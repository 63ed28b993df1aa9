//! Arithmetic, bitwise and shift operations.
//!
//! The same opcode serves integers, floats and pointers; the operand
//! signatures decide. Mixed-width integers are widened to the wider
//! operand. A pointer operand takes both sides through the native integer
//! type, and the result is turned back into the pointer's type unless
//! it is the difference of two pointers.

use ilc_meta::{Instruction, Opcode, TypeSig};
use ilc_ssa::{Backend, BinaryOp, CastOp, UnaryOp};

use super::CodeEmitter;
use crate::cast::{coerce, help_int_cast, help_possible_ptr_cast};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::is_signed;
use crate::CodegenResult;

fn int_op(opcode: Opcode) -> Option<BinaryOp> {
    Some(match opcode {
        Opcode::Add | Opcode::AddOvf | Opcode::AddOvfUn => BinaryOp::Add,
        Opcode::Sub | Opcode::SubOvf | Opcode::SubOvfUn => BinaryOp::Sub,
        Opcode::Mul | Opcode::MulOvf | Opcode::MulOvfUn => BinaryOp::Mul,
        Opcode::Div => BinaryOp::SDiv,
        Opcode::DivUn => BinaryOp::UDiv,
        Opcode::Rem => BinaryOp::SRem,
        Opcode::RemUn => BinaryOp::URem,
        Opcode::And => BinaryOp::And,
        Opcode::Or => BinaryOp::Or,
        Opcode::Xor => BinaryOp::Xor,
        Opcode::Shl => BinaryOp::Shl,
        Opcode::Shr => BinaryOp::AShr,
        Opcode::ShrUn => BinaryOp::LShr,
        _ => return None,
    })
}

fn float_op(op: BinaryOp) -> Option<BinaryOp> {
    Some(match op {
        BinaryOp::Add => BinaryOp::FAdd,
        BinaryOp::Sub => BinaryOp::FSub,
        BinaryOp::Mul => BinaryOp::FMul,
        BinaryOp::SDiv | BinaryOp::UDiv => BinaryOp::FDiv,
        BinaryOp::SRem | BinaryOp::URem => BinaryOp::FRem,
        _ => return None,
    })
}

pub struct Binary;

impl CodeEmitter for Binary {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let Some(op) = int_op(instr.opcode) else {
            return Err(ctx.malformed("not a binary operation"));
        };
        let mut rhs = ctx.pop()?;
        let mut lhs = ctx.pop()?;
        let asm = ctx.asm();

        if lhs.sig.is_float() || rhs.sig.is_float() {
            let Some(op) = float_op(op) else {
                return Err(ctx.malformed("bitwise operation on floating-point operands"));
            };
            let (sig, bits) = if lhs.sig == TypeSig::R8 || rhs.sig == TypeSig::R8 {
                (TypeSig::R8, 64)
            } else {
                (TypeSig::R4, 32)
            };
            let ty = b.float_type(bits);
            let l = coerce(b, lhs.value, ty, is_signed(asm, &lhs.sig));
            let r = coerce(b, rhs.value, ty, is_signed(asm, &rhs.sig));
            let value = b.binary(op, l, r);
            ctx.push(StackElement::new(value, sig, ty));
            return Ok(());
        }

        if matches!(op, BinaryOp::Shl | BinaryOp::AShr | BinaryOp::LShr) {
            let amount = coerce(b, rhs.value, lhs.ty, false);
            let value = b.binary(op, lhs.value, amount);
            ctx.push(StackElement::new(value, lhs.sig, lhs.ty));
            return Ok(());
        }

        let original = (lhs.clone(), rhs.clone());
        let (lhs_ptr, rhs_ptr) = help_possible_ptr_cast(asm, b, &mut lhs, &mut rhs);
        if !(lhs_ptr || rhs_ptr) {
            help_int_cast(asm, b, &mut lhs, &mut rhs);
        }
        let value = b.binary(op, lhs.value, rhs.value);

        let result = match (lhs_ptr, rhs_ptr) {
            (true, true) if op == BinaryOp::Sub => StackElement::new(value, TypeSig::IntPtr, lhs.ty),
            (true, _) | (_, true) => {
                let pointer = if lhs_ptr { original.0 } else { original.1 };
                let back = b.cast(CastOp::IntToPtr, value, pointer.ty);
                StackElement::new(back, pointer.sig, pointer.ty)
            }
            (false, false) => StackElement::new(value, lhs.sig, lhs.ty),
        };
        ctx.push(result);
        Ok(())
    }
}

pub struct Negate;

impl CodeEmitter for Negate {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let operand = ctx.pop()?;
        let op = if operand.sig.is_float() {
            UnaryOp::FNeg
        } else {
            UnaryOp::Neg
        };
        let value = b.unary(op, operand.value);
        ctx.push(StackElement::new(value, operand.sig, operand.ty));
        Ok(())
    }
}

pub struct Not;

impl CodeEmitter for Not {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let operand = ctx.pop()?;
        let value = b.unary(UnaryOp::Not, operand.value);
        ctx.push(StackElement::new(value, operand.sig, operand.ty));
        Ok(())
    }
}
