//! `nop`, `dup`, `pop`, `sizeof`.

use ilc_meta::{Instruction, TypeSig};
use ilc_ssa::Backend;

use super::CodeEmitter;
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::ir_type;
use crate::CodegenResult;

pub struct Nop;

impl CodeEmitter for Nop {
    fn emit(&self, _: &Instruction, _: &mut MethodContext<'_, '_>, _: &mut dyn Backend) -> CodegenResult<()> {
        Ok(())
    }
}

pub struct Dup;

impl CodeEmitter for Dup {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, _: &mut dyn Backend) -> CodegenResult<()> {
        let top = ctx.pop()?;
        ctx.push(top.clone());
        ctx.push(top);
        Ok(())
    }
}

pub struct Pop;

impl CodeEmitter for Pop {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, _: &mut dyn Backend) -> CodegenResult<()> {
        ctx.pop()?;
        Ok(())
    }
}

/// Byte size of a value type, as laid out by the backend.
pub struct SizeOf;

impl CodeEmitter for SizeOf {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        let ty = ir_type(ctx.cx, b, sig)?;
        let size = b.size_of(ty);
        let i32_ty = b.int_type(32);
        #[allow(clippy::cast_possible_wrap, reason = "type sizes fit in i64")]
        let value = b.const_int(i32_ty, size as i64);
        ctx.push(StackElement::new(value, TypeSig::I4, i32_ty));
        Ok(())
    }
}
