//! `ldc.*`, `ldnull`, `ldstr`.

use ilc_meta::{Instruction, Opcode, Operand, TypeSig};
use ilc_ssa::Backend;

use super::CodeEmitter;
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::CodegenResult;

pub struct LoadConstant;

impl CodeEmitter for LoadConstant {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let element = match (instr.opcode, &instr.operand) {
            (Opcode::LdcI8, Operand::Int64(v)) => {
                let ty = b.int_type(64);
                StackElement::new(b.const_int(ty, *v), TypeSig::I8, ty)
            }
            (Opcode::LdcR4, Operand::Float32(v)) => {
                let ty = b.float_type(32);
                StackElement::new(b.const_float(ty, f64::from(*v)), TypeSig::R4, ty)
            }
            (Opcode::LdcR8, Operand::Float64(v)) => {
                let ty = b.float_type(64);
                StackElement::new(b.const_float(ty, *v), TypeSig::R8, ty)
            }
            (opcode, operand) => {
                let v = match (opcode, operand) {
                    (Opcode::LdcI4 | Opcode::LdcI4S, Operand::Int32(v)) => *v,
                    (Opcode::LdcI4M1, _) => -1,
                    (Opcode::LdcI40, _) => 0,
                    (Opcode::LdcI41, _) => 1,
                    (Opcode::LdcI42, _) => 2,
                    (Opcode::LdcI43, _) => 3,
                    (Opcode::LdcI44, _) => 4,
                    (Opcode::LdcI45, _) => 5,
                    (Opcode::LdcI46, _) => 6,
                    (Opcode::LdcI47, _) => 7,
                    (Opcode::LdcI48, _) => 8,
                    _ => return Err(ctx.malformed("constant operand does not match the opcode")),
                };
                let ty = b.int_type(32);
                StackElement::new(b.const_int(ty, i64::from(v)), TypeSig::I4, ty)
            }
        };
        ctx.push(element);
        Ok(())
    }
}

pub struct LoadNull;

impl CodeEmitter for LoadNull {
    fn emit(&self, _: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let ty = b.generic_pointer();
        let null = b.const_null(ty);
        ctx.push(StackElement::new(null, TypeSig::Object, ty));
        Ok(())
    }
}

pub struct LoadString;

impl CodeEmitter for LoadString {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let Operand::String(text) = &instr.operand else {
            return Err(ctx.malformed("expected a string literal"));
        };
        let value = b.const_string(text);
        let ty = b.type_of(value);
        ctx.push(StackElement::new(value, TypeSig::String, ty));
        Ok(())
    }
}
