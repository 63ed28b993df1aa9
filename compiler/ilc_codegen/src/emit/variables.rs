//! Argument and local access.

use ilc_meta::{Instruction, Opcode, Operand, TypeSig};
use ilc_ssa::Backend;

use super::CodeEmitter;
use crate::cast::{coerce, to_stack};
use crate::method::{MethodContext, Variable};
use crate::stack::StackElement;
use crate::type_map::is_signed;
use crate::CodegenResult;

#[derive(Copy, Clone)]
enum Kind {
    Arg,
    Local,
}

fn slot_index(instr: &Instruction, kind: Kind) -> Option<usize> {
    let implicit = match instr.opcode {
        Opcode::Ldarg0 | Opcode::Ldloc0 | Opcode::Stloc0 => Some(0),
        Opcode::Ldarg1 | Opcode::Ldloc1 | Opcode::Stloc1 => Some(1),
        Opcode::Ldarg2 | Opcode::Ldloc2 | Opcode::Stloc2 => Some(2),
        Opcode::Ldarg3 | Opcode::Ldloc3 | Opcode::Stloc3 => Some(3),
        _ => None,
    };
    implicit.or(match (kind, &instr.operand) {
        (Kind::Arg, Operand::Arg(i)) | (Kind::Local, Operand::Local(i)) => Some(usize::from(*i)),
        _ => None,
    })
}

fn variable(ctx: &MethodContext<'_, '_>, instr: &Instruction, kind: Kind) -> CodegenResult<Variable> {
    let (slots, what) = match kind {
        Kind::Arg => (&ctx.args, "argument"),
        Kind::Local => (&ctx.locals, "local"),
    };
    slot_index(instr, kind)
        .and_then(|i| slots.get(i))
        .cloned()
        .ok_or_else(|| ctx.malformed(format!("no such {what}")))
}

fn load(instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, kind: Kind) -> CodegenResult<()> {
    let var = variable(ctx, instr, kind)?;
    let value = b.load(var.ty, var.ptr);
    let element = to_stack(ctx.asm(), b, value, &var.sig);
    ctx.push(element);
    Ok(())
}

fn load_address(instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, kind: Kind) -> CodegenResult<()> {
    let var = variable(ctx, instr, kind)?;
    let ty = b.type_of(var.ptr);
    ctx.push(StackElement::new(var.ptr, TypeSig::by_ref(var.sig), ty));
    Ok(())
}

fn store(instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, kind: Kind) -> CodegenResult<()> {
    let var = variable(ctx, instr, kind)?;
    let element = ctx.pop()?;
    let value = coerce(b, element.value, var.ty, is_signed(ctx.asm(), &element.sig));
    b.store(var.ptr, value, instr.volatile);
    Ok(())
}

pub struct LoadArg;

impl CodeEmitter for LoadArg {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        load(instr, ctx, b, Kind::Arg)
    }
}

pub struct LoadArgAddress;

impl CodeEmitter for LoadArgAddress {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        load_address(instr, ctx, b, Kind::Arg)
    }
}

pub struct StoreArg;

impl CodeEmitter for StoreArg {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        store(instr, ctx, b, Kind::Arg)
    }
}

pub struct LoadLocal;

impl CodeEmitter for LoadLocal {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        load(instr, ctx, b, Kind::Local)
    }
}

pub struct LoadLocalAddress;

impl CodeEmitter for LoadLocalAddress {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        load_address(instr, ctx, b, Kind::Local)
    }
}

pub struct StoreLocal;

impl CodeEmitter for StoreLocal {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        store(instr, ctx, b, Kind::Local)
    }
}
