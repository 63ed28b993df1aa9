//! Indirect loads and stores through addresses on the stack.

use ilc_meta::{Assembly, Instruction, Opcode, TypeSig};
use ilc_ssa::{Backend, TypeId, ValueId};

use super::CodeEmitter;
use crate::cast::{coerce, to_stack};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::{ir_type, is_signed};
use crate::CodegenResult;

/// Signature accessed by `ldind.*`/`stind.*`. `None` for the `.ref` forms,
/// whose type comes from the operands.
fn indirect_sig(opcode: Opcode) -> Option<TypeSig> {
    use Opcode as O;
    Some(match opcode {
        O::LdindI1 | O::StindI1 => TypeSig::I1,
        O::LdindU1 => TypeSig::U1,
        O::LdindI2 | O::StindI2 => TypeSig::I2,
        O::LdindU2 => TypeSig::U2,
        O::LdindI4 | O::StindI4 => TypeSig::I4,
        O::LdindU4 => TypeSig::U4,
        O::LdindI8 | O::StindI8 => TypeSig::I8,
        O::LdindI | O::StindI => TypeSig::IntPtr,
        O::LdindR4 | O::StindR4 => TypeSig::R4,
        O::LdindR8 | O::StindR8 => TypeSig::R8,
        _ => return None,
    })
}

/// `address` as a pointer to `ty`.
fn typed_address(b: &mut dyn Backend, address: &StackElement, ty: TypeId) -> ValueId {
    let ptr_ty = b.pointer_type(ty);
    coerce(b, address.value, ptr_ty, false)
}

fn load_through(ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, sig: &TypeSig) -> CodegenResult<()> {
    let address = ctx.pop()?;
    let ty = ir_type(ctx.cx, b, sig)?;
    let ptr = typed_address(b, &address, ty);
    let value = b.load(ty, ptr);
    let element = to_stack(ctx.asm(), b, value, sig);
    ctx.push(element);
    Ok(())
}

fn store_through(
    asm: &Assembly,
    b: &mut dyn Backend,
    value: &StackElement,
    address: &StackElement,
    ty: TypeId,
    volatile: bool,
) {
    let value = coerce(b, value.value, ty, is_signed(asm, &value.sig));
    let ptr = typed_address(b, address, ty);
    b.store(ptr, value, volatile);
}

pub struct LoadIndirect;

impl CodeEmitter for LoadIndirect {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = match indirect_sig(instr.opcode) {
            Some(sig) => sig,
            None => ctx
                .stack
                .peek()
                .and_then(|address| address.sig.element())
                .cloned()
                .unwrap_or(TypeSig::Object),
        };
        load_through(ctx, b, &sig)
    }
}

pub struct StoreIndirect;

impl CodeEmitter for StoreIndirect {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let value = ctx.pop()?;
        let address = ctx.pop()?;
        let ty = match indirect_sig(instr.opcode) {
            Some(sig) => ir_type(ctx.cx, b, &sig)?,
            None => value.ty,
        };
        store_through(ctx.asm(), b, &value, &address, ty, instr.volatile);
        Ok(())
    }
}

pub struct LoadObject;

impl CodeEmitter for LoadObject {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        load_through(ctx, b, sig)
    }
}

pub struct StoreObject;

impl CodeEmitter for StoreObject {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        let value = ctx.pop()?;
        let address = ctx.pop()?;
        let ty = ir_type(ctx.cx, b, sig)?;
        store_through(ctx.asm(), b, &value, &address, ty, instr.volatile);
        Ok(())
    }
}

/// `initobj T`: zero the `T` at the popped address.
pub struct InitObject;

impl CodeEmitter for InitObject {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        let address = ctx.pop()?;
        let ty = ir_type(ctx.cx, b, sig)?;
        let ptr = typed_address(b, &address, ty);
        let zero = b.const_null(ty);
        b.store(ptr, zero, instr.volatile);
        Ok(())
    }
}
