//! One-dimensional arrays.
//!
//! An array is a pointer to its first element; there is no length header.

use ilc_meta::{Instruction, Opcode, TypeSig};
use ilc_ssa::{Backend, TypeId, ValueId};

use super::CodeEmitter;
use crate::cast::{coerce, to_native_int, to_stack};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::{ir_type, is_signed};
use crate::CodegenResult;

/// Element signature named by the opcode itself. `None` for the forms
/// that take a type token or use the array's own element type.
fn element_sig(opcode: Opcode) -> Option<TypeSig> {
    use Opcode as O;
    Some(match opcode {
        O::LdelemI1 | O::StelemI1 => TypeSig::I1,
        O::LdelemU1 => TypeSig::U1,
        O::LdelemI2 | O::StelemI2 => TypeSig::I2,
        O::LdelemU2 => TypeSig::U2,
        O::LdelemI4 | O::StelemI4 => TypeSig::I4,
        O::LdelemU4 => TypeSig::U4,
        O::LdelemI8 | O::StelemI8 => TypeSig::I8,
        O::LdelemI | O::StelemI => TypeSig::IntPtr,
        O::LdelemR4 | O::StelemR4 => TypeSig::R4,
        O::LdelemR8 | O::StelemR8 => TypeSig::R8,
        _ => return None,
    })
}

/// Address of element `index` of `array`, viewed as an array of `element`.
fn element_address(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    array: &StackElement,
    index: &StackElement,
    element: TypeId,
) -> ValueId {
    let base_ty = b.pointer_type(element);
    let base = coerce(b, array.value, base_ty, false);
    let index = to_native_int(b, index.value, is_signed(ctx.asm(), &index.sig));
    b.gep(element, base, index)
}

/// Element signature for an `ldelem`/`stelem`: the opcode's, the type
/// token's, or the array's element type.
fn resolve_element(ctx: &MethodContext<'_, '_>, instr: &Instruction, array: &StackElement) -> CodegenResult<TypeSig> {
    if let Some(sig) = element_sig(instr.opcode) {
        return Ok(sig);
    }
    if matches!(instr.opcode, Opcode::Ldelem | Opcode::Stelem) {
        return ctx.type_operand(instr).cloned();
    }
    Ok(array.sig.element().cloned().unwrap_or(TypeSig::Object))
}

/// `newarr T`: zeroed heap storage for `count` elements.
pub struct NewArray;

impl CodeEmitter for NewArray {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        let count = ctx.pop()?;
        let element = ir_type(ctx.cx, b, sig)?;
        let count = to_native_int(b, count.value, is_signed(ctx.asm(), &count.sig));
        let array = b.heap_alloc(element, Some(count));
        let ty = b.type_of(array);
        ctx.push(StackElement::new(array, TypeSig::array(sig.clone()), ty));
        Ok(())
    }
}

pub struct LoadElementAddress;

impl CodeEmitter for LoadElementAddress {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let sig = ctx.type_operand(instr)?;
        let index = ctx.pop()?;
        let array = ctx.pop()?;
        let element = ir_type(ctx.cx, b, sig)?;
        let address = element_address(ctx, b, &array, &index, element);
        let ty = b.type_of(address);
        ctx.push(StackElement::new(address, TypeSig::by_ref(sig.clone()), ty));
        Ok(())
    }
}

pub struct LoadElement;

impl CodeEmitter for LoadElement {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let index = ctx.pop()?;
        let array = ctx.pop()?;
        let sig = resolve_element(ctx, instr, &array)?;
        let element = ir_type(ctx.cx, b, &sig)?;
        let address = element_address(ctx, b, &array, &index, element);
        let value = b.load(element, address);
        let loaded = to_stack(ctx.asm(), b, value, &sig);
        ctx.push(loaded);
        Ok(())
    }
}

pub struct StoreElement;

impl CodeEmitter for StoreElement {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let value = ctx.pop()?;
        let index = ctx.pop()?;
        let array = ctx.pop()?;
        // `stelem.ref` stores the reference as it is on the stack.
        let element = if instr.opcode == Opcode::StelemRef {
            value.ty
        } else {
            let sig = resolve_element(ctx, instr, &array)?;
            ir_type(ctx.cx, b, &sig)?
        };
        let address = element_address(ctx, b, &array, &index, element);
        let stored = coerce(b, value.value, element, is_signed(ctx.asm(), &value.sig));
        b.store(address, stored, instr.volatile);
        Ok(())
    }
}
