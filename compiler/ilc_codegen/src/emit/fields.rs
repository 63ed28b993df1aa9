//! Instance and static field access.
//!
//! Instance fields are addressed with a struct GEP on the declaring type
//! at the index the layout engine assigns. Static fields are globals.

use ilc_meta::{Assembly, FieldId, Instruction, TypeSig};
use ilc_ssa::{Backend, TypeId, ValueId};

use super::CodeEmitter;
use crate::cast::{coerce, to_stack};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::{ir_type, is_signed, underlying};
use crate::types::static_field;
use crate::CodegenResult;

/// Address of `field` within `object`. Value-type receivers are spilled to
/// a temporary first.
fn field_address(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    object: &StackElement,
    field: FieldId,
) -> CodegenResult<ValueId> {
    let asm = ctx.asm();
    let declaring = asm.field(field).declaring_type;
    let struct_ty = ctx.cx.lookup.get_type(asm, declaring)?;
    let index = ctx.cx.layouts.field_index(asm, field)?;
    let base = if b.classify(object.ty).is_pointer() {
        object.value
    } else {
        let spill = b.alloca(object.ty, "spill");
        b.store(spill, object.value, false);
        spill
    };
    let ptr_ty = b.pointer_type(struct_ty);
    let base = coerce(b, base, ptr_ty, false);
    Ok(b.struct_gep(struct_ty, base, index))
}

pub struct LoadField;

impl CodeEmitter for LoadField {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let object = ctx.pop()?;
        let address = field_address(ctx, b, &object, field)?;
        let sig = &ctx.asm().field(field).ty;
        let ty = ir_type(ctx.cx, b, sig)?;
        let value = b.load(ty, address);
        let element = to_stack(ctx.asm(), b, value, sig);
        ctx.push(element);
        Ok(())
    }
}

pub struct LoadFieldAddress;

impl CodeEmitter for LoadFieldAddress {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let object = ctx.pop()?;
        let address = field_address(ctx, b, &object, field)?;
        let ty = b.type_of(address);
        ctx.push(StackElement::new(address, TypeSig::by_ref(ctx.asm().field(field).ty.clone()), ty));
        Ok(())
    }
}

pub struct StoreField;

impl CodeEmitter for StoreField {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let value = ctx.pop()?;
        let object = ctx.pop()?;
        let address = field_address(ctx, b, &object, field)?;
        let ty = ir_type(ctx.cx, b, &ctx.asm().field(field).ty)?;
        let stored = coerce(b, value.value, ty, is_signed(ctx.asm(), &value.sig));
        b.store(address, stored, instr.volatile);
        Ok(())
    }
}

pub struct LoadStatic;

impl CodeEmitter for LoadStatic {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let global = static_field(ctx.cx, b, field)?;
        let sig = &ctx.asm().field(field).ty;
        let ty = ir_type(ctx.cx, b, sig)?;
        let value = b.load(ty, global);
        let element = to_stack(ctx.asm(), b, value, sig);
        ctx.push(element);
        Ok(())
    }
}

pub struct LoadStaticAddress;

impl CodeEmitter for LoadStaticAddress {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let global = static_field(ctx.cx, b, field)?;
        let ty = b.type_of(global);
        ctx.push(StackElement::new(global, TypeSig::by_ref(ctx.asm().field(field).ty.clone()), ty));
        Ok(())
    }
}

/// `stsfld`. Inside a static constructor, a constant stored to a
/// primitive or string field becomes the global's initializer.
pub struct StoreStatic;

impl CodeEmitter for StoreStatic {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let field = ctx.field_operand(instr)?;
        let value = ctx.pop()?;
        let asm = ctx.asm();
        let global = static_field(ctx.cx, b, field)?;
        let sig = &asm.field(field).ty;
        let ty = ir_type(ctx.cx, b, sig)?;

        if ctx.def().is_static_constructor() && foldable(asm, sig) {
            if let Some(constant) = constant_of(b, &value, ty) {
                if ctx.cx.lookup.fold_static(field) {
                    b.set_initializer(global, constant);
                    tracing::debug!(field = %asm.field(field).name, "folded static initializer");
                    return Ok(());
                }
                tracing::warn!(
                    field = %asm.field(field).name,
                    "static field has a second constant initializer; keeping the first and storing at run time"
                );
            }
        }

        let stored = coerce(b, value.value, ty, is_signed(asm, &value.sig));
        b.store(global, stored, instr.volatile);
        Ok(())
    }
}

fn foldable(asm: &Assembly, sig: &TypeSig) -> bool {
    let sig = underlying(asm, sig);
    sig.is_primitive() || sig == TypeSig::String
}

/// `value` as a constant of type `ty`, if it is one.
fn constant_of(b: &mut dyn Backend, value: &StackElement, ty: TypeId) -> Option<ValueId> {
    let class = b.classify(ty);
    if let Some(v) = b.const_int_value(value.value) {
        if class.is_int() {
            return Some(b.const_int(ty, v));
        }
        #[allow(clippy::cast_precision_loss, reason = "matches the run-time conversion")]
        let v = v as f64;
        return class.is_float().then(|| b.const_float(ty, v));
    }
    if let Some(v) = b.const_float_value(value.value) {
        return class.is_float().then(|| b.const_float(ty, v));
    }
    (b.is_constant(value.value) && b.type_of(value.value) == ty).then_some(value.value)
}
