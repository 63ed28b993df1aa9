//! `call`, `callvirt` and `newobj`.
//!
//! Arguments are coerced to the callee's parameter types before the call.
//! `callvirt` on a method that occupies a vtable slot dispatches through
//! the receiver's tables; other `callvirt`s are direct calls.
//!
//! Class dispatch loads the slot owner's table pointer from the object at
//! the owner's `ClassVTableSlot` index. Interface dispatch loads the
//! indirection table from member 0, indexes it with the interface's
//! program-wide index, and calls through the interface table found there.

use ilc_meta::{Instruction, MethodDef, MethodId, TypeDefId, TypeKind, TypeSig};
use ilc_ssa::{Backend, TypeId, ValueId};

use super::CodeEmitter;
use crate::cast::{coerce, to_stack};
use crate::method::{declare_function, MethodContext};
use crate::stack::StackElement;
use crate::type_map::{arg_sigs, function_type, ir_type, is_signed, this_sig};
use crate::types::newobj_function;
use crate::{CodegenError, CodegenResult};

/// Coerce `args` to the parameter types of `callee`, `this` included.
fn coerce_args(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    callee: &MethodDef,
    args: &[StackElement],
) -> CodegenResult<Vec<ValueId>> {
    let asm = ctx.asm();
    let sigs = arg_sigs(asm, callee);
    let mut values = Vec::with_capacity(args.len());
    for (sig, arg) in sigs.iter().zip(args) {
        let ty = ir_type(ctx.cx, b, sig)?;
        values.push(coerce(b, arg.value, ty, is_signed(asm, &arg.sig)));
    }
    Ok(values)
}

fn push_result(ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, callee: &MethodDef, result: Option<ValueId>) {
    if callee.return_type == TypeSig::Void {
        return;
    }
    if let Some(value) = result {
        let element = to_stack(ctx.asm(), b, value, &callee.return_type);
        ctx.push(element);
    }
}

fn call_direct(ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend, target: MethodId) -> CodegenResult<()> {
    let asm = ctx.asm();
    let callee = asm.method(target);
    let args = ctx.pop_n(callee.arg_count())?;
    // Constructors of the hierarchy roots do nothing.
    if callee.is_constructor() && asm.is_root(callee.declaring_type) {
        return Ok(());
    }
    let function = declare_function(ctx.cx, b, target)?;
    let values = coerce_args(ctx, b, callee, &args)?;
    let result = b.call(function, &values);
    push_result(ctx, b, callee, result);
    Ok(())
}

pub struct Call;

impl CodeEmitter for Call {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let target = ctx.method_operand(instr)?;
        call_direct(ctx, b, target)
    }
}

pub struct CallVirtual;

impl CodeEmitter for CallVirtual {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let target = ctx.method_operand(instr)?;
        let asm = ctx.asm();
        let Some(slot) = asm.slot_method(target) else {
            return call_direct(ctx, b, target);
        };
        let slot_def = asm.method(slot);
        let owner = slot_def.declaring_type;
        let args = ctx.pop_n(slot_def.arg_count())?;
        let Some(this) = args.first() else {
            return Err(ctx.malformed("virtual call without a receiver"));
        };

        let (table_ty, slot_index) = {
            let vtable = ctx.cx.lookup.get_vtable(asm, owner)?;
            vtable
                .table(owner)
                .and_then(|table| Some((table.table_ty, table.slot_index(slot)?)))
                .ok_or_else(|| CodegenError::VTableSlotNotFound(asm.type_def(owner).full_name()))?
        };
        let table = if asm.type_def(owner).kind() == TypeKind::Interface {
            interface_table(ctx, b, this, owner, table_ty)?
        } else {
            class_table(ctx, b, this, owner, table_ty)?
        };

        let fn_ty = function_type(ctx.cx, b, slot_def)?;
        let fn_ptr_ty = b.pointer_type(fn_ty);
        let entry = b.struct_gep(table_ty, table, slot_index);
        let callee = b.load(fn_ptr_ty, entry);
        let values = coerce_args(ctx, b, slot_def, &args)?;
        let result = b.call_indirect(fn_ty, callee, &values);
        tracing::trace!(method = %slot_def.name, slot_index, "virtual call");
        push_result(ctx, b, slot_def, result);
        Ok(())
    }
}

/// The class slot table of `owner` as seen from the receiver `this`.
fn class_table(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    this: &StackElement,
    owner: TypeDefId,
    table_ty: TypeId,
) -> CodegenResult<ValueId> {
    let asm = ctx.asm();
    let struct_ty = ctx.cx.lookup.get_type(asm, owner)?;
    let index = ctx.cx.layouts.class_vtable_index(asm, owner)?;
    let object_ty = b.pointer_type(struct_ty);
    let object = coerce(b, this.value, object_ty, false);
    let member = b.struct_gep(struct_ty, object, index);
    let table_ptr_ty = b.pointer_type(table_ty);
    Ok(b.load(table_ptr_ty, member))
}

/// The receiver's table for `interface`, found through its indirection
/// table.
fn interface_table(
    ctx: &MethodContext<'_, '_>,
    b: &mut dyn Backend,
    this: &StackElement,
    interface: TypeDefId,
    table_ty: TypeId,
) -> CodegenResult<ValueId> {
    let asm = ctx.asm();
    let ptr = b.generic_pointer();
    let ptr_ptr = b.pointer_type(ptr);
    // Member 0 of every class object.
    let header = coerce(b, this.value, ptr_ptr, false);
    let itable = b.load(ptr, header);
    let itable = coerce(b, itable, ptr_ptr, false);

    let index = ctx.cx.lookup.interface_index(asm, interface)?;
    let index = b.const_int_of(32, i64::from(index));
    let entry = b.gep(ptr, itable, index);
    let table = b.load(ptr, entry);
    let table_ptr_ty = b.pointer_type(table_ty);
    Ok(coerce(b, table, table_ptr_ty, false))
}

/// `newobj`: allocate, run the constructor, push the new instance.
///
/// Classes are allocated through their generated allocation routine.
/// Value types are built in a temporary and pushed by value.
pub struct NewObject;

impl CodeEmitter for NewObject {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let ctor = ctx.method_operand(instr)?;
        let asm = ctx.asm();
        let def = asm.method(ctor);
        let ty = def.declaring_type;
        let args = ctx.pop_n(def.params.len())?;

        match asm.type_def(ty).kind() {
            TypeKind::Class => {
                let alloc = newobj_function(ctx.cx, b, ty)?;
                let Some(object) = b.call(alloc, &[]) else {
                    return Err(CodegenError::NewobjNotFound(asm.type_def(ty).full_name()));
                };
                construct(ctx, b, ctor, object, args)?;
                let object_ty = b.type_of(object);
                ctx.push(StackElement::new(object, TypeSig::Named(ty), object_ty));
            }
            TypeKind::Struct | TypeKind::Enum => {
                let value_ty = ir_type(ctx.cx, b, &TypeSig::Named(ty))?;
                let temp = b.alloca(value_ty, "newobj");
                let zero = b.const_null(value_ty);
                b.store(temp, zero, false);
                // The default value-type constructor is never emitted.
                if !def.params.is_empty() {
                    construct(ctx, b, ctor, temp, args)?;
                }
                let value = b.load(value_ty, temp);
                ctx.push(StackElement::new(value, TypeSig::Named(ty), value_ty));
            }
            TypeKind::Interface => return Err(ctx.malformed("cannot instantiate an interface")),
        }
        Ok(())
    }
}

fn construct(
    ctx: &mut MethodContext<'_, '_>,
    b: &mut dyn Backend,
    ctor: MethodId,
    this: ValueId,
    args: Vec<StackElement>,
) -> CodegenResult<()> {
    let asm = ctx.asm();
    let def = asm.method(ctor);
    let this_ty = b.type_of(this);
    let mut all = Vec::with_capacity(args.len() + 1);
    all.push(StackElement::new(this, this_sig(asm, def.declaring_type), this_ty));
    all.extend(args);
    let function = declare_function(ctx.cx, b, ctor)?;
    let values = coerce_args(ctx, b, def, &all)?;
    b.call(function, &values);
    Ok(())
}
