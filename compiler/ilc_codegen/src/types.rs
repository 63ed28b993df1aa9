//! Two-phase type translation.
//!
//! The declaration phase gives every user type an IR handle (an opaque
//! named struct, or the underlying integer for enums) so that later
//! definitions can refer to any type regardless of declaration order. It
//! also assigns interface indices, registers static constructors and
//! marks the slot owners targeted by `callvirt`.
//!
//! The definition phase fills in struct bodies from the flattened layouts,
//! builds vtables, and creates static field globals.

use ilc_meta::{FieldId, Opcode, Operand, TypeDefId, TypeKind, TypeSig};
use ilc_ssa::{Backend, FunctionId, Linkage, TypeId, ValueId};
use rustc_hash::FxHashSet;

use crate::context::CodegenContext;
use crate::layout::{StructEntry, INDIRECTION_SLOT};
use crate::type_map::{enum_underlying, ir_type};
use crate::vtable::{self, slot_table_type};
use crate::{naming, CodegenError, CodegenResult};

// ── Declaration ─────────────────────────────────────────────────────

/// Declare every user type. Must run before any other phase.
pub fn declare_types(cx: &mut CodegenContext<'_>, b: &mut dyn Backend) -> CodegenResult<()> {
    let asm = cx.asm;
    for (id, def) in asm.user_types() {
        let handle = match def.kind() {
            TypeKind::Enum => {
                let underlying = enum_underlying(asm, id);
                ir_type(cx, b, &underlying)?
            }
            TypeKind::Interface => {
                cx.lookup.add_interface(asm, id)?;
                b.named_struct(&naming::type_name(asm, id))
            }
            TypeKind::Class | TypeKind::Struct => b.named_struct(&naming::type_name(asm, id)),
        };
        cx.lookup.add_type(asm, id, handle)?;
        tracing::debug!(ty = %def.full_name(), kind = ?def.kind(), "declared type");

        for method in def.methods() {
            if asm.method(*method).is_static_constructor() {
                cx.lookup.add_cctor(*method);
            }
        }
    }
    mark_virtual_calls(cx);
    Ok(())
}

/// Record the owner of every class slot some `callvirt` dispatches through.
fn mark_virtual_calls(cx: &mut CodegenContext<'_>) {
    let asm = cx.asm;
    let targets = asm
        .methods()
        .filter_map(|(_, def)| def.body.as_ref())
        .flat_map(|body| &body.instructions)
        .filter(|instr| instr.opcode == Opcode::Callvirt);
    for instr in targets {
        let Operand::Method(target) = instr.operand else {
            continue;
        };
        let Some(slot) = asm.slot_method(target) else {
            continue;
        };
        let owner = asm.method(slot).declaring_type;
        if asm.type_def(owner).kind() == TypeKind::Class {
            cx.lookup.mark_virtual_call(owner);
        }
    }
}

// ── Definition ──────────────────────────────────────────────────────

/// Define every declared type, bases and embedded value types first.
pub fn compile_types(cx: &mut CodegenContext<'_>, b: &mut dyn Backend) -> CodegenResult<()> {
    let mut done = FxHashSet::default();
    let mut visiting = FxHashSet::default();
    for (id, _) in cx.asm.user_types() {
        compile_in_order(cx, b, id, &mut done, &mut visiting)?;
    }
    Ok(())
}

fn compile_in_order(
    cx: &mut CodegenContext<'_>,
    b: &mut dyn Backend,
    ty: TypeDefId,
    done: &mut FxHashSet<TypeDefId>,
    visiting: &mut FxHashSet<TypeDefId>,
) -> CodegenResult<()> {
    let asm = cx.asm;
    if asm.is_root(ty) || done.contains(&ty) {
        return Ok(());
    }
    if !visiting.insert(ty) {
        return Err(CodegenError::CyclicInheritance(asm.type_def(ty).full_name()));
    }
    let def = asm.type_def(ty);
    let mut dependencies: Vec<TypeDefId> = def.base().into_iter().collect();
    dependencies.extend(def.fields().iter().filter_map(|f| {
        let field = asm.field(*f);
        match field.ty {
            TypeSig::Named(inner) if !field.is_static && asm.type_def(inner).kind() == TypeKind::Struct => {
                Some(inner)
            }
            _ => None,
        }
    }));
    for dependency in dependencies {
        compile_in_order(cx, b, dependency, done, visiting)?;
    }
    compile_type(cx, b, ty)?;
    visiting.remove(&ty);
    done.insert(ty);
    Ok(())
}

/// Define one type.
pub fn compile_type(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, ty: TypeDefId) -> CodegenResult<()> {
    let asm = cx.asm;
    let def = asm.type_def(ty);
    let name = def.full_name();
    let packed = match def.packing() {
        None | Some(0) => false,
        Some(1) => true,
        Some(packing) => {
            return Err(CodegenError::UnsupportedPacking {
                type_name: name,
                packing,
            })
        }
    };
    if def.class_size().is_some() && def.kind() != TypeKind::Struct {
        return Err(CodegenError::FixedSizeOnNonStruct { type_name: name });
    }

    match def.kind() {
        TypeKind::Enum => return Ok(()),
        TypeKind::Interface => {
            let table = vtable::build(cx, b, ty)?;
            return cx.lookup.add_vtable(asm, ty, table);
        }
        TypeKind::Class | TypeKind::Struct => {}
    }

    let dispatch = requires_vtable(cx, ty);
    if dispatch {
        let table = vtable::build(cx, b, ty)?;
        cx.lookup.add_vtable(asm, ty, table)?;
    }

    let layout = cx.layouts.struct_layout(asm, ty)?;
    let mut body = Vec::with_capacity(layout.len());
    let mut instance_fields = Vec::new();
    for entry in layout.iter() {
        match *entry {
            StructEntry::ClassVTableSlot(owner) if dispatch => {
                let table_ty = slot_table_type(cx, b, owner)?;
                body.push(b.pointer_type(table_ty));
            }
            StructEntry::ClassVTableSlot(_) | StructEntry::InterfaceIndirectionSlot => {
                body.push(b.generic_pointer());
            }
            StructEntry::Field(field) if asm.field(field).is_static => {
                static_field(cx, b, field)?;
            }
            StructEntry::Field(field) => {
                let field_ty = ir_type(cx, b, &asm.field(field).ty)?;
                body.push(field_ty);
                instance_fields.push((field, field_ty));
            }
            StructEntry::Barrier(_) => {}
        }
    }

    if let Some(size) = def.class_size() {
        let padding = fixed_size_padding(cx, b, u64::from(size), &instance_fields);
        let byte = b.int_type(8);
        body.extend((0..padding).map(|_| byte));
    }

    let handle = cx.lookup.get_type(asm, ty)?;
    b.set_struct_body(handle, &body, packed);
    tracing::debug!(ty = %name, members = body.len(), packed, dispatch, "defined type");
    Ok(())
}

/// Classes need dispatch tables when they can receive a virtual call or
/// implement an interface.
fn requires_vtable(cx: &CodegenContext<'_>, ty: TypeDefId) -> bool {
    let asm = cx.asm;
    asm.type_def(ty).kind() == TypeKind::Class
        && (cx.lookup.needs_virtual_call(asm, ty) || !asm.all_interfaces(ty).is_empty())
}

/// Bytes of single-byte padding needed to reach a declared size.
///
/// A struct made of exactly one `char` field counts half the declared
/// size.
fn fixed_size_padding(
    cx: &CodegenContext<'_>,
    b: &dyn Backend,
    declared: u64,
    fields: &[(FieldId, TypeId)],
) -> u64 {
    let target = match fields {
        [(field, _)] if cx.asm.field(*field).ty == TypeSig::Char => declared / 2,
        _ => declared,
    };
    let total: u64 = fields.iter().map(|(_, ty)| b.size_of(*ty)).sum();
    target.saturating_sub(total)
}

/// Global storage of a static field, created on first request.
pub fn static_field(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, field: FieldId) -> CodegenResult<ValueId> {
    if let Some(global) = cx.lookup.get_static_field(field) {
        return Ok(global);
    }
    let asm = cx.asm;
    let ty = ir_type(cx, b, &asm.field(field).ty)?;
    let global = b.add_global(&naming::static_field_name(asm, field), ty);
    cx.lookup.add_static_field(asm, field, global)?;
    tracing::trace!(field = %asm.field(field).name, "allocated static field");
    Ok(global)
}

/// The allocation routine of class `ty`, generated on first request.
///
/// `newobj_{Type}` allocates a zeroed object and stores the vtable and
/// indirection table pointers. The builder position is restored
/// afterwards, so this is safe to call while emitting another function.
pub fn newobj_function(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, ty: TypeDefId) -> CodegenResult<FunctionId> {
    let asm = cx.asm;
    if cx.lookup.has_newobj(ty) {
        return cx.lookup.get_newobj(asm, ty);
    }
    let struct_ty = cx.lookup.get_type(asm, ty)?;
    let object_ty = b.pointer_type(struct_ty);
    let fn_ty = b.function_type(object_ty, &[]);
    let function = b.add_function(&naming::newobj_name(asm, ty), fn_ty, Linkage::Internal);
    cx.lookup.add_newobj(asm, ty, function)?;

    let saved = b.current_block();
    let entry = b.append_block(function, "entry");
    b.position_at_end(entry);
    let object = b.heap_alloc(struct_ty, None);

    if cx.lookup.has_vtable(ty) {
        let stores: Vec<(u32, ValueId)> = {
            let table = cx.lookup.get_vtable(asm, ty)?;
            let mut stores = Vec::new();
            for slot in table.tables() {
                if let Some(instance) = slot.instance {
                    stores.push((cx.layouts.class_vtable_index(asm, slot.owner)?, instance));
                }
            }
            if let Some(itable) = table.indirection() {
                stores.push((INDIRECTION_SLOT, itable));
            }
            stores
        };
        for (index, table) in stores {
            let slot = b.struct_gep(struct_ty, object, index);
            b.store(slot, table, false);
        }
    }

    b.ret(Some(object));
    if let Some(block) = saved {
        b.position_at_end(block);
    }
    tracing::debug!(ty = %asm.type_def(ty).full_name(), "generated allocation routine");
    Ok(function)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
