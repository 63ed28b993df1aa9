//! Virtual and interface dispatch tables.
//!
//! Every class or interface that introduces virtual slots owns a
//! *slot-table type*: a named struct `%{Owner}_vtable` with one function
//! pointer per introduced slot, in declaration order. A class that needs
//! dispatch gets one constant *instance* of each slot-table type along its
//! base chain, filled with the most-derived implementations, and stores a
//! pointer to each instance in the matching `ClassVTableSlot` of its
//! objects.
//!
//! Interfaces are reached through one more hop. Each class implementing
//! interfaces gets an `{Class}_ivtable_{Iface}` instance per interface and
//! an indirection table `{Class}_itable`, a `[N x ptr]` array indexed by the
//! program-wide interface index. Objects hold a pointer to their
//! indirection table in struct member 0.

use ilc_meta::{MethodId, TypeDefId, TypeKind};
use ilc_ssa::{Backend, TypeId, ValueId};

use crate::context::CodegenContext;
use crate::method::declare_function;
use crate::naming;
use crate::type_map::function_type;
use crate::{CodegenError, CodegenResult};

/// One slot table: the slots an owner introduced and, for classes, the
/// constant instance holding the implementations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotTable {
    pub owner: TypeDefId,
    pub table_ty: TypeId,
    pub slots: Vec<MethodId>,
    pub instance: Option<ValueId>,
}

impl SlotTable {
    /// Position of `slot` in this table.
    #[allow(clippy::cast_possible_truncation, reason = "slot counts fit in u32")]
    pub fn slot_index(&self, slot: MethodId) -> Option<u32> {
        self.slots.iter().position(|s| *s == slot).map(|i| i as u32)
    }
}

/// An interface's slot-table instance as implemented by a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceTable {
    pub interface: TypeDefId,
    pub index: u32,
    pub instance: ValueId,
}

/// Dispatch tables of one class or interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VTable {
    owner: TypeDefId,
    tables: Vec<SlotTable>,
    interfaces: Vec<InterfaceTable>,
    indirection: Option<ValueId>,
}

impl VTable {
    pub fn owner(&self) -> TypeDefId {
        self.owner
    }

    /// Slot tables along the base chain, base first. For an interface this
    /// is its own table only.
    pub fn tables(&self) -> &[SlotTable] {
        &self.tables
    }

    pub fn table(&self, owner: TypeDefId) -> Option<&SlotTable> {
        self.tables.iter().find(|t| t.owner == owner)
    }

    pub fn interfaces(&self) -> &[InterfaceTable] {
        &self.interfaces
    }

    /// The `[N x ptr]` indirection table, for classes with interfaces.
    pub fn indirection(&self) -> Option<ValueId> {
        self.indirection
    }
}

/// The slot-table struct type introduced by `owner`, created on first use.
pub fn slot_table_type(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, owner: TypeDefId) -> CodegenResult<TypeId> {
    if let Some(ty) = cx.lookup.slot_table(owner) {
        return Ok(ty);
    }
    let asm = cx.asm;
    let ty = b.named_struct(&naming::vtable_type_name(asm, owner));
    // Registered before the body so that slot signatures mentioning the
    // owner do not recurse.
    cx.lookup.add_slot_table(asm, owner, ty)?;
    let fields = asm
        .introduced_slots(owner)
        .into_iter()
        .map(|slot| {
            let fn_ty = function_type(cx, b, asm.method(slot))?;
            Ok(b.pointer_type(fn_ty))
        })
        .collect::<CodegenResult<Vec<_>>>()?;
    b.set_struct_body(ty, &fields, false);
    Ok(ty)
}

/// Build the dispatch tables of `ty`.
///
/// Interfaces get their slot-table type only. Classes get one instance
/// per slot-owning ancestor, then the interface tables and indirection
/// table when they implement interfaces.
pub fn build(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, ty: TypeDefId) -> CodegenResult<VTable> {
    let asm = cx.asm;
    let def = asm.type_def(ty);
    tracing::debug!(ty = %def.full_name(), "building vtable");

    if def.kind() == TypeKind::Interface {
        let table_ty = slot_table_type(cx, b, ty)?;
        return Ok(VTable {
            owner: ty,
            tables: vec![SlotTable {
                owner: ty,
                table_ty,
                slots: asm.introduced_slots(ty),
                instance: None,
            }],
            interfaces: Vec::new(),
            indirection: None,
        });
    }

    // Slot-table structure along the chain, base first.
    let mut owners: Vec<TypeDefId> = asm
        .self_and_ancestors(ty)
        .filter(|t| !asm.is_root(*t) && !asm.introduced_slots(*t).is_empty())
        .collect();
    owners.reverse();

    let mut tables = Vec::with_capacity(owners.len());
    for owner in owners {
        let table_ty = slot_table_type(cx, b, owner)?;
        let slots = asm.introduced_slots(owner);
        let values = slot_values(cx, b, ty, &slots)?;
        let init = b.const_struct(table_ty, &values);
        let instance = b.add_global(&naming::vtable_instance_name(asm, ty, owner), table_ty);
        b.set_initializer(instance, init);
        tables.push(SlotTable {
            owner,
            table_ty,
            slots,
            instance: Some(instance),
        });
    }

    let implemented = asm.all_interfaces(ty);
    let mut interfaces = Vec::with_capacity(implemented.len());
    for iface in implemented {
        let table_ty = slot_table_type(cx, b, iface)?;
        let values = slot_values(cx, b, ty, &asm.introduced_slots(iface))?;
        let init = b.const_struct(table_ty, &values);
        let instance = b.add_global(&naming::interface_table_name(asm, ty, iface), table_ty);
        b.set_initializer(instance, init);
        interfaces.push(InterfaceTable {
            interface: iface,
            index: cx.lookup.interface_index(asm, iface)?,
            instance,
        });
    }

    let indirection = if interfaces.is_empty() {
        None
    } else {
        Some(indirection_table(cx, b, ty, &interfaces))
    };

    Ok(VTable {
        owner: ty,
        tables,
        interfaces,
        indirection,
    })
}

/// Function pointers implementing `slots` for instances of `class`.
/// Abstract implementations are null.
fn slot_values(
    cx: &mut CodegenContext<'_>,
    b: &mut dyn Backend,
    class: TypeDefId,
    slots: &[MethodId],
) -> CodegenResult<Vec<ValueId>> {
    let asm = cx.asm;
    slots
        .iter()
        .map(|slot| match asm.implementation(class, *slot) {
            Some(m) if asm.method(m).is_abstract() && asm.method(m).body.is_none() => {
                let fn_ty = function_type(cx, b, asm.method(*slot))?;
                let ptr_ty = b.pointer_type(fn_ty);
                Ok(b.const_null(ptr_ty))
            }
            Some(m) => {
                let f = declare_function(cx, b, m)?;
                Ok(b.function_value(f))
            }
            None => Err(CodegenError::MethodSlotNotFound {
                type_name: asm.type_def(class).full_name(),
                method: asm.method(*slot).name.clone(),
            }),
        })
        .collect()
}

fn indirection_table(
    cx: &CodegenContext<'_>,
    b: &mut dyn Backend,
    class: TypeDefId,
    interfaces: &[InterfaceTable],
) -> ValueId {
    let ptr = b.generic_pointer();
    let count = cx.lookup.interface_count();
    let items: Vec<ValueId> = (0..count)
        .map(|index| match interfaces.iter().find(|t| t.index == index) {
            Some(table) => table.instance,
            None => b.const_null(ptr),
        })
        .collect();
    let array_ty = b.array_type(ptr, u64::from(count));
    let init = b.const_array(ptr, &items);
    let global = b.add_global(&naming::indirection_table_name(cx.asm, class), array_ty);
    b.set_initializer(global, init);
    global
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
