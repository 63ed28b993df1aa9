//! The symbol table shared by every translation phase.
//!
//! `Lookup` is the single owner of name and handle registrations. Adding
//! a key twice is a [`CodegenError::Duplicate`]; reading a key that a
//! previous phase was required to register yields the matching
//! "not found" error. Functions and static fields are the exception:
//! they are declared on first use, so their getters return `Option`.

use ilc_meta::{Assembly, FieldId, MethodId, TypeDefId};
use ilc_ssa::{FunctionId, TypeId, ValueId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::vtable::VTable;
use crate::{CodegenError, CodegenResult};

#[derive(Default)]
pub struct Lookup {
    functions: FxHashMap<String, FunctionId>,
    static_fields: FxHashMap<FieldId, ValueId>,
    types: FxHashMap<TypeDefId, TypeId>,
    vtables: FxHashMap<TypeDefId, VTable>,
    slot_tables: FxHashMap<TypeDefId, TypeId>,
    newobj: FxHashMap<TypeDefId, FunctionId>,
    cctors: Vec<MethodId>,
    interfaces: FxHashMap<TypeDefId, u32>,
    virtual_call_owners: FxHashSet<TypeDefId>,
    folded_statics: FxHashSet<FieldId>,
}

fn duplicate(kind: &'static str, name: impl Into<String>) -> CodegenError {
    CodegenError::Duplicate {
        kind,
        name: name.into(),
    }
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Functions ───────────────────────────────────────────────────

    pub fn add_function(&mut self, name: &str, function: FunctionId) -> CodegenResult<()> {
        if self.functions.contains_key(name) {
            return Err(duplicate("function", name));
        }
        self.functions.insert(name.to_owned(), function);
        Ok(())
    }

    pub fn get_function(&self, name: &str) -> Option<FunctionId> {
        self.functions.get(name).copied()
    }

    // ── Static fields ───────────────────────────────────────────────

    pub fn add_static_field(&mut self, asm: &Assembly, field: FieldId, global: ValueId) -> CodegenResult<()> {
        if self.static_fields.contains_key(&field) {
            return Err(duplicate("static field", &asm.field(field).name));
        }
        self.static_fields.insert(field, global);
        Ok(())
    }

    pub fn get_static_field(&self, field: FieldId) -> Option<ValueId> {
        self.static_fields.get(&field).copied()
    }

    /// Record a constant store into `field`'s initializer. Returns `false`
    /// if the field was already folded; later writes become plain stores.
    pub fn fold_static(&mut self, field: FieldId) -> bool {
        self.folded_statics.insert(field)
    }

    // ── Types ───────────────────────────────────────────────────────

    pub fn add_type(&mut self, asm: &Assembly, ty: TypeDefId, handle: TypeId) -> CodegenResult<()> {
        if self.types.contains_key(&ty) {
            return Err(duplicate("type", asm.type_def(ty).full_name()));
        }
        self.types.insert(ty, handle);
        Ok(())
    }

    pub fn get_type(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<TypeId> {
        self.types
            .get(&ty)
            .copied()
            .ok_or_else(|| CodegenError::TypeNotFound(asm.type_def(ty).full_name()))
    }

    // ── Vtables ─────────────────────────────────────────────────────

    pub fn add_vtable(&mut self, asm: &Assembly, ty: TypeDefId, vtable: VTable) -> CodegenResult<()> {
        if self.vtables.contains_key(&ty) {
            return Err(duplicate("vtable", asm.type_def(ty).full_name()));
        }
        self.vtables.insert(ty, vtable);
        Ok(())
    }

    pub fn get_vtable(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<&VTable> {
        self.vtables
            .get(&ty)
            .ok_or_else(|| CodegenError::VTableNotFound(asm.type_def(ty).full_name()))
    }

    pub fn has_vtable(&self, ty: TypeDefId) -> bool {
        self.vtables.contains_key(&ty)
    }

    /// Slot-table struct type introduced by `owner`, if already built.
    pub fn slot_table(&self, owner: TypeDefId) -> Option<TypeId> {
        self.slot_tables.get(&owner).copied()
    }

    pub fn add_slot_table(&mut self, asm: &Assembly, owner: TypeDefId, ty: TypeId) -> CodegenResult<()> {
        if self.slot_tables.contains_key(&owner) {
            return Err(duplicate("slot table", asm.type_def(owner).full_name()));
        }
        self.slot_tables.insert(owner, ty);
        Ok(())
    }

    // ── Allocation routines ─────────────────────────────────────────

    pub fn add_newobj(&mut self, asm: &Assembly, ty: TypeDefId, function: FunctionId) -> CodegenResult<()> {
        if self.newobj.contains_key(&ty) {
            return Err(duplicate("allocation routine", asm.type_def(ty).full_name()));
        }
        self.newobj.insert(ty, function);
        Ok(())
    }

    pub fn get_newobj(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<FunctionId> {
        self.newobj
            .get(&ty)
            .copied()
            .ok_or_else(|| CodegenError::NewobjNotFound(asm.type_def(ty).full_name()))
    }

    pub fn has_newobj(&self, ty: TypeDefId) -> bool {
        self.newobj.contains_key(&ty)
    }

    // ── Static constructors ─────────────────────────────────────────

    pub fn add_cctor(&mut self, method: MethodId) {
        self.cctors.push(method);
    }

    /// Static constructors in registration order.
    pub fn cctors(&self) -> &[MethodId] {
        &self.cctors
    }

    // ── Interfaces ──────────────────────────────────────────────────

    /// Assign the next interface index to `interface`.
    #[allow(clippy::cast_possible_truncation, reason = "interface counts fit in u32")]
    pub fn add_interface(&mut self, asm: &Assembly, interface: TypeDefId) -> CodegenResult<u32> {
        if self.interfaces.contains_key(&interface) {
            return Err(duplicate("interface", asm.type_def(interface).full_name()));
        }
        let index = self.interfaces.len() as u32;
        self.interfaces.insert(interface, index);
        Ok(index)
    }

    pub fn interface_index(&self, asm: &Assembly, interface: TypeDefId) -> CodegenResult<u32> {
        self.interfaces
            .get(&interface)
            .copied()
            .ok_or_else(|| CodegenError::InterfaceNotIndexed(asm.type_def(interface).full_name()))
    }

    #[allow(clippy::cast_possible_truncation, reason = "interface counts fit in u32")]
    pub fn interface_count(&self) -> u32 {
        self.interfaces.len() as u32
    }

    // ── Virtual dispatch marks ──────────────────────────────────────

    /// Record that some `callvirt` dispatches through a slot introduced by
    /// `owner`.
    pub fn mark_virtual_call(&mut self, owner: TypeDefId) {
        self.virtual_call_owners.insert(owner);
    }

    /// Whether instances of `ty` can be the receiver of a virtual call,
    /// i.e. `ty` or one of its ancestors owns a marked slot.
    pub fn needs_virtual_call(&self, asm: &Assembly, ty: TypeDefId) -> bool {
        asm.self_and_ancestors(ty)
            .any(|t| self.virtual_call_owners.contains(&t))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
