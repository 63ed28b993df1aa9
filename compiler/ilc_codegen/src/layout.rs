//! Flattened object layouts.
//!
//! The layout of a type is the ordered entry list that its IR struct body
//! is built from. A derived layout always starts with its base layout
//! verbatim, so a pointer to a derived object is usable wherever a
//! pointer to the base is expected:
//!
//! ```text
//! layout(T) = layout(base(T))
//!           ++ [InterfaceIndirectionSlot]   if T is a class directly under a root
//!           ++ [ClassVTableSlot(T)]         if T introduces virtual slots
//!           ++ [Field(f) for f in fields(T) unless f is compiler-generated]
//!           ++ [Barrier(T)]
//! ```
//!
//! Root types (`System.Object`, `System.ValueType`, `System.Enum`) and
//! interfaces contribute nothing, so the indirection slot of a class is
//! always at struct index [`INDIRECTION_SLOT`].
//!
//! Static fields appear as entries but are not members of the struct
//! body. Struct member indices therefore count every entry except
//! barriers and static fields.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ilc_meta::{Assembly, FieldId, TypeDefId, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{CodegenError, CodegenResult};

/// Struct member index of the interface indirection table pointer.
pub const INDIRECTION_SLOT: u32 = 0;

/// One entry of a flattened layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructEntry {
    /// A field declared by some type in the chain. Static fields are kept
    /// so that the owning type can create their globals.
    Field(FieldId),
    /// Pointer to the slot table of the slots introduced by this type.
    ClassVTableSlot(TypeDefId),
    /// Pointer to the interface indirection table.
    InterfaceIndirectionSlot,
    /// End of the entries contributed by this type. Occupies no storage.
    Barrier(TypeDefId),
}

/// Memoizing layout calculator.
///
/// Layouts are pure functions of the assembly, so they are computed once
/// and shared. Inheritance cycles are reported as
/// [`CodegenError::CyclicInheritance`] instead of recursing forever.
#[derive(Default)]
pub struct LayoutEngine {
    cache: RefCell<FxHashMap<TypeDefId, Rc<[StructEntry]>>>,
    resolving: RefCell<FxHashSet<TypeDefId>>,
    computed: Cell<usize>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layouts computed so far (cache misses).
    pub fn computed(&self) -> usize {
        self.computed.get()
    }

    pub fn struct_layout(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<Rc<[StructEntry]>> {
        if let Some(cached) = self.cache.borrow().get(&ty) {
            return Ok(Rc::clone(cached));
        }
        if !self.resolving.borrow_mut().insert(ty) {
            return Err(CodegenError::CyclicInheritance(asm.type_def(ty).full_name()));
        }
        let result = self.compute(asm, ty);
        self.resolving.borrow_mut().remove(&ty);

        let layout: Rc<[StructEntry]> = result?.into();
        self.computed.set(self.computed.get() + 1);
        self.cache.borrow_mut().insert(ty, Rc::clone(&layout));
        Ok(layout)
    }

    fn compute(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<Vec<StructEntry>> {
        let def = asm.type_def(ty);
        let Some(base) = def.base() else {
            return Ok(Vec::new());
        };
        if asm.is_root(ty) {
            return Ok(Vec::new());
        }

        let mut entries = self.struct_layout(asm, base)?.to_vec();
        if def.kind() == TypeKind::Class {
            if asm.is_root(base) {
                entries.push(StructEntry::InterfaceIndirectionSlot);
            }
            if !asm.introduced_slots(ty).is_empty() {
                entries.push(StructEntry::ClassVTableSlot(ty));
            }
        }
        entries.extend(
            def.fields()
                .iter()
                .filter(|f| !asm.field(**f).is_generated())
                .map(|f| StructEntry::Field(*f)),
        );
        entries.push(StructEntry::Barrier(ty));
        tracing::trace!(ty = %def.full_name(), entries = entries.len(), "computed layout");
        Ok(entries)
    }

    /// Struct member index of `field` in the layout of its declaring type.
    pub fn field_index(&self, asm: &Assembly, field: FieldId) -> CodegenResult<u32> {
        let def = asm.field(field);
        let layout = self.struct_layout(asm, def.declaring_type)?;
        member_index(asm, &layout, StructEntry::Field(field)).ok_or_else(|| {
            CodegenError::FieldNotInLayout {
                type_name: asm.type_def(def.declaring_type).full_name(),
                field: def.name.clone(),
            }
        })
    }

    /// Struct member index of the class vtable pointer introduced by `ty`.
    pub fn class_vtable_index(&self, asm: &Assembly, ty: TypeDefId) -> CodegenResult<u32> {
        let layout = self.struct_layout(asm, ty)?;
        member_index(asm, &layout, StructEntry::ClassVTableSlot(ty))
            .ok_or_else(|| CodegenError::VTableSlotNotFound(asm.type_def(ty).full_name()))
    }
}

/// Whether `entry` becomes a member of the IR struct body.
pub fn occupies_storage(asm: &Assembly, entry: StructEntry) -> bool {
    match entry {
        StructEntry::Field(f) => !asm.field(f).is_static,
        StructEntry::ClassVTableSlot(_) | StructEntry::InterfaceIndirectionSlot => true,
        StructEntry::Barrier(_) => false,
    }
}

#[allow(clippy::cast_possible_truncation, reason = "struct member counts fit in u32")]
fn member_index(asm: &Assembly, layout: &[StructEntry], wanted: StructEntry) -> Option<u32> {
    let mut index = 0u32;
    for entry in layout {
        if *entry == wanted {
            return occupies_storage(asm, *entry).then_some(index);
        }
        if occupies_storage(asm, *entry) {
            index += 1;
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
