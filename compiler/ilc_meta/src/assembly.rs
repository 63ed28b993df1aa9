//! The assembly: arenas of type, field and method definitions plus
//! hierarchy queries over them.

use rustc_hash::FxHashSet;

use crate::{
    FieldDef, FieldId, FlowControl, Instruction, MethodDef, MethodId, Operand, TypeDef, TypeDefId, TypeKind,
    TypeSig,
};

const OBJECT: TypeDefId = TypeDefId::new(0);
const VALUE_TYPE: TypeDefId = TypeDefId::new(1);
const ENUM: TypeDefId = TypeDefId::new(2);
const ROOT_COUNT: u32 = 3;

/// Structural problems in a loaded assembly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaError {
    #[error("{kind} id {id} referenced from {context} is out of range")]
    DanglingId {
        kind: &'static str,
        id: u32,
        context: String,
    },
    #[error("assembly is missing the hierarchy root `{0}`")]
    MissingRoot(&'static str),
    #[error("instruction {index} of `{method}` has an operand that does not fit `{opcode}`")]
    OperandMismatch {
        method: String,
        index: usize,
        opcode: &'static str,
    },
}

/// A translation unit: every type the translator will see.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assembly {
    name: String,
    types: Vec<TypeDef>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
}

impl Assembly {
    /// Create an assembly holding only the hierarchy roots.
    pub fn new(name: impl Into<String>) -> Self {
        let mut asm = Assembly {
            name: name.into(),
            types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        };
        asm.push_type(TypeDef::class("System", "Object"));
        asm.push_type(TypeDef::class("System", "ValueType"));
        asm.push_type(TypeDef::class("System", "Enum").with_base(VALUE_TYPE));
        asm
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `System.Object`.
    #[inline]
    pub fn object_type(&self) -> TypeDefId {
        OBJECT
    }

    /// `System.ValueType`.
    #[inline]
    pub fn value_type(&self) -> TypeDefId {
        VALUE_TYPE
    }

    /// `System.Enum`.
    #[inline]
    pub fn enum_type(&self) -> TypeDefId {
        ENUM
    }

    /// One of the pre-registered core-library types.
    #[inline]
    pub fn is_root(&self, id: TypeDefId) -> bool {
        id.raw() < ROOT_COUNT
    }

    // ── Construction ────────────────────────────────────────────────

    /// Register a type. Classes without an explicit base derive from
    /// `System.Object`, structs from `System.ValueType` and enums from
    /// `System.Enum`. Interfaces stay base-less.
    pub fn add_type(&mut self, mut def: TypeDef) -> TypeDefId {
        if def.base.is_none() {
            def.base = match def.kind() {
                TypeKind::Class => Some(OBJECT),
                TypeKind::Struct => Some(VALUE_TYPE),
                TypeKind::Enum => Some(ENUM),
                TypeKind::Interface => None,
            };
        }
        self.push_type(def)
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn push_type(&mut self, def: TypeDef) -> TypeDefId {
        let id = TypeDefId::new(self.types.len() as u32);
        self.types.push(def);
        id
    }

    /// Add a field to `ty`, in declaration order.
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn add_field(&mut self, ty: TypeDefId, mut field: FieldDef) -> FieldId {
        let id = FieldId::new(self.fields.len() as u32);
        field.declaring_type = ty;
        self.fields.push(field);
        self.types[ty.index()].fields.push(id);
        id
    }

    /// Add a method to `ty`, in declaration order.
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn add_method(&mut self, ty: TypeDefId, mut method: MethodDef) -> MethodId {
        let id = MethodId::new(self.methods.len() as u32);
        method.declaring_type = ty;
        self.methods.push(method);
        self.types[ty.index()].methods.push(id);
        id
    }

    /// Mutable access for attaching bodies after every method is declared,
    /// so bodies can reference methods declared later.
    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDef {
        &mut self.methods[id.index()]
    }

    // ── Access ──────────────────────────────────────────────────────

    #[inline]
    pub fn type_def(&self, id: TypeDefId) -> &TypeDef {
        &self.types[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.index()]
    }

    /// All types in registration order, roots included.
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn types(&self) -> impl Iterator<Item = (TypeDefId, &TypeDef)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, def)| (TypeDefId::new(i as u32), def))
    }

    /// All types except the hierarchy roots.
    pub fn user_types(&self) -> impl Iterator<Item = (TypeDefId, &TypeDef)> {
        self.types().filter(|(id, _)| !self.is_root(*id))
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodDef)> {
        self.methods
            .iter()
            .enumerate()
            .map(|(i, def)| (MethodId::new(i as u32), def))
    }

    /// Find a method declared directly on `ty` by name.
    pub fn method_named(&self, ty: TypeDefId, name: &str) -> Option<MethodId> {
        self.type_def(ty)
            .methods()
            .iter()
            .copied()
            .find(|m| self.method(*m).name == name)
    }

    /// Find a field declared directly on `ty` by name.
    pub fn field_named(&self, ty: TypeDefId, name: &str) -> Option<FieldId> {
        self.type_def(ty)
            .fields()
            .iter()
            .copied()
            .find(|f| self.field(*f).name == name)
    }

    // ── Hierarchy ───────────────────────────────────────────────────

    /// Walk the base chain of `ty`, nearest ancestor first.
    ///
    /// The walk stops if it would revisit a type, so a malformed cyclic
    /// hierarchy terminates; callers that must reject cycles check for them
    /// explicitly.
    pub fn ancestors(&self, ty: TypeDefId) -> Ancestors<'_> {
        let mut seen = FxHashSet::default();
        seen.insert(ty);
        Ancestors {
            asm: self,
            next: self.type_def(ty).base(),
            seen,
        }
    }

    /// `ty` followed by its ancestors.
    pub fn self_and_ancestors(&self, ty: TypeDefId) -> impl Iterator<Item = TypeDefId> + '_ {
        std::iter::once(ty).chain(self.ancestors(ty))
    }

    /// Every interface `ty` implements: its own, those of its ancestors and
    /// those inherited by interfaces from other interfaces. Order follows
    /// declaration order, base types last, without duplicates.
    pub fn all_interfaces(&self, ty: TypeDefId) -> Vec<TypeDefId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut pending: Vec<TypeDefId> = Vec::new();
        for t in self.self_and_ancestors(ty) {
            pending.extend(self.type_def(t).interfaces().iter().rev());
            while let Some(iface) = pending.pop() {
                if seen.insert(iface) {
                    out.push(iface);
                    pending.extend(self.type_def(iface).interfaces().iter().rev());
                }
            }
        }
        out
    }

    // ── Virtual slots ───────────────────────────────────────────────

    /// The method that introduced the vtable slot `method` occupies.
    ///
    /// Interface methods and virtual methods that do not override anything
    /// own their slot. Returns `None` for non-virtual class methods.
    pub fn slot_method(&self, method: MethodId) -> Option<MethodId> {
        let def = self.method(method);
        let owner_kind = self.type_def(def.declaring_type).kind();
        if owner_kind == TypeKind::Interface {
            return (!def.is_static()).then_some(method);
        }
        if !def.is_virtual() {
            return None;
        }
        if def.is_new_slot() {
            return Some(method);
        }
        for ancestor in self.ancestors(def.declaring_type) {
            let found = self.type_def(ancestor).methods().iter().copied().find(|m| {
                let candidate = self.method(*m);
                candidate.is_virtual() && candidate.same_signature(def)
            });
            if let Some(base) = found {
                return self.slot_method(base);
            }
        }
        Some(method)
    }

    /// Whether `method` starts a new vtable slot on its declaring type.
    pub fn introduces_slot(&self, method: MethodId) -> bool {
        self.slot_method(method) == Some(method)
    }

    /// Slots introduced by `ty`, in declaration order.
    pub fn introduced_slots(&self, ty: TypeDefId) -> Vec<MethodId> {
        self.type_def(ty)
            .methods()
            .iter()
            .copied()
            .filter(|m| self.introduces_slot(*m))
            .collect()
    }

    /// The most-derived implementation of `slot` as seen from `ty`.
    ///
    /// Class slots match through [`Assembly::slot_method`]; interface slots
    /// match the first instance method with the same signature on `ty` or
    /// an ancestor.
    pub fn implementation(&self, ty: TypeDefId, slot: MethodId) -> Option<MethodId> {
        let slot_def = self.method(slot);
        let interface_slot = self.type_def(slot_def.declaring_type).kind() == TypeKind::Interface;
        self.self_and_ancestors(ty).find_map(|t| {
            self.type_def(t).methods().iter().copied().find(|m| {
                if interface_slot {
                    let def = self.method(*m);
                    !def.is_static() && def.same_signature(slot_def)
                } else {
                    self.slot_method(*m) == Some(slot)
                }
            })
        })
    }

    // ── Validation ──────────────────────────────────────────────────

    /// Check that every cross-reference points into the arenas. Assemblies
    /// built through the `add_*` methods are always valid; loaded ones
    /// should be validated before use.
    pub fn validate(&self) -> Result<(), MetaError> {
        for (root, name) in [
            (OBJECT, "System.Object"),
            (VALUE_TYPE, "System.ValueType"),
            (ENUM, "System.Enum"),
        ] {
            match self.types.get(root.index()) {
                Some(def) if def.full_name() == name => {}
                _ => return Err(MetaError::MissingRoot(name)),
            }
        }
        for (_, def) in self.types() {
            let context = def.full_name();
            if let Some(base) = def.base() {
                self.check_type(base, &context)?;
            }
            for iface in def.interfaces() {
                self.check_type(*iface, &context)?;
            }
            for field in def.fields() {
                check("field", field.raw(), self.fields.len(), &context)?;
            }
            for method in def.methods() {
                check("method", method.raw(), self.methods.len(), &context)?;
            }
        }
        for field in &self.fields {
            self.check_sig(&field.ty, &field.name)?;
        }
        for method in &self.methods {
            self.check_type(method.declaring_type, &method.name)?;
            self.check_sig(&method.return_type, &method.name)?;
            for param in &method.params {
                self.check_sig(&param.ty, &method.name)?;
            }
            if let Some(body) = &method.body {
                for local in &body.locals {
                    self.check_sig(local, &method.name)?;
                }
                for (index, instr) in body.instructions.iter().enumerate() {
                    self.check_operand(instr, index, body.instructions.len(), &method.name)?;
                }
            }
        }
        Ok(())
    }

    fn check_type(&self, id: TypeDefId, context: &str) -> Result<(), MetaError> {
        check("type", id.raw(), self.types.len(), context)
    }

    fn check_sig(&self, sig: &TypeSig, context: &str) -> Result<(), MetaError> {
        match sig {
            TypeSig::Named(id) => self.check_type(*id, context),
            TypeSig::Pointer(inner) | TypeSig::ByRef(inner) | TypeSig::Array(inner) => {
                self.check_sig(inner, context)
            }
            _ => Ok(()),
        }
    }

    #[allow(clippy::cast_possible_truncation, reason = "branch targets fit in u32")]
    fn check_operand(
        &self,
        instr: &Instruction,
        index: usize,
        len: usize,
        method: &str,
    ) -> Result<(), MetaError> {
        let needs_target = matches!(
            instr.opcode.flow(),
            FlowControl::Branch | FlowControl::CondBranch | FlowControl::Switch
        );
        match &instr.operand {
            Operand::Field(f) => check("field", f.raw(), self.fields.len(), method),
            Operand::Method(m) => check("method", m.raw(), self.methods.len(), method),
            Operand::Type(sig) => self.check_sig(sig, method),
            Operand::Target(_) | Operand::Switch(_) => {
                for target in instr.targets() {
                    check("branch target", *target as u32, len, method)?;
                }
                Ok(())
            }
            _ if needs_target => Err(MetaError::OperandMismatch {
                method: method.to_owned(),
                index,
                opcode: instr.opcode.mnemonic(),
            }),
            _ => Ok(()),
        }
    }
}

fn check(kind: &'static str, id: u32, len: usize, context: &str) -> Result<(), MetaError> {
    if (id as usize) < len {
        Ok(())
    } else {
        Err(MetaError::DanglingId {
            kind,
            id,
            context: context.to_owned(),
        })
    }
}

/// Iterator over a type's ancestors, see [`Assembly::ancestors`].
pub struct Ancestors<'a> {
    asm: &'a Assembly,
    next: Option<TypeDefId>,
    seen: FxHashSet<TypeDefId>,
}

impl Iterator for Ancestors<'_> {
    type Item = TypeDefId;

    fn next(&mut self) -> Option<TypeDefId> {
        let current = self.next?;
        if !self.seen.insert(current) {
            self.next = None;
            return None;
        }
        self.next = self.asm.type_def(current).base();
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
