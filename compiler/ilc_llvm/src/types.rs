//! Interned type table mapping `ilc_ssa` type handles to LLVM types.
//!
//! Structural types are interned on their [`TypeData`] so equal types get
//! equal handles. Named structs are never interned; each call creates a
//! fresh opaque LLVM struct.

use inkwell::types::{BasicTypeEnum, FunctionType};
use ilc_ssa::{TypeClass, TypeData, TypeId};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy)]
pub(crate) enum LlvmType<'ctx> {
    Void,
    Basic(BasicTypeEnum<'ctx>),
    Function(FunctionType<'ctx>),
}

#[derive(Default)]
pub(crate) struct TypeTable<'ctx> {
    data: Vec<TypeData>,
    llvm: Vec<LlvmType<'ctx>>,
    interned: FxHashMap<TypeData, TypeId>,
}

impl<'ctx> TypeTable<'ctx> {
    pub fn lookup(&self, data: &TypeData) -> Option<TypeId> {
        self.interned.get(data).copied()
    }

    /// Register a structural type. Callers check [`lookup`](Self::lookup) first.
    pub fn intern(&mut self, data: TypeData, llvm: LlvmType<'ctx>) -> TypeId {
        let id = self.push(data.clone(), llvm);
        self.interned.insert(data, id);
        id
    }

    /// Register a type without interning it (named structs).
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn push(&mut self, data: TypeData, llvm: LlvmType<'ctx>) -> TypeId {
        let id = TypeId::new(self.data.len() as u32);
        self.data.push(data);
        self.llvm.push(llvm);
        id
    }

    #[inline]
    pub fn data(&self, ty: TypeId) -> &TypeData {
        debug_assert!(ty.index() < self.data.len(), "TypeId {} out of range", ty.raw());
        &self.data[ty.index()]
    }

    #[inline]
    pub fn llvm(&self, ty: TypeId) -> LlvmType<'ctx> {
        self.llvm[ty.index()]
    }

    /// The LLVM type of a first-class value of type `ty`.
    pub fn basic(&self, ty: TypeId) -> Option<BasicTypeEnum<'ctx>> {
        match self.llvm(ty) {
            LlvmType::Basic(basic) => Some(basic),
            LlvmType::Void | LlvmType::Function(_) => None,
        }
    }

    pub fn function(&self, ty: TypeId) -> Option<FunctionType<'ctx>> {
        match self.llvm(ty) {
            LlvmType::Function(f) => Some(f),
            LlvmType::Void | LlvmType::Basic(_) => None,
        }
    }

    /// Record a named struct's member list.
    pub fn set_struct_body(&mut self, ty: TypeId, fields: &[TypeId], is_packed: bool) {
        if let TypeData::Struct { body, packed, .. } = &mut self.data[ty.index()] {
            *body = Some(fields.to_vec());
            *packed = is_packed;
        }
    }

    pub fn classify(&self, ty: TypeId) -> TypeClass {
        match self.data(ty) {
            TypeData::Void => TypeClass::Void,
            TypeData::Int(bits) => TypeClass::Int(*bits),
            TypeData::Float(bits) => TypeClass::Float(*bits),
            TypeData::Pointer(_) => TypeClass::Pointer,
            TypeData::Array { .. } => TypeClass::Array,
            TypeData::Function { .. } => TypeClass::Function,
            TypeData::Struct { .. } => TypeClass::Struct,
        }
    }
}
