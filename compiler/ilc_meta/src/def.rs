//! Type, field and method definitions.

use bitflags::bitflags;

use crate::{FieldId, Instruction, MethodId, TypeDefId, TypeSig};

bitflags! {
    /// Type attributes as read from metadata.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TypeFlags: u32 {
        /// Derives from `System.ValueType` (structs and enums).
        const VALUE_TYPE = 1 << 0;
        /// Derives from `System.Enum`.
        const ENUM = 1 << 1;
        const INTERFACE = 1 << 2;
        const ABSTRACT = 1 << 3;
        const SEALED = 1 << 4;
    }
}

bitflags! {
    /// Method attributes as read from metadata.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct MethodFlags: u32 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        const ABSTRACT = 1 << 2;
        /// Virtual method that starts a new slot instead of overriding.
        const NEW_SLOT = 1 << 3;
        const SPECIAL_NAME = 1 << 4;
    }
}

/// The four shapes a type definition can take.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeKind {
    Class,
    Struct,
    Enum,
    Interface,
}

impl TypeKind {
    /// Classify a type from its flags: a struct is a value type that is
    /// not an enum.
    pub fn from_flags(flags: TypeFlags) -> Self {
        if flags.contains(TypeFlags::INTERFACE) {
            TypeKind::Interface
        } else if flags.contains(TypeFlags::ENUM) {
            TypeKind::Enum
        } else if flags.contains(TypeFlags::VALUE_TYPE) {
            TypeKind::Struct
        } else {
            TypeKind::Class
        }
    }

    fn flags(self) -> TypeFlags {
        match self {
            TypeKind::Class => TypeFlags::empty(),
            TypeKind::Struct => TypeFlags::VALUE_TYPE,
            TypeKind::Enum => TypeFlags::VALUE_TYPE | TypeFlags::ENUM,
            TypeKind::Interface => TypeFlags::INTERFACE | TypeFlags::ABSTRACT,
        }
    }
}

/// Member accessibility.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

// ── Types ───────────────────────────────────────────────────────────

/// A class, struct, enum or interface definition.
///
/// The [`TypeKind`] is derived from the flags once, in the constructor, and
/// cannot change afterwards. Fields and methods are owned by the
/// [`Assembly`](crate::Assembly) arenas; the type holds their IDs in
/// declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "TypeDefRepr", into = "TypeDefRepr"))]
pub struct TypeDef {
    namespace: String,
    name: String,
    flags: TypeFlags,
    kind: TypeKind,
    pub(crate) base: Option<TypeDefId>,
    pub(crate) interfaces: Vec<TypeDefId>,
    packing: Option<u32>,
    class_size: Option<u32>,
    pub(crate) fields: Vec<FieldId>,
    pub(crate) methods: Vec<MethodId>,
}

impl TypeDef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, flags: TypeFlags) -> Self {
        TypeDef {
            namespace: namespace.into(),
            name: name.into(),
            flags,
            kind: TypeKind::from_flags(flags),
            base: None,
            interfaces: Vec::new(),
            packing: None,
            class_size: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(namespace, name, TypeKind::Class.flags())
    }

    pub fn structure(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(namespace, name, TypeKind::Struct.flags())
    }

    pub fn enumeration(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(namespace, name, TypeKind::Enum.flags())
    }

    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(namespace, name, TypeKind::Interface.flags())
    }

    #[must_use]
    pub fn with_base(mut self, base: TypeDefId) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: TypeDefId) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Explicit `StructLayout(Pack = n)`.
    #[must_use]
    pub fn with_packing(mut self, packing: u32) -> Self {
        self.packing = Some(packing);
        self
    }

    /// Explicit `StructLayout(Size = n)`.
    #[must_use]
    pub fn with_class_size(mut self, size: u32) -> Self {
        self.class_size = Some(size);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Namespace.Name`, or just `Name` for the global namespace.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn base(&self) -> Option<TypeDefId> {
        self.base
    }

    /// Directly implemented interfaces, in declaration order.
    pub fn interfaces(&self) -> &[TypeDefId] {
        &self.interfaces
    }

    pub fn packing(&self) -> Option<u32> {
        self.packing
    }

    pub fn class_size(&self) -> Option<u32> {
        self.class_size
    }

    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }
}

/// Serialized form of [`TypeDef`]; the kind is recomputed on load.
#[cfg(feature = "serde")]
#[derive(Clone, serde::Serialize, serde::Deserialize)]
struct TypeDefRepr {
    namespace: String,
    name: String,
    flags: TypeFlags,
    #[serde(default)]
    base: Option<TypeDefId>,
    #[serde(default)]
    interfaces: Vec<TypeDefId>,
    #[serde(default)]
    packing: Option<u32>,
    #[serde(default)]
    class_size: Option<u32>,
    #[serde(default)]
    fields: Vec<FieldId>,
    #[serde(default)]
    methods: Vec<MethodId>,
}

#[cfg(feature = "serde")]
impl From<TypeDefRepr> for TypeDef {
    fn from(repr: TypeDefRepr) -> Self {
        let mut def = TypeDef::new(repr.namespace, repr.name, repr.flags);
        def.base = repr.base;
        def.interfaces = repr.interfaces;
        def.packing = repr.packing;
        def.class_size = repr.class_size;
        def.fields = repr.fields;
        def.methods = repr.methods;
        def
    }
}

#[cfg(feature = "serde")]
impl From<TypeDef> for TypeDefRepr {
    fn from(def: TypeDef) -> Self {
        TypeDefRepr {
            namespace: def.namespace,
            name: def.name,
            flags: def.flags,
            base: def.base,
            interfaces: def.interfaces,
            packing: def.packing,
            class_size: def.class_size,
            fields: def.fields,
            methods: def.methods,
        }
    }
}

// ── Fields ──────────────────────────────────────────────────────────

/// A field definition.
///
/// `declaring_type` is filled in by [`Assembly::add_field`](crate::Assembly::add_field).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDef {
    pub name: String,
    pub declaring_type: TypeDefId,
    pub ty: TypeSig,
    pub is_static: bool,
}

impl FieldDef {
    pub fn instance(name: impl Into<String>, ty: TypeSig) -> Self {
        FieldDef {
            name: name.into(),
            declaring_type: TypeDefId::new(0),
            ty,
            is_static: false,
        }
    }

    pub fn static_field(name: impl Into<String>, ty: TypeSig) -> Self {
        FieldDef {
            is_static: true,
            ..Self::instance(name, ty)
        }
    }

    /// Compiler-generated fields (auto-property backing fields and the like)
    /// have names starting with `<` and take no part in layout.
    pub fn is_generated(&self) -> bool {
        self.name.starts_with('<')
    }
}

// ── Methods ─────────────────────────────────────────────────────────

/// A named method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: String,
    pub ty: TypeSig,
}

/// Locals and instructions of a method with a body.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodBody {
    #[cfg_attr(feature = "serde", serde(default))]
    pub locals: Vec<TypeSig>,
    pub instructions: Vec<Instruction>,
}

/// A method definition.
///
/// `body` is `None` for abstract, interface and external methods.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodDef {
    pub name: String,
    pub declaring_type: TypeDefId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub params: Vec<Param>,
    pub return_type: TypeSig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: MethodFlags,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visibility: Visibility,
    #[cfg_attr(feature = "serde", serde(default))]
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, return_type: TypeSig) -> Self {
        MethodDef {
            name: name.into(),
            declaring_type: TypeDefId::new(0),
            params: Vec::new(),
            return_type,
            flags: MethodFlags::empty(),
            visibility: Visibility::Public,
            body: None,
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, ty: TypeSig) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_body(mut self, locals: Vec<TypeSig>, instructions: Vec<Instruction>) -> Self {
        self.body = Some(MethodBody {
            locals,
            instructions,
        });
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Instance methods receive `this` as an implicit first argument.
    pub fn has_this(&self) -> bool {
        !self.is_static()
    }

    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodFlags::VIRTUAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodFlags::ABSTRACT)
    }

    pub fn is_new_slot(&self) -> bool {
        self.flags.contains(MethodFlags::NEW_SLOT)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }

    pub fn is_static_constructor(&self) -> bool {
        self.name == ".cctor"
    }

    /// Number of IL arguments, counting `this`.
    pub fn arg_count(&self) -> usize {
        self.params.len() + usize::from(self.has_this())
    }

    /// Same name, parameter types and return type. Used to match overrides
    /// and interface implementations.
    pub fn same_signature(&self, other: &MethodDef) -> bool {
        self.name == other.name
            && self.return_type == other.return_type
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }
}
