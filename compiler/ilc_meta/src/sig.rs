//! Type signatures as they appear on fields, parameters, locals and
//! instruction operands.

use crate::{Assembly, TypeDefId};

/// A reference to a type from a signature.
///
/// Primitive and core-library types have dedicated variants; user types go
/// through [`TypeSig::Named`]. Pointer-like wrappers nest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeSig {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    IntPtr,
    UIntPtr,
    R4,
    R8,
    String,
    Object,
    /// A type defined in the assembly (class, struct, enum or interface).
    Named(TypeDefId),
    /// Unmanaged pointer (`T*`).
    Pointer(Box<TypeSig>),
    /// Managed reference (`T&`), used for `ref`/`out` parameters and field
    /// or local addresses.
    ByRef(Box<TypeSig>),
    /// Single-dimensional, zero-based array (`T[]`).
    Array(Box<TypeSig>),
}

impl TypeSig {
    /// Shorthand for `TypeSig::Pointer(Box::new(inner))`.
    pub fn pointer(inner: TypeSig) -> Self {
        TypeSig::Pointer(Box::new(inner))
    }

    /// Shorthand for `TypeSig::ByRef(Box::new(inner))`.
    pub fn by_ref(inner: TypeSig) -> Self {
        TypeSig::ByRef(Box::new(inner))
    }

    /// Shorthand for `TypeSig::Array(Box::new(element))`.
    pub fn array(element: TypeSig) -> Self {
        TypeSig::Array(Box::new(element))
    }

    /// Fully qualified CLI name of this type, e.g. `System.Int32`,
    /// `Ns.Foo*` or `System.String[]`.
    pub fn full_name(&self, asm: &Assembly) -> String {
        let mut out = String::new();
        self.write_full_name(asm, &mut out);
        out
    }

    fn write_full_name(&self, asm: &Assembly, out: &mut String) {
        let prim = match self {
            TypeSig::Void => "System.Void",
            TypeSig::Boolean => "System.Boolean",
            TypeSig::Char => "System.Char",
            TypeSig::I1 => "System.SByte",
            TypeSig::U1 => "System.Byte",
            TypeSig::I2 => "System.Int16",
            TypeSig::U2 => "System.UInt16",
            TypeSig::I4 => "System.Int32",
            TypeSig::U4 => "System.UInt32",
            TypeSig::I8 => "System.Int64",
            TypeSig::U8 => "System.UInt64",
            TypeSig::IntPtr => "System.IntPtr",
            TypeSig::UIntPtr => "System.UIntPtr",
            TypeSig::R4 => "System.Single",
            TypeSig::R8 => "System.Double",
            TypeSig::String => "System.String",
            TypeSig::Object => "System.Object",
            TypeSig::Named(id) => {
                out.push_str(&asm.type_def(*id).full_name());
                return;
            }
            TypeSig::Pointer(inner) => {
                inner.write_full_name(asm, out);
                out.push('*');
                return;
            }
            TypeSig::ByRef(inner) => {
                inner.write_full_name(asm, out);
                out.push('&');
                return;
            }
            TypeSig::Array(inner) => {
                inner.write_full_name(asm, out);
                out.push_str("[]");
                return;
            }
        };
        out.push_str(prim);
    }

    /// Primitive numeric or boolean/char type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeSig::Boolean
                | TypeSig::Char
                | TypeSig::I1
                | TypeSig::U1
                | TypeSig::I2
                | TypeSig::U2
                | TypeSig::I4
                | TypeSig::U4
                | TypeSig::I8
                | TypeSig::U8
                | TypeSig::IntPtr
                | TypeSig::UIntPtr
                | TypeSig::R4
                | TypeSig::R8
        )
    }

    /// `R4` or `R8`.
    pub fn is_float(&self) -> bool {
        matches!(self, TypeSig::R4 | TypeSig::R8)
    }

    /// Unsigned integer types, including `Boolean` and `Char`.
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            TypeSig::Boolean
                | TypeSig::Char
                | TypeSig::U1
                | TypeSig::U2
                | TypeSig::U4
                | TypeSig::U8
                | TypeSig::UIntPtr
        )
    }

    /// Unmanaged pointers and managed references.
    pub fn is_pointer_like(&self) -> bool {
        matches!(self, TypeSig::Pointer(_) | TypeSig::ByRef(_))
    }

    /// Element type of a pointer, reference or array.
    pub fn element(&self) -> Option<&TypeSig> {
        match self {
            TypeSig::Pointer(inner) | TypeSig::ByRef(inner) | TypeSig::Array(inner) => Some(inner),
            _ => None,
        }
    }
}
