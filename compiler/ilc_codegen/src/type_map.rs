//! Mapping from metadata type signatures to backend types.
//!
//! | Signature | IR type |
//! |-----------|---------|
//! | `bool`, `sbyte`, `byte` | `i8` |
//! | `char`, `short`, `ushort` | `i16` |
//! | `int`, `uint` | `i32` |
//! | `long`, `ulong`, `IntPtr`, `UIntPtr` | `i64` |
//! | `float`, `double` | `f32`, `f64` |
//! | `string` | `i8*` |
//! | `object`, interfaces, roots | generic pointer |
//! | class `C` | `%C*` |
//! | struct `S` | `%S` |
//! | enum `E` | its underlying integer |
//! | `T*`, `T&`, `T[]` | pointer to `T` |
//!
//! Values on the evaluation stack are never narrower than 32 bits:
//! [`stack_sig`] gives the type a small integer widens to when loaded.

use ilc_meta::{Assembly, MethodDef, TypeDefId, TypeKind, TypeSig};
use ilc_ssa::{Backend, TypeId};

use crate::context::CodegenContext;
use crate::CodegenResult;

pub fn ir_type(cx: &CodegenContext<'_>, b: &mut dyn Backend, sig: &TypeSig) -> CodegenResult<TypeId> {
    let ty = match sig {
        TypeSig::Void => b.void_type(),
        TypeSig::Boolean | TypeSig::I1 | TypeSig::U1 => b.int_type(8),
        TypeSig::Char | TypeSig::I2 | TypeSig::U2 => b.int_type(16),
        TypeSig::I4 | TypeSig::U4 => b.int_type(32),
        TypeSig::I8 | TypeSig::U8 | TypeSig::IntPtr | TypeSig::UIntPtr => b.int_type(64),
        TypeSig::R4 => b.float_type(32),
        TypeSig::R8 => b.float_type(64),
        TypeSig::String | TypeSig::Object => b.generic_pointer(),
        TypeSig::Named(id) => named_type(cx, b, *id)?,
        TypeSig::Pointer(inner) | TypeSig::ByRef(inner) | TypeSig::Array(inner) => {
            let pointee = match &**inner {
                // `void*` has no storable pointee.
                TypeSig::Void => b.int_type(8),
                inner => ir_type(cx, b, inner)?,
            };
            b.pointer_type(pointee)
        }
    };
    Ok(ty)
}

fn named_type(cx: &CodegenContext<'_>, b: &mut dyn Backend, id: TypeDefId) -> CodegenResult<TypeId> {
    let asm = cx.asm;
    if asm.is_root(id) {
        return Ok(b.generic_pointer());
    }
    let handle = cx.lookup.get_type(asm, id)?;
    Ok(match asm.type_def(id).kind() {
        TypeKind::Class => b.pointer_type(handle),
        TypeKind::Interface => b.generic_pointer(),
        TypeKind::Struct | TypeKind::Enum => handle,
    })
}

/// Signature of the implicit `this` argument of an instance method on `ty`.
pub fn this_sig(asm: &Assembly, ty: TypeDefId) -> TypeSig {
    match asm.type_def(ty).kind() {
        TypeKind::Struct | TypeKind::Enum => TypeSig::by_ref(TypeSig::Named(ty)),
        TypeKind::Class | TypeKind::Interface => TypeSig::Named(ty),
    }
}

/// Argument signatures of `method`, `this` first.
pub fn arg_sigs(asm: &Assembly, method: &MethodDef) -> Vec<TypeSig> {
    let this = method
        .has_this()
        .then(|| this_sig(asm, method.declaring_type));
    this.into_iter()
        .chain(method.params.iter().map(|p| p.ty.clone()))
        .collect()
}

pub fn function_type(cx: &CodegenContext<'_>, b: &mut dyn Backend, method: &MethodDef) -> CodegenResult<TypeId> {
    let ret = ir_type(cx, b, &method.return_type)?;
    let params = arg_sigs(cx.asm, method)
        .iter()
        .map(|sig| ir_type(cx, b, sig))
        .collect::<CodegenResult<Vec<_>>>()?;
    Ok(b.function_type(ret, &params))
}

/// Integer signature underlying an enum; `int` when the enum declares no
/// instance field.
pub fn enum_underlying(asm: &Assembly, ty: TypeDefId) -> TypeSig {
    asm.type_def(ty)
        .fields()
        .iter()
        .map(|f| asm.field(*f))
        .find(|f| !f.is_static)
        .map_or(TypeSig::I4, |f| f.ty.clone())
}

/// Resolve enums to their underlying integer signature.
pub fn underlying(asm: &Assembly, sig: &TypeSig) -> TypeSig {
    match sig {
        TypeSig::Named(id) if asm.type_def(*id).kind() == TypeKind::Enum => enum_underlying(asm, *id),
        sig => sig.clone(),
    }
}

/// The signature a value of `sig` has once it is on the evaluation stack.
pub fn stack_sig(asm: &Assembly, sig: &TypeSig) -> TypeSig {
    match underlying(asm, sig) {
        TypeSig::Boolean
        | TypeSig::Char
        | TypeSig::I1
        | TypeSig::U1
        | TypeSig::I2
        | TypeSig::U2 => TypeSig::I4,
        sig => sig,
    }
}

/// Whether integer widening of a `sig` value sign-extends.
pub fn is_signed(asm: &Assembly, sig: &TypeSig) -> bool {
    !underlying(asm, sig).is_unsigned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
