//! Symbol naming.
//!
//! IR symbol names are derived from metadata names by replacing the
//! characters that are not valid in a bare identifier (`.`, `[`, `]`)
//! with `_`. The derived names double as the keys of the function
//! registry, so two methods mangle to the same name only if they are the
//! same method.

use ilc_meta::{Assembly, FieldId, MethodId, TypeDefId, TypeSig};

fn mangle(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '[' | ']' => '_',
            c => c,
        })
        .collect()
}

/// `System.Collections.List` -> `System_Collections_List`.
pub fn type_name(asm: &Assembly, ty: TypeDefId) -> String {
    mangle(&asm.type_def(ty).full_name())
}

/// Mangled full name of a signature type, e.g. `System_Int32` or
/// `System_String__` for `string[]`.
pub fn sig_name(asm: &Assembly, sig: &TypeSig) -> String {
    mangle(&sig.full_name(asm))
}

/// `{ret}_{declaringType}_{name}_{params...}`.
///
/// `int Foo.Bar(string)` becomes `System_Int32_Foo_Bar_System_String`.
/// Parameter names are concatenated without a separator; the implicit
/// `this` does not take part.
pub fn method_name(asm: &Assembly, method: MethodId) -> String {
    let def = asm.method(method);
    let mut name = sig_name(asm, &def.return_type);
    name.push('_');
    name.push_str(&type_name(asm, def.declaring_type));
    name.push('_');
    name.push_str(&mangle(&def.name));
    name.push('_');
    for param in &def.params {
        name.push_str(&sig_name(asm, &param.ty));
    }
    name
}

/// Global holding a static field: `{Type}_{field}`.
pub fn static_field_name(asm: &Assembly, field: FieldId) -> String {
    let def = asm.field(field);
    format!("{}_{}", type_name(asm, def.declaring_type), mangle(&def.name))
}

/// Allocation routine of a class.
pub fn newobj_name(asm: &Assembly, ty: TypeDefId) -> String {
    format!("newobj_{}", type_name(asm, ty))
}

/// Slot-table struct type shared by every class deriving from `owner`.
pub fn vtable_type_name(asm: &Assembly, owner: TypeDefId) -> String {
    format!("{}_vtable", type_name(asm, owner))
}

/// Slot-table instance of `owner`'s slots as seen from `class`.
pub fn vtable_instance_name(asm: &Assembly, class: TypeDefId, owner: TypeDefId) -> String {
    format!("{}_vtable_{}", type_name(asm, class), type_name(asm, owner))
}

/// Interface table instance of `interface` as implemented by `class`.
pub fn interface_table_name(asm: &Assembly, class: TypeDefId, interface: TypeDefId) -> String {
    format!("{}_ivtable_{}", type_name(asm, class), type_name(asm, interface))
}

/// Interface indirection table of `class`.
pub fn indirection_table_name(asm: &Assembly, class: TypeDefId) -> String {
    format!("{}_itable", type_name(asm, class))
}

/// Function that runs every static constructor of the module.
pub fn static_init_name(module: &str) -> String {
    format!("{}_static_init", mangle(module))
}

#[cfg(test)]
mod tests;
