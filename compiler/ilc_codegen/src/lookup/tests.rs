use ilc_meta::{Assembly, TypeDef};
use ilc_ssa::{Backend, Linkage, SsaModule};
use pretty_assertions::assert_eq;

use super::*;
use crate::ErrorCategory;

fn sample() -> (Assembly, TypeDefId, TypeDefId, TypeDefId) {
    let mut asm = Assembly::new("test");
    let base = asm.add_type(TypeDef::class("Demo", "Base"));
    let derived = asm.add_type(TypeDef::class("Demo", "Derived").with_base(base));
    let iface = asm.add_type(TypeDef::interface("Demo", "IThing"));
    (asm, base, derived, iface)
}

#[test]
fn functions_are_keyed_by_name() {
    let mut m = SsaModule::new("m");
    let void = m.void_type();
    let fn_ty = m.function_type(void, &[]);
    let f = m.add_function("f", fn_ty, Linkage::External);

    let mut lookup = Lookup::new();
    assert_eq!(lookup.get_function("f"), None);
    assert!(lookup.add_function("f", f).is_ok());
    assert_eq!(lookup.get_function("f"), Some(f));

    let err = lookup.add_function("f", f).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Duplicate);
}

#[test]
fn missing_registrations_report_not_found() {
    let (asm, base, _, iface) = sample();
    let lookup = Lookup::new();

    assert_eq!(
        lookup.get_type(&asm, base),
        Err(CodegenError::TypeNotFound("Demo.Base".to_owned()))
    );
    assert!(matches!(
        lookup.get_vtable(&asm, base),
        Err(CodegenError::VTableNotFound(_))
    ));
    assert_eq!(
        lookup.get_newobj(&asm, base),
        Err(CodegenError::NewobjNotFound("Demo.Base".to_owned()))
    );
    assert_eq!(
        lookup.interface_index(&asm, iface),
        Err(CodegenError::InterfaceNotIndexed("Demo.IThing".to_owned()))
    );
}

#[test]
fn duplicate_type_registration_is_rejected() {
    let (asm, base, _, _) = sample();
    let mut m = SsaModule::new("m");
    let handle = m.named_struct("Demo_Base");

    let mut lookup = Lookup::new();
    assert!(lookup.add_type(&asm, base, handle).is_ok());
    assert_eq!(lookup.get_type(&asm, base), Ok(handle));
    assert_eq!(
        lookup.add_type(&asm, base, handle),
        Err(CodegenError::Duplicate {
            kind: "type",
            name: "Demo.Base".to_owned()
        })
    );
}

#[test]
fn interface_indices_are_dense_in_registration_order() {
    let mut asm = Assembly::new("test");
    let a = asm.add_type(TypeDef::interface("", "IA"));
    let b = asm.add_type(TypeDef::interface("", "IB"));

    let mut lookup = Lookup::new();
    assert_eq!(lookup.interface_count(), 0);
    assert_eq!(lookup.add_interface(&asm, a), Ok(0));
    assert_eq!(lookup.add_interface(&asm, b), Ok(1));
    assert_eq!(lookup.interface_index(&asm, b), Ok(1));
    assert_eq!(lookup.interface_count(), 2);
    assert!(lookup.add_interface(&asm, a).is_err());
}

#[test]
fn virtual_call_marks_are_inherited_by_derived_types() {
    let (asm, base, derived, _) = sample();
    let mut lookup = Lookup::new();
    assert!(!lookup.needs_virtual_call(&asm, derived));

    lookup.mark_virtual_call(base);
    assert!(lookup.needs_virtual_call(&asm, base));
    assert!(lookup.needs_virtual_call(&asm, derived));
    assert!(!lookup.needs_virtual_call(&asm, asm.object_type()));
}

#[test]
fn static_folding_happens_once_per_field() {
    let mut asm = Assembly::new("test");
    let holder = asm.add_type(TypeDef::class("", "Holder"));
    let field = asm.add_field(
        holder,
        ilc_meta::FieldDef::static_field("X", ilc_meta::TypeSig::I4),
    );

    let mut lookup = Lookup::new();
    assert!(lookup.fold_static(field));
    assert!(!lookup.fold_static(field));
}
