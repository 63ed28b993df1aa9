use ilc_meta::{Assembly, MethodDef, MethodFlags, MethodId, Opcode, Operand, TypeDef, TypeDefId, TypeSig};
use ilc_ssa::{SsaModule, ValueId, ValueKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{op, prepared, static_method, virtual_method, with};
use crate::types::{compile_types, declare_types};
use crate::CompilerSettings;

fn abstract_method(name: &str, ret: TypeSig) -> MethodDef {
    MethodDef::new(name, ret).with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT)
}

fn items(m: &SsaModule, global: ValueId) -> Vec<ValueId> {
    let init = m.initializer(global).unwrap();
    match &m.value(init).kind {
        ValueKind::ConstAggregate(items) => items.clone(),
        other => panic!("expected an aggregate initializer, got {other:?}"),
    }
}

fn function_of(m: &SsaModule, value: ValueId) -> &str {
    match m.value(value).kind {
        ValueKind::Function(f) => m.function_name(f),
        ref other => panic!("expected a function value, got {other:?}"),
    }
}

/// `Shape.Draw` is abstract and dispatched through; `Circle` overrides it.
fn shapes() -> (Assembly, TypeDefId, TypeDefId, MethodId, MethodId) {
    let mut asm = Assembly::new("test");
    let shape = asm.add_type(TypeDef::class("", "Shape"));
    let draw = asm.add_method(shape, abstract_method("Draw", TypeSig::Void));
    let circle = asm.add_type(TypeDef::class("", "Circle").with_base(shape));
    let circle_draw = asm.add_method(circle, virtual_method("Draw", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    let user = asm.add_type(TypeDef::class("", "User"));
    asm.add_method(
        user,
        static_method(
            "Run",
            TypeSig::Void,
            &[TypeSig::Named(shape)],
            vec![],
            vec![op(Opcode::Ldarg0), with(Opcode::Callvirt, Operand::Method(draw)), op(Opcode::Ret)],
        ),
    );
    (asm, shape, circle, draw, circle_draw)
}

#[test]
fn slot_table_type_has_one_pointer_per_introduced_slot() {
    let (asm, shape, ..) = shapes();
    let (cx, m) = prepared(&asm);

    let table_ty = cx.lookup().slot_table(shape).unwrap();
    assert_eq!(m.struct_named("Shape_vtable"), Some(table_ty));
    let (members, packed) = m.struct_body(table_ty).unwrap();
    assert_eq!(members.len(), 1);
    assert!(!packed);
}

#[test]
fn class_instances_hold_the_most_derived_implementation() {
    let (asm, shape, circle, draw, circle_draw) = shapes();
    let (cx, m) = prepared(&asm);

    let vtable = cx.lookup().get_vtable(&asm, circle).unwrap();
    assert_eq!(vtable.owner(), circle);
    assert_eq!(vtable.tables().len(), 1);
    let table = vtable.table(shape).unwrap();
    assert_eq!(table.slots, vec![draw]);
    assert_eq!(table.slot_index(draw), Some(0));
    assert_eq!(table.slot_index(circle_draw), None);

    let instance = table.instance.unwrap();
    assert_eq!(m.global_named("Circle_vtable_Shape"), Some(instance));
    let slots = items(&m, instance);
    assert_eq!(function_of(&m, slots[0]), naming::method_name(&asm, circle_draw));
    assert!(vtable.interfaces().is_empty());
    assert_eq!(vtable.indirection(), None);
}

#[test]
fn abstract_implementations_are_null() {
    let (asm, shape, ..) = shapes();
    let (cx, m) = prepared(&asm);

    let table = cx.lookup().get_vtable(&asm, shape).unwrap().table(shape).unwrap().clone();
    let slots = items(&m, table.instance.unwrap());
    assert_eq!(m.value(slots[0]).kind, ValueKind::ConstNull);
}

#[test]
fn tables_follow_the_base_chain_base_first() {
    let (mut asm, shape, circle, draw, _) = shapes();
    let ring = asm.add_type(TypeDef::class("", "Ring").with_base(circle));
    let width = asm.add_method(
        ring,
        virtual_method("Width", TypeSig::I4)
            .with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT)
            .with_body(vec![], vec![op(Opcode::LdcI40), op(Opcode::Ret)]),
    );
    asm.add_method(
        circle,
        static_method(
            "Measure",
            TypeSig::I4,
            &[TypeSig::Named(ring)],
            vec![],
            vec![op(Opcode::Ldarg0), with(Opcode::Callvirt, Operand::Method(width)), op(Opcode::Ret)],
        ),
    );
    let (cx, _m) = prepared(&asm);

    let vtable = cx.lookup().get_vtable(&asm, ring).unwrap();
    let owners: Vec<TypeDefId> = vtable.tables().iter().map(|t| t.owner).collect();
    assert_eq!(owners, vec![shape, ring]);
    assert_eq!(vtable.table(shape).unwrap().slots, vec![draw]);
    assert_eq!(vtable.table(ring).unwrap().slots, vec![width]);
}

#[test]
fn interfaces_are_reached_through_the_indirection_table() {
    let mut asm = Assembly::new("test");
    let area_iface = asm.add_type(TypeDef::interface("", "IArea"));
    asm.add_method(area_iface, abstract_method("Area", TypeSig::R8));
    let other = asm.add_type(TypeDef::interface("", "IOther"));
    asm.add_method(other, abstract_method("Other", TypeSig::Void));
    let square = asm.add_type(TypeDef::class("", "Square").with_interface(area_iface));
    let area = asm.add_method(
        square,
        virtual_method("Area", TypeSig::R8).with_body(vec![], vec![with(Opcode::LdcR8, Operand::Float64(1.0)), op(Opcode::Ret)]),
    );
    let (cx, m) = prepared(&asm);

    let iface_vtable = cx.lookup().get_vtable(&asm, area_iface).unwrap();
    assert_eq!(iface_vtable.tables()[0].instance, None);

    let vtable = cx.lookup().get_vtable(&asm, square).unwrap();
    assert_eq!(vtable.interfaces().len(), 1);
    let implemented = &vtable.interfaces()[0];
    assert_eq!(implemented.interface, area_iface);
    assert_eq!(implemented.index, 0);
    assert_eq!(m.global_named("Square_ivtable_IArea"), Some(implemented.instance));
    let slots = items(&m, implemented.instance);
    assert_eq!(function_of(&m, slots[0]), naming::method_name(&asm, area));

    // One entry per interface in the program; `IOther` is not implemented.
    let itable = vtable.indirection().unwrap();
    assert_eq!(m.global_named("Square_itable"), Some(itable));
    let entries = items(&m, itable);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], implemented.instance);
    assert_eq!(m.value(entries[1]).kind, ValueKind::ConstNull);
}

#[test]
fn missing_interface_implementation_is_an_error() {
    let mut asm = Assembly::new("test");
    let iface = asm.add_type(TypeDef::interface("", "IArea"));
    asm.add_method(iface, abstract_method("Area", TypeSig::R8));
    asm.add_type(TypeDef::class("", "Blob").with_interface(iface));

    let mut cx = CodegenContext::new(&asm, CompilerSettings::new("test"));
    let mut m = SsaModule::new("test");
    declare_types(&mut cx, &mut m).unwrap();
    let err = compile_types(&mut cx, &mut m).unwrap_err();
    assert_eq!(
        err,
        CodegenError::MethodSlotNotFound {
            type_name: "Blob".to_owned(),
            method: "Area".to_owned(),
        }
    );
}
