use ilc_meta::{Assembly, FieldDef, MethodDef, MethodFlags, Opcode, Operand, TypeDef, TypeSig};
use ilc_ssa::{Inst, SsaModule};
use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{assert_no_errors, op, prepared, static_method, virtual_method, with};
use crate::CompilerSettings;

fn define(asm: &Assembly) -> CodegenResult<()> {
    let mut cx = CodegenContext::new(asm, CompilerSettings::new("test"));
    let mut m = SsaModule::new("test");
    declare_types(&mut cx, &mut m)?;
    compile_types(&mut cx, &mut m)
}

#[test]
fn packing_of_one_packs_the_struct() {
    let mut asm = Assembly::new("test");
    let header = asm.add_type(TypeDef::structure("", "Header").with_packing(1));
    asm.add_field(header, FieldDef::instance("tag", TypeSig::U1));
    asm.add_field(header, FieldDef::instance("len", TypeSig::I4));
    let (_cx, m) = prepared(&asm);

    let ty = m.struct_named("Header").unwrap();
    let (members, packed) = m.struct_body(ty).unwrap();
    assert!(packed);
    assert_eq!(members.len(), 2);
}

#[test]
fn other_packings_are_rejected() {
    let mut asm = Assembly::new("test");
    asm.add_type(TypeDef::structure("", "Header").with_packing(2));

    assert_eq!(
        define(&asm).unwrap_err(),
        CodegenError::UnsupportedPacking {
            type_name: "Header".to_owned(),
            packing: 2,
        }
    );
}

#[test]
fn fixed_size_requires_a_struct() {
    let mut asm = Assembly::new("test");
    asm.add_type(TypeDef::class("", "Buffer").with_class_size(16));

    assert_eq!(
        define(&asm).unwrap_err(),
        CodegenError::FixedSizeOnNonStruct {
            type_name: "Buffer".to_owned(),
        }
    );
}

#[test]
fn layout_attributes_are_checked_on_enums_and_interfaces() {
    let mut asm = Assembly::new("test");
    let mode = asm.add_type(TypeDef::enumeration("", "Mode").with_class_size(8));
    asm.add_field(mode, FieldDef::instance("value__", TypeSig::I4));
    assert_eq!(
        define(&asm).unwrap_err(),
        CodegenError::FixedSizeOnNonStruct {
            type_name: "Mode".to_owned(),
        }
    );

    let mut asm = Assembly::new("test");
    asm.add_type(TypeDef::interface("", "IShape").with_packing(4));
    assert_eq!(
        define(&asm).unwrap_err(),
        CodegenError::UnsupportedPacking {
            type_name: "IShape".to_owned(),
            packing: 4,
        }
    );
}

#[test]
fn fixed_size_structs_are_padded_with_bytes() {
    let mut asm = Assembly::new("test");
    let block = asm.add_type(TypeDef::structure("", "Block").with_class_size(16));
    asm.add_field(block, FieldDef::instance("head", TypeSig::I4));
    let (_cx, mut m) = prepared(&asm);

    let ty = m.struct_named("Block").unwrap();
    let (members, _) = m.struct_body(ty).unwrap();
    let members = members.to_vec();
    let i32_ty = m.int_type(32);
    let byte = m.int_type(8);
    let mut expected = vec![i32_ty];
    expected.extend(std::iter::repeat(byte).take(12));
    assert_eq!(members, expected);
}

#[test]
fn a_single_char_counts_half_the_declared_size() {
    let mut asm = Assembly::new("test");
    let text = asm.add_type(TypeDef::structure("", "InlineText").with_class_size(16));
    asm.add_field(text, FieldDef::instance("first", TypeSig::Char));
    let (_cx, m) = prepared(&asm);

    let ty = m.struct_named("InlineText").unwrap();
    let (members, _) = m.struct_body(ty).unwrap();
    // 16 / 2 bytes minus the 2-byte char.
    assert_eq!(members.len(), 1 + 6);
}

#[test]
fn static_fields_get_one_global_shared_with_derived_types() {
    let mut asm = Assembly::new("test");
    let base = asm.add_type(TypeDef::class("", "Base"));
    let count = asm.add_field(base, FieldDef::static_field("count", TypeSig::I4));
    asm.add_type(TypeDef::class("", "Derived").with_base(base));
    let (mut cx, mut m) = prepared(&asm);

    let global = m.global_named("Base_count").unwrap();
    assert_eq!(cx.lookup().get_static_field(count), Some(global));
    assert_eq!(static_field(&mut cx, &mut m, count).unwrap(), global);
    assert_no_errors(&m);

    // Static fields take no room in the object.
    let derived = m.struct_named("Derived").unwrap();
    assert_eq!(m.struct_body(derived).unwrap().0.len(), 1);
}

#[test]
fn enums_and_interfaces_are_declared_and_registered() {
    let mut asm = Assembly::new("test");
    let first = asm.add_type(TypeDef::interface("", "IFirst"));
    let second = asm.add_type(TypeDef::interface("", "ISecond"));
    let mode = asm.add_type(TypeDef::enumeration("", "Mode"));
    asm.add_field(mode, FieldDef::instance("value__", TypeSig::I8));
    let (cx, mut m) = prepared(&asm);

    assert_eq!(cx.lookup().interface_index(&asm, first), Ok(0));
    assert_eq!(cx.lookup().interface_index(&asm, second), Ok(1));
    assert_eq!(cx.lookup().interface_count(), 2);
    let i64_ty = m.int_type(64);
    assert_eq!(cx.lookup().get_type(&asm, mode), Ok(i64_ty));
}

#[test]
fn vtable_slots_are_typed_only_for_dispatched_classes() {
    let mut asm = Assembly::new("test");
    let animal = asm.add_type(TypeDef::class("", "Animal"));
    let speak = asm.add_method(animal, virtual_method("Speak", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    let plant = asm.add_type(TypeDef::class("", "Plant"));
    asm.add_method(plant, virtual_method("Grow", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    asm.add_method(
        plant,
        static_method(
            "Poke",
            TypeSig::Void,
            &[TypeSig::Named(animal)],
            vec![],
            vec![op(Opcode::Ldarg0), with(Opcode::Callvirt, Operand::Method(speak)), op(Opcode::Ret)],
        ),
    );
    let (cx, mut m) = prepared(&asm);
    let generic = m.generic_pointer();

    let table = cx.lookup().slot_table(animal).unwrap();
    let table_ptr = m.pointer_type(table);
    let animal_ty = m.struct_named("Animal").unwrap();
    assert_eq!(m.struct_body(animal_ty).unwrap().0, &[generic, table_ptr]);
    assert!(cx.lookup().has_vtable(animal));

    let plant_ty = m.struct_named("Plant").unwrap();
    assert_eq!(m.struct_body(plant_ty).unwrap().0, &[generic, generic]);
    assert!(!cx.lookup().has_vtable(plant));
}

#[test]
fn allocation_routine_stores_the_dispatch_tables() {
    let mut asm = Assembly::new("test");
    let iface = asm.add_type(TypeDef::interface("", "IRun"));
    asm.add_method(iface, MethodDef::new("Run", TypeSig::Void).with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT));
    let job = asm.add_type(TypeDef::class("", "Job").with_interface(iface));
    asm.add_method(job, virtual_method("Run", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    let (mut cx, mut m) = prepared(&asm);

    let function = newobj_function(&mut cx, &mut m, job).unwrap();
    assert_eq!(m.function_name(function), "newobj_Job");
    assert_eq!(newobj_function(&mut cx, &mut m, job).unwrap(), function);

    let insts: Vec<&Inst> = m.instructions(function).map(|(_, inst)| inst).collect();
    assert!(matches!(insts[0], Inst::HeapAlloc { count: None, .. }));
    let stores = insts.iter().filter(|inst| matches!(inst, Inst::Store { .. })).count();
    // The `Job` slot table and the indirection table.
    assert_eq!(stores, 2);
    m.verify_function(function).unwrap();
    assert_no_errors(&m);
}

#[test]
fn allocation_routine_stores_one_itable_pointer_for_many_interfaces() {
    let mut asm = Assembly::new("test");
    let abstract_slot = MethodFlags::VIRTUAL | MethodFlags::ABSTRACT;
    let mut interfaces = Vec::new();
    for (iface, method) in [("IRead", "Read"), ("IWrite", "Write"), ("ISeek", "Seek")] {
        let ty = asm.add_type(TypeDef::interface("", iface));
        asm.add_method(ty, MethodDef::new(method, TypeSig::Void).with_flags(abstract_slot));
        interfaces.push((ty, method));
    }
    let stream = asm.add_type(TypeDef::class("", "Stream"));
    asm.add_method(stream, virtual_method("Flush", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    let buffered = asm.add_type(TypeDef::class("", "Buffered").with_base(stream));
    asm.add_method(buffered, virtual_method("Fill", TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    let mut file = TypeDef::class("", "File").with_base(buffered);
    for (iface, _) in &interfaces {
        file = file.with_interface(*iface);
    }
    let file = asm.add_type(file);
    for (_, method) in &interfaces {
        asm.add_method(file, MethodDef::new(*method, TypeSig::Void).with_body(vec![], vec![op(Opcode::Ret)]));
    }
    let (mut cx, mut m) = prepared(&asm);

    let function = newobj_function(&mut cx, &mut m, file).unwrap();
    let mut stored: Vec<(u32, ValueId)> = m
        .instructions(function)
        .filter_map(|(_, inst)| match inst {
            Inst::Store { ptr, value, .. } => match m.inst(*ptr) {
                Some(Inst::StructGep { index, .. }) => Some((*index, *value)),
                _ => None,
            },
            _ => None,
        })
        .collect();
    stored.sort_unstable_by_key(|(index, _)| *index);

    // One indirection pointer, then one table per slot-introducing ancestor.
    let expected = vec![
        (INDIRECTION_SLOT, m.global_named("File_itable").unwrap()),
        (1, m.global_named("File_vtable_Stream").unwrap()),
        (2, m.global_named("File_vtable_Buffered").unwrap()),
    ];
    assert_eq!(stored, expected);
    m.verify_function(function).unwrap();
    assert_no_errors(&m);
}
