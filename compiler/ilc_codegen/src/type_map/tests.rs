use ilc_meta::{Assembly, FieldDef, MethodDef, TypeDef, TypeSig};
use ilc_ssa::{Backend, SsaModule, TypeData};
use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::prepared;

#[test]
fn primitives_map_to_fixed_width_types() {
    let asm = Assembly::new("test");
    let (cx, mut m) = prepared(&asm);

    let cases = [
        (TypeSig::Boolean, 8),
        (TypeSig::U1, 8),
        (TypeSig::Char, 16),
        (TypeSig::I2, 16),
        (TypeSig::I4, 32),
        (TypeSig::U4, 32),
        (TypeSig::I8, 64),
        (TypeSig::IntPtr, 64),
        (TypeSig::UIntPtr, 64),
    ];
    for (sig, bits) in cases {
        let ty = ir_type(&cx, &mut m, &sig).unwrap();
        assert_eq!(m.type_data(ty), &TypeData::Int(bits), "{sig:?}");
    }
    let r4 = ir_type(&cx, &mut m, &TypeSig::R4).unwrap();
    assert_eq!(m.type_data(r4), &TypeData::Float(32));

    let generic = m.generic_pointer();
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::String).unwrap(), generic);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Object).unwrap(), generic);
}

#[test]
fn user_types_map_by_kind() {
    let mut asm = Assembly::new("test");
    let class = asm.add_type(TypeDef::class("Demo", "Node"));
    let value = asm.add_type(TypeDef::structure("Demo", "Point"));
    asm.add_field(value, FieldDef::instance("x", TypeSig::I4));
    let color = asm.add_type(TypeDef::enumeration("Demo", "Color"));
    asm.add_field(color, FieldDef::instance("value__", TypeSig::U1));
    let iface = asm.add_type(TypeDef::interface("Demo", "IThing"));
    let (cx, mut m) = prepared(&asm);

    let node = m.struct_named("Demo_Node").unwrap();
    let point = m.struct_named("Demo_Point").unwrap();
    let node_ptr = m.pointer_type(node);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Named(class)).unwrap(), node_ptr);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Named(value)).unwrap(), point);

    let byte = m.int_type(8);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Named(color)).unwrap(), byte);

    let generic = m.generic_pointer();
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Named(iface)).unwrap(), generic);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::Named(asm.object_type())).unwrap(), generic);
}

#[test]
fn wrappers_become_pointers_and_void_pointers_point_to_bytes() {
    let mut asm = Assembly::new("test");
    let value = asm.add_type(TypeDef::structure("", "Pair"));
    let (cx, mut m) = prepared(&asm);

    let pair = m.struct_named("Pair").unwrap();
    let pair_ptr = m.pointer_type(pair);
    let by_ref = TypeSig::by_ref(TypeSig::Named(value));
    assert_eq!(ir_type(&cx, &mut m, &by_ref).unwrap(), pair_ptr);

    let i32_ty = m.int_type(32);
    let i32_ptr = m.pointer_type(i32_ty);
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::array(TypeSig::I4)).unwrap(), i32_ptr);

    let generic = m.generic_pointer();
    assert_eq!(ir_type(&cx, &mut m, &TypeSig::pointer(TypeSig::Void)).unwrap(), generic);
}

#[test]
fn undeclared_types_are_reported() {
    let mut asm = Assembly::new("test");
    let late = asm.add_type(TypeDef::class("", "Late"));
    let cx = CodegenContext::new(&asm, crate::CompilerSettings::default());
    let mut m = SsaModule::new("test");

    let err = ir_type(&cx, &mut m, &TypeSig::Named(late)).unwrap_err();
    assert_eq!(err, crate::CodegenError::TypeNotFound("Late".to_owned()));
}

#[test]
fn instance_methods_take_this_first() {
    let mut asm = Assembly::new("test");
    let class = asm.add_type(TypeDef::class("", "Counter"));
    let value = asm.add_type(TypeDef::structure("", "Cell"));
    let add = MethodDef::new("Add", TypeSig::I4).with_param("n", TypeSig::I4);

    assert_eq!(
        arg_sigs(&asm, &MethodDef { declaring_type: class, ..add.clone() }),
        vec![TypeSig::Named(class), TypeSig::I4]
    );
    assert_eq!(
        arg_sigs(&asm, &MethodDef { declaring_type: value, ..add.clone() }),
        vec![TypeSig::by_ref(TypeSig::Named(value)), TypeSig::I4]
    );

    let (cx, mut m) = prepared(&asm);
    let fn_ty = function_type(&cx, &mut m, &MethodDef { declaring_type: class, ..add }).unwrap();
    let counter = m.struct_named("Counter").unwrap();
    let counter_ptr = m.pointer_type(counter);
    let i32_ty = m.int_type(32);
    assert_eq!(
        m.type_data(fn_ty),
        &TypeData::Function {
            ret: i32_ty,
            params: vec![counter_ptr, i32_ty],
        }
    );
}

#[test]
fn small_integers_widen_on_the_stack() {
    let mut asm = Assembly::new("test");
    let color = asm.add_type(TypeDef::enumeration("", "Color"));
    asm.add_field(color, FieldDef::instance("value__", TypeSig::U2));
    let plain = asm.add_type(TypeDef::enumeration("", "Plain"));

    assert_eq!(stack_sig(&asm, &TypeSig::Boolean), TypeSig::I4);
    assert_eq!(stack_sig(&asm, &TypeSig::I2), TypeSig::I4);
    assert_eq!(stack_sig(&asm, &TypeSig::U4), TypeSig::U4);
    assert_eq!(stack_sig(&asm, &TypeSig::R4), TypeSig::R4);
    assert_eq!(stack_sig(&asm, &TypeSig::Named(color)), TypeSig::I4);
    assert_eq!(enum_underlying(&asm, plain), TypeSig::I4);

    assert!(!is_signed(&asm, &TypeSig::Named(color)));
    assert!(is_signed(&asm, &TypeSig::I8));
    assert!(!is_signed(&asm, &TypeSig::Char));
}
