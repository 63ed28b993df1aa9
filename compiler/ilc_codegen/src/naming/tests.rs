use ilc_meta::{Assembly, FieldDef, MethodDef, TypeDef, TypeSig};
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn method_name_joins_return_type_declaring_type_name_and_params() {
    let mut asm = Assembly::new("test");
    let foo = asm.add_type(TypeDef::class("", "Foo"));
    let bar = asm.add_method(
        foo,
        MethodDef::new("Bar", TypeSig::I4).with_param("s", TypeSig::String),
    );

    assert_eq!(method_name(&asm, bar), "System_Int32_Foo_Bar_System_String");
}

#[test]
fn method_name_concatenates_parameters_without_separator() {
    let mut asm = Assembly::new("test");
    let math = asm.add_type(TypeDef::class("Demo.Util", "Math"));
    let clamp = asm.add_method(
        math,
        MethodDef::new("Clamp", TypeSig::R8)
            .with_param("v", TypeSig::R8)
            .with_param("lo", TypeSig::R8)
            .with_param("hi", TypeSig::R8),
    );

    assert_eq!(
        method_name(&asm, clamp),
        "System_Double_Demo_Util_Math_Clamp_System_DoubleSystem_DoubleSystem_Double"
    );
}

#[test]
fn constructors_and_arrays_mangle_dots_and_brackets() {
    let mut asm = Assembly::new("test");
    let list = asm.add_type(TypeDef::class("Demo", "List"));
    let ctor = asm.add_method(
        list,
        MethodDef::new(".ctor", TypeSig::Void).with_param("items", TypeSig::array(TypeSig::I4)),
    );

    assert_eq!(
        method_name(&asm, ctor),
        "System_Void_Demo_List__ctor_System_Int32__"
    );
}

#[test]
fn parameterless_method_keeps_trailing_separator() {
    let mut asm = Assembly::new("test");
    let foo = asm.add_type(TypeDef::class("", "Foo"));
    let run = asm.add_method(foo, MethodDef::new("Run", TypeSig::Void));

    assert_eq!(method_name(&asm, run), "System_Void_Foo_Run_");
}

#[test]
fn derived_symbol_names() {
    let mut asm = Assembly::new("test");
    let shape = asm.add_type(TypeDef::class("Geo", "Shape"));
    let circle = asm.add_type(TypeDef::class("Geo", "Circle").with_base(shape));
    let drawable = asm.add_type(TypeDef::interface("Geo", "IDrawable"));
    let count = asm.add_field(circle, FieldDef::static_field("Count", TypeSig::I4));

    assert_eq!(static_field_name(&asm, count), "Geo_Circle_Count");
    assert_eq!(newobj_name(&asm, circle), "newobj_Geo_Circle");
    assert_eq!(vtable_type_name(&asm, shape), "Geo_Shape_vtable");
    assert_eq!(
        vtable_instance_name(&asm, circle, shape),
        "Geo_Circle_vtable_Geo_Shape"
    );
    assert_eq!(
        interface_table_name(&asm, circle, drawable),
        "Geo_Circle_ivtable_Geo_IDrawable"
    );
    assert_eq!(indirection_table_name(&asm, circle), "Geo_Circle_itable");
    assert_eq!(static_init_name("demo.app"), "demo_app_static_init");
}
