use ilc_meta::{Assembly, FieldDef, MethodDef, MethodFlags, TypeDef, TypeDefId, TypeSig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn virtual_method(name: &str) -> MethodDef {
    MethodDef::new(name, TypeSig::Void).with_flags(MethodFlags::VIRTUAL)
}

#[test]
fn roots_and_interfaces_have_empty_layouts() {
    let mut asm = Assembly::new("test");
    let iface = asm.add_type(TypeDef::interface("", "IShape"));
    let engine = LayoutEngine::new();

    assert!(engine.struct_layout(&asm, asm.object_type()).unwrap().is_empty());
    assert!(engine.struct_layout(&asm, asm.enum_type()).unwrap().is_empty());
    assert!(engine.struct_layout(&asm, iface).unwrap().is_empty());
}

#[test]
fn class_under_object_starts_with_indirection_and_vtable_slots() {
    let mut asm = Assembly::new("test");
    let shape = asm.add_type(TypeDef::class("", "Shape"));
    let x = asm.add_field(shape, FieldDef::instance("x", TypeSig::I4));
    let y = asm.add_field(shape, FieldDef::instance("y", TypeSig::I4));
    asm.add_method(shape, virtual_method("Draw"));

    let engine = LayoutEngine::new();
    assert_eq!(
        &*engine.struct_layout(&asm, shape).unwrap(),
        &[
            StructEntry::InterfaceIndirectionSlot,
            StructEntry::ClassVTableSlot(shape),
            StructEntry::Field(x),
            StructEntry::Field(y),
            StructEntry::Barrier(shape),
        ]
    );
    assert_eq!(engine.field_index(&asm, x), Ok(2));
    assert_eq!(engine.field_index(&asm, y), Ok(3));
    assert_eq!(engine.class_vtable_index(&asm, shape), Ok(1));
}

#[test]
fn derived_layout_extends_base_layout() {
    let mut asm = Assembly::new("test");
    let shape = asm.add_type(TypeDef::class("", "Shape"));
    asm.add_field(shape, FieldDef::instance("x", TypeSig::I4));
    asm.add_method(shape, virtual_method("Draw"));
    let circle = asm.add_type(TypeDef::class("", "Circle").with_base(shape));
    asm.add_method(circle, virtual_method("Draw"));
    asm.add_method(circle, virtual_method("Fill").with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT));
    let radius = asm.add_field(circle, FieldDef::instance("radius", TypeSig::R8));

    let engine = LayoutEngine::new();
    let base = engine.struct_layout(&asm, shape).unwrap();
    let derived = engine.struct_layout(&asm, circle).unwrap();

    assert_eq!(&derived[..base.len()], &base[..]);
    assert_eq!(
        &derived[base.len()..],
        &[
            StructEntry::ClassVTableSlot(circle),
            StructEntry::Field(radius),
            StructEntry::Barrier(circle),
        ]
    );
    assert_eq!(engine.class_vtable_index(&asm, circle), Ok(3));
    assert_eq!(engine.field_index(&asm, radius), Ok(4));
}

#[test]
fn overrides_alone_do_not_add_a_vtable_slot() {
    let mut asm = Assembly::new("test");
    let shape = asm.add_type(TypeDef::class("", "Shape"));
    asm.add_method(shape, virtual_method("Draw"));
    let square = asm.add_type(TypeDef::class("", "Square").with_base(shape));
    asm.add_method(square, virtual_method("Draw"));

    let engine = LayoutEngine::new();
    let layout = engine.struct_layout(&asm, square).unwrap();
    assert!(!layout.contains(&StructEntry::ClassVTableSlot(square)));
    assert_eq!(
        engine.class_vtable_index(&asm, square),
        Err(CodegenError::VTableSlotNotFound("Square".to_owned()))
    );
}

#[test]
fn static_fields_are_listed_but_not_counted() {
    let mut asm = Assembly::new("test");
    let counter = asm.add_type(TypeDef::class("", "Counter"));
    let a = asm.add_field(counter, FieldDef::instance("a", TypeSig::I4));
    let total = asm.add_field(counter, FieldDef::static_field("total", TypeSig::I4));
    let b = asm.add_field(counter, FieldDef::instance("b", TypeSig::I4));

    let engine = LayoutEngine::new();
    let layout = engine.struct_layout(&asm, counter).unwrap();
    assert!(layout.contains(&StructEntry::Field(total)));
    assert_eq!(engine.field_index(&asm, a), Ok(1));
    assert_eq!(engine.field_index(&asm, b), Ok(2));
    assert!(matches!(
        engine.field_index(&asm, total),
        Err(CodegenError::FieldNotInLayout { .. })
    ));
}

#[test]
fn compiler_generated_fields_are_excluded() {
    let mut asm = Assembly::new("test");
    let point = asm.add_type(TypeDef::structure("", "Point"));
    let x = asm.add_field(point, FieldDef::instance("x", TypeSig::I4));
    let hidden = asm.add_field(point, FieldDef::instance("<Y>k__BackingField", TypeSig::I4));

    let engine = LayoutEngine::new();
    assert_eq!(
        &*engine.struct_layout(&asm, point).unwrap(),
        &[StructEntry::Field(x), StructEntry::Barrier(point)]
    );
    assert!(engine.field_index(&asm, hidden).is_err());
}

#[test]
fn layouts_are_computed_once() {
    let mut asm = Assembly::new("test");
    let a = asm.add_type(TypeDef::class("", "A"));
    let b = asm.add_type(TypeDef::class("", "B").with_base(a));

    let engine = LayoutEngine::new();
    engine.struct_layout(&asm, b).unwrap();
    let after_first = engine.computed();
    engine.struct_layout(&asm, b).unwrap();
    engine.struct_layout(&asm, a).unwrap();

    // B, A and System.Object.
    assert_eq!(after_first, 3);
    assert_eq!(engine.computed(), after_first);
}

#[test]
fn inheritance_cycles_are_reported() {
    let mut asm = Assembly::new("test");
    // The three roots take ids 0 to 2, so `A` is 3 and `B` is 4.
    let b_id = TypeDefId::new(4);
    let a = asm.add_type(TypeDef::class("", "A").with_base(b_id));
    let b = asm.add_type(TypeDef::class("", "B").with_base(a));
    assert_eq!(b, b_id);

    let engine = LayoutEngine::new();
    assert!(matches!(
        engine.struct_layout(&asm, a),
        Err(CodegenError::CyclicInheritance(_))
    ));
}

/// Shape of one class in a generated inheritance chain.
#[derive(Clone, Debug)]
struct Level {
    instance_fields: usize,
    static_fields: usize,
    introduces_slot: bool,
}

fn level() -> impl Strategy<Value = Level> {
    (0usize..4, 0usize..2, any::<bool>()).prop_map(|(instance_fields, static_fields, introduces_slot)| Level {
        instance_fields,
        static_fields,
        introduces_slot,
    })
}

proptest! {
    #[test]
    fn base_layout_is_a_prefix_of_every_derived_layout(levels in prop::collection::vec(level(), 1..6)) {
        let mut asm = Assembly::new("chain");
        let mut chain = Vec::new();
        let mut base = asm.object_type();
        for (depth, level) in levels.iter().enumerate() {
            let ty = asm.add_type(TypeDef::class("", format!("L{depth}")).with_base(base));
            for i in 0..level.instance_fields {
                asm.add_field(ty, FieldDef::instance(format!("f{i}"), TypeSig::I4));
            }
            for i in 0..level.static_fields {
                asm.add_field(ty, FieldDef::static_field(format!("s{i}"), TypeSig::I8));
            }
            if level.introduces_slot {
                asm.add_method(
                    ty,
                    MethodDef::new(format!("M{depth}"), TypeSig::Void)
                        .with_flags(MethodFlags::VIRTUAL | MethodFlags::NEW_SLOT),
                );
            }
            chain.push(ty);
            base = ty;
        }

        let engine = LayoutEngine::new();
        for pair in chain.windows(2) {
            let parent = engine.struct_layout(&asm, pair[0]).unwrap();
            let child = engine.struct_layout(&asm, pair[1]).unwrap();
            prop_assert!(child.len() > parent.len());
            prop_assert_eq!(&child[..parent.len()], &parent[..]);
        }

        // Field indices are stable between a type and its descendants.
        let last = *chain.last().unwrap();
        for ty in &chain {
            for field in asm.type_def(*ty).fields() {
                if !asm.field(*field).is_static {
                    prop_assert!(engine.field_index(&asm, *field).is_ok());
                }
            }
        }
        prop_assert_eq!(
            engine.struct_layout(&asm, last).unwrap().first().copied(),
            Some(StructEntry::InterfaceIndirectionSlot)
        );
    }
}
