use pretty_assertions::assert_eq;

use super::*;
use crate::{MethodFlags, Opcode, TypeFlags};

fn virtual_method(name: &str) -> MethodDef {
    MethodDef::new(name, TypeSig::Void).with_flags(MethodFlags::VIRTUAL)
}

#[test]
fn roots_are_preregistered() {
    let asm = Assembly::new("test");
    assert_eq!(asm.type_def(asm.object_type()).full_name(), "System.Object");
    assert_eq!(asm.type_def(asm.value_type()).full_name(), "System.ValueType");
    assert_eq!(asm.type_def(asm.enum_type()).base(), Some(asm.value_type()));
    assert_eq!(asm.user_types().count(), 0);
    assert!(asm.validate().is_ok());
}

#[test]
fn default_bases_follow_kind() {
    let mut asm = Assembly::new("test");
    let class = asm.add_type(TypeDef::class("Ns", "C"));
    let structure = asm.add_type(TypeDef::structure("Ns", "S"));
    let enumeration = asm.add_type(TypeDef::enumeration("Ns", "E"));
    let interface = asm.add_type(TypeDef::interface("Ns", "I"));

    assert_eq!(asm.type_def(class).base(), Some(asm.object_type()));
    assert_eq!(asm.type_def(structure).base(), Some(asm.value_type()));
    assert_eq!(asm.type_def(enumeration).base(), Some(asm.enum_type()));
    assert_eq!(asm.type_def(interface).base(), None);
}

#[test]
fn kind_is_computed_from_flags() {
    let value_enum = TypeDef::new("", "E", TypeFlags::VALUE_TYPE | TypeFlags::ENUM);
    assert_eq!(value_enum.kind(), TypeKind::Enum);
    let value = TypeDef::new("", "S", TypeFlags::VALUE_TYPE);
    assert_eq!(value.kind(), TypeKind::Struct);
    assert_eq!(value.full_name(), "S");
}

#[test]
fn ancestors_walk_to_root() {
    let mut asm = Assembly::new("test");
    let a = asm.add_type(TypeDef::class("", "A"));
    let b = asm.add_type(TypeDef::class("", "B").with_base(a));
    let c = asm.add_type(TypeDef::class("", "C").with_base(b));

    let chain: Vec<_> = asm.ancestors(c).collect();
    assert_eq!(chain, vec![b, a, asm.object_type()]);
}

#[test]
fn ancestors_stop_on_cycle() {
    let mut asm = Assembly::new("test");
    let a = asm.add_type(TypeDef::class("", "A"));
    let b = asm.add_type(TypeDef::class("", "B").with_base(a));
    asm.types[a.index()].base = Some(b);

    let chain: Vec<_> = asm.ancestors(a).collect();
    assert_eq!(chain, vec![b]);
}

#[test]
fn all_interfaces_is_transitive_and_deduplicated() {
    let mut asm = Assembly::new("test");
    let i_base = asm.add_type(TypeDef::interface("", "IBase"));
    let i_a = asm.add_type(TypeDef::interface("", "IA").with_interface(i_base));
    let i_b = asm.add_type(TypeDef::interface("", "IB"));
    let parent = asm.add_type(TypeDef::class("", "P").with_interface(i_b));
    let child = asm.add_type(
        TypeDef::class("", "C")
            .with_base(parent)
            .with_interface(i_a)
            .with_interface(i_b),
    );

    assert_eq!(asm.all_interfaces(child), vec![i_a, i_base, i_b]);
    assert_eq!(asm.all_interfaces(parent), vec![i_b]);
}

#[test]
fn override_shares_base_slot() {
    let mut asm = Assembly::new("test");
    let a = asm.add_type(TypeDef::class("", "A"));
    let b = asm.add_type(TypeDef::class("", "B").with_base(a));
    let a_run = asm.add_method(a, virtual_method("Run"));
    let b_run = asm.add_method(b, virtual_method("Run"));
    let b_new = asm.add_method(
        b,
        virtual_method("Walk").with_flags(MethodFlags::NEW_SLOT),
    );
    let b_plain = asm.add_method(b, MethodDef::new("Plain", TypeSig::Void));

    assert_eq!(asm.slot_method(b_run), Some(a_run));
    assert!(asm.introduces_slot(a_run));
    assert!(!asm.introduces_slot(b_run));
    assert_eq!(asm.slot_method(b_plain), None);
    assert_eq!(asm.introduced_slots(b), vec![b_new]);
    assert_eq!(asm.implementation(b, a_run), Some(b_run));
    assert_eq!(asm.implementation(a, a_run), Some(a_run));
}

#[test]
fn interface_implementation_matches_signature() {
    let mut asm = Assembly::new("test");
    let iface = asm.add_type(TypeDef::interface("", "IShape"));
    let area = asm.add_method(
        iface,
        MethodDef::new("Area", TypeSig::I4).with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT),
    );
    let base = asm.add_type(TypeDef::class("", "Shape"));
    let base_area = asm.add_method(base, virtual_method("Area"));
    let square = asm.add_type(TypeDef::class("", "Square").with_base(base).with_interface(iface));
    let square_area = asm.add_method(
        square,
        MethodDef::new("Area", TypeSig::I4).with_flags(MethodFlags::VIRTUAL),
    );

    assert_eq!(asm.slot_method(area), Some(area));
    assert_eq!(asm.implementation(square, area), Some(square_area));
    // Different return type: not an implementation.
    assert_ne!(asm.implementation(square, area), Some(base_area));
}

#[test]
fn validate_rejects_dangling_ids() {
    let mut asm = Assembly::new("test");
    let c = asm.add_type(TypeDef::class("", "C"));
    asm.add_method(
        c,
        MethodDef::new("M", TypeSig::Void).with_body(
            vec![],
            vec![
                Instruction::new(Opcode::Br, Operand::Target(7)),
                Instruction::op(Opcode::Ret),
            ],
        ),
    );

    let err = asm.validate().unwrap_err();
    assert_eq!(
        err,
        MetaError::DanglingId {
            kind: "branch target",
            id: 7,
            context: "M".to_owned(),
        }
    );
}

#[test]
fn validate_rejects_branch_without_target() {
    let mut asm = Assembly::new("test");
    let c = asm.add_type(TypeDef::class("", "C"));
    asm.add_method(
        c,
        MethodDef::new("M", TypeSig::Void).with_body(vec![], vec![Instruction::op(Opcode::Brtrue)]),
    );

    assert!(matches!(
        asm.validate(),
        Err(MetaError::OperandMismatch { index: 0, .. })
    ));
}

#[cfg(feature = "serde")]
#[test]
fn json_round_trip_recomputes_kind() {
    let mut asm = Assembly::new("test");
    let s = asm.add_type(TypeDef::structure("Ns", "Point"));
    asm.add_field(s, FieldDef::instance("x", TypeSig::I4));

    let json = serde_json::to_string(&asm).unwrap();
    let back: Assembly = serde_json::from_str(&json).unwrap();
    assert_eq!(back.type_def(s).kind(), TypeKind::Struct);
    assert_eq!(back.field_named(s, "x"), asm.field_named(s, "x"));
    assert!(back.validate().is_ok());
}
