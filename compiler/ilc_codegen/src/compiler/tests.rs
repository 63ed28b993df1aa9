use ilc_meta::{Assembly, FieldDef, MethodDef, MethodFlags, Opcode, Operand, TypeDef, TypeSig};
use ilc_ssa::{Callee, Inst, SsaModule, ValueKind};
use pretty_assertions::assert_eq;

use super::*;
use crate::test_helpers::{assert_no_errors, ldc, op, static_method, with};
use crate::CodegenError;

fn cctor(body: Vec<ilc_meta::Instruction>) -> MethodDef {
    MethodDef::new(".cctor", TypeSig::Void)
        .with_flags(MethodFlags::STATIC | MethodFlags::SPECIAL_NAME)
        .with_body(vec![], body)
}

fn run(asm: &Assembly) -> (CompileReport, SsaModule) {
    let mut m = SsaModule::new("test");
    let report = compile(asm, CompilerSettings::new("test"), &mut m).unwrap();
    (report, m)
}

fn direct_calls(m: &SsaModule, function: ilc_ssa::FunctionId) -> Vec<String> {
    m.instructions(function)
        .filter_map(|(_, inst)| match inst {
            Inst::Call {
                callee: Callee::Direct(f),
                ..
            } => Some(m.function_name(*f).to_owned()),
            _ => None,
        })
        .collect()
}

fn stores_in(m: &SsaModule, function: ilc_ssa::FunctionId) -> usize {
    m.instructions(function)
        .filter(|(_, inst)| matches!(inst, Inst::Store { .. }))
        .count()
}

#[test]
fn report_sorts_methods_by_outcome() {
    let mut asm = Assembly::new("test");
    let app = asm.add_type(TypeDef::class("Demo", "App"));
    asm.add_method(app, static_method("Main", TypeSig::I4, &[], vec![], vec![ldc(0), op(Opcode::Ret)]));
    asm.add_method(app, MethodDef::new("Puts", TypeSig::Void).with_flags(MethodFlags::STATIC));
    asm.add_method(
        app,
        static_method(
            "Boxed",
            TypeSig::Object,
            &[],
            vec![],
            vec![ldc(1), with(Opcode::Box, Operand::Type(TypeSig::I4)), op(Opcode::Ret)],
        ),
    );
    asm.add_method(
        app,
        MethodDef::new("Pending", TypeSig::Void).with_flags(MethodFlags::VIRTUAL | MethodFlags::ABSTRACT),
    );
    let (report, m) = run(&asm);

    assert_eq!(
        report,
        CompileReport {
            compiled: vec!["Demo.App::Main".to_owned()],
            external: vec!["Demo.App::Puts".to_owned()],
            skipped: vec![SkippedMethod {
                name: "Demo.App::Boxed".to_owned(),
                reason: "`box` is not implemented yet".to_owned(),
            }],
            static_init: "test_static_init".to_owned(),
        }
    );
    assert_no_errors(&m);
}

#[test]
fn static_init_runs_constructors_in_declaration_order() {
    let mut asm = Assembly::new("test");
    let first = asm.add_type(TypeDef::class("", "First"));
    let first_cctor = asm.add_method(first, cctor(vec![op(Opcode::Ret)]));
    let second = asm.add_type(TypeDef::class("", "Second"));
    let second_cctor = asm.add_method(second, cctor(vec![op(Opcode::Ret)]));
    let (report, m) = run(&asm);

    let init = m.function_named(&report.static_init).unwrap();
    assert_eq!(m.linkage(init), Linkage::External);
    assert_eq!(
        direct_calls(&m, init),
        vec![naming::method_name(&asm, first_cctor), naming::method_name(&asm, second_cctor)]
    );
}

#[test]
fn skipped_constructors_are_not_called() {
    let mut asm = Assembly::new("test");
    let lazy = asm.add_type(TypeDef::class("", "Lazy"));
    asm.add_method(lazy, cctor(vec![op(Opcode::Ldnull), op(Opcode::Throw)]));
    let (report, m) = run(&asm);

    assert_eq!(report.skipped.len(), 1);
    let init = m.function_named(&report.static_init).unwrap();
    assert!(direct_calls(&m, init).is_empty());
}

#[test]
fn constant_static_stores_become_initializers() {
    let mut asm = Assembly::new("test");
    let config = asm.add_type(TypeDef::class("", "Config"));
    let limit = asm.add_field(config, FieldDef::static_field("Limit", TypeSig::I4));
    let ratio = asm.add_field(config, FieldDef::static_field("Ratio", TypeSig::R8));
    let init = asm.add_method(
        config,
        cctor(vec![
            ldc(42),
            with(Opcode::Stsfld, Operand::Field(limit)),
            ldc(3),
            with(Opcode::Stsfld, Operand::Field(ratio)),
            op(Opcode::Ret),
        ]),
    );
    let (_, m) = run(&asm);

    let limit = m.global_named("Config_Limit").unwrap();
    assert_eq!(m.value(m.initializer(limit).unwrap()).kind, ValueKind::ConstInt(42));
    let ratio = m.global_named("Config_Ratio").unwrap();
    assert_eq!(m.value(m.initializer(ratio).unwrap()).kind, ValueKind::ConstFloat(3.0));

    let function = m.function_named(&naming::method_name(&asm, init)).unwrap();
    assert_eq!(stores_in(&m, function), 0);
    assert_no_errors(&m);
}

#[test]
fn a_second_constant_store_happens_at_run_time() {
    let mut asm = Assembly::new("test");
    let config = asm.add_type(TypeDef::class("", "Config"));
    let limit = asm.add_field(config, FieldDef::static_field("Limit", TypeSig::I4));
    let init = asm.add_method(
        config,
        cctor(vec![
            ldc(1),
            with(Opcode::Stsfld, Operand::Field(limit)),
            ldc(2),
            with(Opcode::Stsfld, Operand::Field(limit)),
            op(Opcode::Ret),
        ]),
    );
    let (_, m) = run(&asm);

    let global = m.global_named("Config_Limit").unwrap();
    assert_eq!(m.value(m.initializer(global).unwrap()).kind, ValueKind::ConstInt(1));
    let function = m.function_named(&naming::method_name(&asm, init)).unwrap();
    assert_eq!(stores_in(&m, function), 1);
}

#[test]
fn stores_outside_static_constructors_are_not_folded() {
    let mut asm = Assembly::new("test");
    let config = asm.add_type(TypeDef::class("", "Config"));
    let limit = asm.add_field(config, FieldDef::static_field("Limit", TypeSig::I4));
    asm.add_method(
        config,
        static_method(
            "Reset",
            TypeSig::Void,
            &[],
            vec![],
            vec![ldc(7), with(Opcode::Stsfld, Operand::Field(limit)), op(Opcode::Ret)],
        ),
    );
    let (_, m) = run(&asm);

    let global = m.global_named("Config_Limit").unwrap();
    assert_eq!(m.value(m.initializer(global).unwrap()).kind, ValueKind::ConstNull);
}

#[test]
fn unsupported_instructions_abort_the_compilation() {
    let mut asm = Assembly::new("test");
    let app = asm.add_type(TypeDef::class("", "App"));
    asm.add_method(app, static_method("Copy", TypeSig::Void, &[], vec![], vec![op(Opcode::Cpblk), op(Opcode::Ret)]));

    let mut m = SsaModule::new("test");
    let err = compile(&asm, CompilerSettings::new("test"), &mut m).unwrap_err();
    assert!(matches!(err, CodegenError::UnsupportedInstruction { opcode: "cpblk", .. }), "{err:?}");
}
