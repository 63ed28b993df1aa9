//! Shared fixtures for the unit tests.

#![allow(clippy::unwrap_used, reason = "test fixtures unwrap for brevity")]

use ilc_meta::{Assembly, Instruction, MethodDef, MethodFlags, Opcode, Operand, TypeSig};
use ilc_ssa::SsaModule;

use crate::context::CodegenContext;
use crate::types::{compile_types, declare_types};
use crate::CompilerSettings;

/// Instruction without an operand.
pub fn op(opcode: Opcode) -> Instruction {
    Instruction::op(opcode)
}

pub fn with(opcode: Opcode, operand: Operand) -> Instruction {
    Instruction::new(opcode, operand)
}

pub fn ldc(value: i32) -> Instruction {
    with(Opcode::LdcI4, Operand::Int32(value))
}

/// A static method with a body.
pub fn static_method(name: &str, ret: TypeSig, params: &[TypeSig], locals: Vec<TypeSig>, body: Vec<Instruction>) -> MethodDef {
    let mut method = MethodDef::new(name, ret).with_flags(MethodFlags::STATIC);
    for (i, ty) in params.iter().enumerate() {
        method = method.with_param(format!("p{i}"), ty.clone());
    }
    method.with_body(locals, body)
}

pub fn virtual_method(name: &str, ret: TypeSig) -> MethodDef {
    MethodDef::new(name, ret).with_flags(MethodFlags::VIRTUAL)
}

/// A context over `asm` with every type declared and defined.
pub fn prepared(asm: &Assembly) -> (CodegenContext<'_>, SsaModule) {
    let mut cx = CodegenContext::new(asm, CompilerSettings::new("test"));
    let mut m = SsaModule::new("test");
    declare_types(&mut cx, &mut m).unwrap();
    compile_types(&mut cx, &mut m).unwrap();
    (cx, m)
}

/// Fail with the recorded construction errors, if any.
pub fn assert_no_errors(m: &SsaModule) {
    let errors: Vec<&str> = m.errors().collect();
    assert!(errors.is_empty(), "IR construction errors: {errors:#?}");
}
