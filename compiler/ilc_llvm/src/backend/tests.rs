use ilc_codegen::{compile, CompilerSettings};
use ilc_meta::{Assembly, Instruction, MethodDef, MethodFlags, Opcode, Operand, TypeDef, TypeSig};
use ilc_ssa::{Backend, BinaryOp, CastOp, Linkage, OptLevel, TypeClass};
use inkwell::context::Context;
use pretty_assertions::assert_eq;

use super::LlvmBackend;

fn backend(context: &Context) -> LlvmBackend<'_> {
    LlvmBackend::new(context, "test").expect("native target")
}

fn op(opcode: Opcode) -> Instruction {
    Instruction::op(opcode)
}

fn target(opcode: Opcode, index: usize) -> Instruction {
    Instruction::new(opcode, Operand::Target(index))
}

fn static_method(name: &str, ret: TypeSig, params: &[TypeSig], locals: Vec<TypeSig>, body: Vec<Instruction>) -> MethodDef {
    let mut method = MethodDef::new(name, ret).with_flags(MethodFlags::STATIC);
    for (i, ty) in params.iter().enumerate() {
        method = method.with_param(format!("p{i}"), ty.clone());
    }
    method.with_body(locals, body)
}

#[test]
fn builds_and_verifies_a_function() {
    let context = Context::create();
    let mut b = backend(&context);
    let i32_ty = b.int_type(32);
    let fn_ty = b.function_type(i32_ty, &[i32_ty, i32_ty]);
    let f = b.add_function("sum", fn_ty, Linkage::External);
    let entry = b.append_block(f, "entry");
    b.position_at_end(entry);
    let (x, y) = (b.param(f, 0), b.param(f, 1));
    let total = b.binary(BinaryOp::Add, x, y);
    b.ret(Some(total));

    assert!(b.is_terminated(entry));
    assert_eq!(b.verify_function(f), Ok(()));
    assert!(b.print_to_string().contains("add i32"), "{}", b.print_to_string());
}

#[test]
fn structural_types_are_interned() {
    let context = Context::create();
    let mut b = backend(&context);
    let i8_ty = b.int_type(8);
    let i32_ty = b.int_type(32);
    assert_eq!(b.int_type(32), i32_ty);
    assert_eq!(b.pointer_type(i8_ty), b.generic_pointer());
    assert_ne!(b.pointer_type(i32_ty), b.generic_pointer());
    assert_eq!(b.classify(i32_ty), TypeClass::Int(32));

    let node = b.named_struct("Node");
    assert_eq!(b.size_of(node), 0);
    let next = b.pointer_type(node);
    b.set_struct_body(node, &[i32_ty, next], false);
    assert_eq!(b.size_of(node), 16);
    assert_eq!(b.size_of(next), 8);
    assert_eq!(b.classify(node), TypeClass::Struct);
}

#[test]
fn constants_are_readable_back() {
    let context = Context::create();
    let mut b = backend(&context);
    let i16_ty = b.int_type(16);
    let f64_ty = b.float_type(64);
    let minus_five = b.const_int(i16_ty, -5);
    let half = b.const_float(f64_ty, 0.5);
    let global = b.add_global("counter", i16_ty);

    assert_eq!(b.const_int_value(minus_five), Some(-5));
    assert_eq!(b.const_float_value(half), Some(0.5));
    assert_eq!(b.const_int_value(half), None);
    assert!(b.is_constant(global));
    assert_eq!(b.classify(b.type_of(global)), TypeClass::Pointer);

    b.set_initializer(global, minus_five);
    assert_eq!(b.errors().count(), 0);
    assert!(b.print_to_string().contains("@counter = global i16 -5"), "{}", b.print_to_string());
}

#[test]
fn string_literals_are_private_nul_terminated_globals() {
    let context = Context::create();
    let mut b = backend(&context);
    let s = b.const_string("hi");
    assert!(b.is_constant(s));
    let text = b.print_to_string();
    assert!(text.contains("@.str.0 = private constant [3 x i8] c\"hi\\00\""), "{text}");
}

#[test]
fn operand_mismatch_fails_verification() {
    let context = Context::create();
    let mut b = backend(&context);
    let i32_ty = b.int_type(32);
    let f64_ty = b.float_type(64);
    let void = b.void_type();
    let fn_ty = b.function_type(void, &[i32_ty, f64_ty]);
    let f = b.add_function("bad", fn_ty, Linkage::Internal);
    let entry = b.append_block(f, "entry");
    b.position_at_end(entry);
    let (x, y) = (b.param(f, 0), b.param(f, 1));
    let sum = b.binary(BinaryOp::Add, x, y);
    b.ret(None);

    assert_eq!(b.type_of(sum), i32_ty);
    let err = b.verify_function(f).unwrap_err();
    assert_eq!(err.function, "bad");
    assert!(err.message.starts_with("add on"), "{}", err.message);
}

#[test]
fn phi_goes_to_the_head_of_its_block() {
    let context = Context::create();
    let mut b = backend(&context);
    let bool_ty = b.int_type(1);
    let i32_ty = b.int_type(32);
    let fn_ty = b.function_type(i32_ty, &[bool_ty]);
    let f = b.add_function("pick", fn_ty, Linkage::External);
    let entry = b.append_block(f, "entry");
    let then_block = b.append_block(f, "then");
    let else_block = b.append_block(f, "else");
    let join = b.append_block(f, "join");

    b.position_at_end(entry);
    let cond = b.param(f, 0);
    b.cond_br(cond, then_block, else_block);
    b.position_at_end(then_block);
    let one = b.const_int(i32_ty, 1);
    b.br(join);
    b.position_at_end(else_block);
    let two = b.const_int(i32_ty, 2);
    b.br(join);

    b.position_at_end(join);
    let flag = b.cast(CastOp::ZExt, cond, i32_ty);
    let phi = b.phi(join, i32_ty);
    b.add_incoming(phi, one, then_block);
    b.add_incoming(phi, two, else_block);
    assert_eq!(b.current_block(), Some(join));
    let picked = b.binary(BinaryOp::Add, phi, flag);
    b.ret(Some(picked));

    assert_eq!(b.verify_function(f), Ok(()));
    assert!(b.print_to_string().contains("phi i32 [ 1, %then ], [ 2, %else ]"), "{}", b.print_to_string());
}

fn ternary_and_loop() -> Assembly {
    let mut asm = Assembly::new("test");
    let logic = asm.add_type(TypeDef::class("Demo", "Logic"));
    asm.add_method(
        logic,
        static_method(
            "Pick",
            TypeSig::I4,
            &[TypeSig::Boolean],
            vec![],
            vec![
                op(Opcode::Ldarg0),
                target(Opcode::Brfalse, 4),
                op(Opcode::LdcI41),
                target(Opcode::Br, 5),
                op(Opcode::LdcI42),
                op(Opcode::Ret),
            ],
        ),
    );
    asm.add_method(
        logic,
        static_method(
            "Count",
            TypeSig::I4,
            &[],
            vec![TypeSig::I4],
            vec![
                op(Opcode::LdcI40),
                op(Opcode::Stloc0),
                target(Opcode::Br, 7),
                op(Opcode::Ldloc0),
                op(Opcode::LdcI41),
                op(Opcode::Add),
                op(Opcode::Stloc0),
                op(Opcode::Ldloc0),
                Instruction::new(Opcode::LdcI4, Operand::Int32(10)),
                target(Opcode::Blt, 3),
                op(Opcode::Ldloc0),
                op(Opcode::Ret),
            ],
        ),
    );
    asm
}

#[test]
fn translated_assembly_passes_the_module_verifier() {
    let context = Context::create();
    let mut b = backend(&context);
    let report = compile(&ternary_and_loop(), CompilerSettings::new("test"), &mut b).unwrap();

    assert_eq!(report.compiled.len(), 2);
    assert_eq!(b.errors().count(), 0);
    b.finish().unwrap();
    let text = b.print_to_string();
    assert!(text.contains("define void @test_static_init()"), "{text}");
    assert!(text.contains("phi i32"), "{text}");
}

#[test]
fn optimized_module_is_written_as_an_object() {
    let context = Context::create();
    let mut b = backend(&context);
    let settings = CompilerSettings::new("test").with_optimization(OptLevel::O2);
    compile(&ternary_and_loop(), settings, &mut b).unwrap();
    b.finish().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let object = dir.path().join("test.o");
    let ir = dir.path().join("test.ll");
    b.write_object(&object).unwrap();
    b.write_ir(&ir).unwrap();
    assert!(std::fs::metadata(&object).unwrap().len() > 0);
    assert!(std::fs::read_to_string(&ir).unwrap().contains("test_static_init"));
}
