use ilc_meta::{Assembly, TypeSig};
use ilc_ssa::{Backend, CastOp, Inst, Linkage, SsaModule};
use pretty_assertions::assert_eq;

use super::*;

fn module() -> SsaModule {
    let mut m = SsaModule::new("t");
    let void = m.void_type();
    let fn_ty = m.function_type(void, &[]);
    let f = m.add_function("f", fn_ty, Linkage::Internal);
    let entry = m.append_block(f, "entry");
    m.position_at_end(entry);
    m
}

fn cast_op(m: &SsaModule, value: ValueId) -> Option<CastOp> {
    match m.inst(value) {
        Some(Inst::Cast { op, .. }) => Some(*op),
        _ => None,
    }
}

#[test]
fn coerce_picks_the_cast_for_each_type_pair() {
    let mut m = module();
    let i32_ty = m.int_type(32);
    let i64_ty = m.int_type(64);
    let f64_ty = m.float_type(64);
    let f32_ty = m.float_type(32);
    let ptr = m.generic_pointer();

    let int = m.const_int(i32_ty, -1);
    let wide = coerce(&mut m, int, i64_ty, true);
    assert_eq!(cast_op(&m, wide), Some(CastOp::SExt));
    let unsigned = coerce(&mut m, int, i64_ty, false);
    assert_eq!(cast_op(&m, unsigned), Some(CastOp::ZExt));

    let float = coerce(&mut m, int, f64_ty, true);
    assert_eq!(cast_op(&m, float), Some(CastOp::SiToFp));
    let narrow = coerce(&mut m, float, f32_ty, true);
    assert_eq!(cast_op(&m, narrow), Some(CastOp::FpTrunc));

    let null = m.const_null(ptr);
    let addr = coerce(&mut m, null, i64_ty, false);
    assert_eq!(cast_op(&m, addr), Some(CastOp::PtrToInt));
    let back = coerce(&mut m, addr, ptr, false);
    assert_eq!(cast_op(&m, back), Some(CastOp::IntToPtr));

    assert_eq!(coerce(&mut m, int, i32_ty, true), int);
    assert_eq!(m.errors().count(), 0);
}

#[test]
fn int_cast_helper_widens_the_narrower_operand() {
    let asm = Assembly::new("t");
    let mut m = module();
    let i32_ty = m.int_type(32);
    let i64_ty = m.int_type(64);
    let a = m.const_int(i32_ty, 1);
    let c = m.const_int(i64_ty, 2);
    let mut lhs = StackElement::new(a, TypeSig::I4, i32_ty);
    let mut rhs = StackElement::new(c, TypeSig::I8, i64_ty);

    help_int_cast(&asm, &mut m, &mut lhs, &mut rhs);

    assert_eq!(lhs.ty, i64_ty);
    assert_eq!(lhs.sig, TypeSig::I8);
    assert_eq!(cast_op(&m, lhs.value), Some(CastOp::SExt));
    assert_eq!(rhs.value, c);
}

#[test]
fn pointer_operands_detour_through_native_int() {
    let asm = Assembly::new("t");
    let mut m = module();
    let i32_ty = m.int_type(32);
    let ptr = m.generic_pointer();
    let p = m.const_null(ptr);
    let offset = m.const_int(i32_ty, 4);
    let mut lhs = StackElement::new(p, TypeSig::pointer(TypeSig::U1), ptr);
    let mut rhs = StackElement::new(offset, TypeSig::I4, i32_ty);

    let flags = help_possible_ptr_cast(&asm, &mut m, &mut lhs, &mut rhs);

    assert_eq!(flags, (true, false));
    let native = m.int_type(NATIVE_INT_BITS);
    assert_eq!(lhs.ty, native);
    assert_eq!(rhs.ty, native);
    assert_eq!(m.type_of(lhs.value), native);
    assert_eq!(m.type_of(rhs.value), native);
}

#[test]
fn small_integers_widen_on_the_stack() {
    let asm = Assembly::new("t");
    let mut m = module();
    let i8_ty = m.int_type(8);
    let i32_ty = m.int_type(32);
    let byte = m.const_int(i8_ty, -1);

    let signed = to_stack(&asm, &mut m, byte, &TypeSig::I1);
    assert_eq!((signed.ty, signed.sig.clone()), (i32_ty, TypeSig::I4));
    assert_eq!(cast_op(&m, signed.value), Some(CastOp::SExt));

    let flag = to_stack(&asm, &mut m, byte, &TypeSig::Boolean);
    assert_eq!(cast_op(&m, flag.value), Some(CastOp::ZExt));
}
