//! Numeric and pointer cast normalization.

use ilc_meta::{Assembly, TypeSig};
use ilc_ssa::{Backend, CastOp, TypeClass, TypeId, ValueId};

use crate::stack::StackElement;
use crate::type_map::{is_signed, stack_sig};

/// Width of `IntPtr` and of pointer-to-integer detours.
pub const NATIVE_INT_BITS: u32 = 64;

/// Convert `value` to `ty` with whatever cast the two type classes call
/// for. Values already of type `ty`, and pairs with no sensible cast, are
/// returned unchanged.
pub fn coerce(b: &mut dyn Backend, value: ValueId, ty: TypeId, signed: bool) -> ValueId {
    let from = b.type_of(value);
    if from == ty {
        return value;
    }
    match (b.classify(from), b.classify(ty)) {
        (TypeClass::Int(_), TypeClass::Int(_)) => b.int_cast(value, ty, signed),
        (TypeClass::Pointer, TypeClass::Pointer) => b.cast(CastOp::BitCast, value, ty),
        (TypeClass::Pointer, TypeClass::Int(_)) => b.cast(CastOp::PtrToInt, value, ty),
        (TypeClass::Int(_), TypeClass::Pointer) => b.cast(CastOp::IntToPtr, value, ty),
        (TypeClass::Float(a), TypeClass::Float(c)) if a < c => b.cast(CastOp::FpExt, value, ty),
        (TypeClass::Float(_), TypeClass::Float(_)) => b.cast(CastOp::FpTrunc, value, ty),
        (TypeClass::Int(_), TypeClass::Float(_)) => {
            let op = if signed { CastOp::SiToFp } else { CastOp::UiToFp };
            b.cast(op, value, ty)
        }
        (TypeClass::Float(_), TypeClass::Int(_)) => {
            let op = if signed { CastOp::FpToSi } else { CastOp::FpToUi };
            b.cast(op, value, ty)
        }
        _ => value,
    }
}

/// Bring `value` to the native integer type: pointers through
/// `ptrtoint`, integers through a width cast.
pub fn to_native_int(b: &mut dyn Backend, value: ValueId, signed: bool) -> ValueId {
    let native = b.int_type(NATIVE_INT_BITS);
    coerce(b, value, native, signed)
}

/// Widen the narrower of two integer operands to the wider one's type.
pub fn help_int_cast(asm: &Assembly, b: &mut dyn Backend, lhs: &mut StackElement, rhs: &mut StackElement) {
    let (Some(l), Some(r)) = (b.classify(lhs.ty).bits(), b.classify(rhs.ty).bits()) else {
        return;
    };
    if l > r {
        rhs.value = b.int_cast(rhs.value, lhs.ty, is_signed(asm, &rhs.sig));
        rhs.ty = lhs.ty;
        rhs.sig = lhs.sig.clone();
    } else if r > l {
        lhs.value = b.int_cast(lhs.value, rhs.ty, is_signed(asm, &lhs.sig));
        lhs.ty = rhs.ty;
        lhs.sig = rhs.sig.clone();
    }
}

/// If either operand is a pointer, move both to the native integer type.
/// Returns which operands were pointers.
pub fn help_possible_ptr_cast(
    asm: &Assembly,
    b: &mut dyn Backend,
    lhs: &mut StackElement,
    rhs: &mut StackElement,
) -> (bool, bool) {
    let lhs_ptr = b.classify(lhs.ty).is_pointer();
    let rhs_ptr = b.classify(rhs.ty).is_pointer();
    if lhs_ptr || rhs_ptr {
        let native = b.int_type(NATIVE_INT_BITS);
        for operand in [&mut *lhs, &mut *rhs] {
            operand.value = to_native_int(b, operand.value, is_signed(asm, &operand.sig));
            operand.ty = native;
            operand.sig = TypeSig::IntPtr;
        }
    }
    (lhs_ptr, rhs_ptr)
}

/// Turn a value loaded from storage of signature `sig` into a stack
/// element, widening small integers to 32 bits.
pub fn to_stack(asm: &Assembly, b: &mut dyn Backend, value: ValueId, sig: &TypeSig) -> StackElement {
    let stack = stack_sig(asm, sig);
    let ty = b.type_of(value);
    match b.classify(ty) {
        TypeClass::Int(bits) if bits < 32 => {
            let i32_ty = b.int_type(32);
            let widened = b.int_cast(value, i32_ty, is_signed(asm, sig));
            StackElement::new(widened, stack, i32_ty)
        }
        _ => StackElement::new(value, stack, ty),
    }
}

#[cfg(test)]
mod tests;
