//! `conv.*` in all its checked and unchecked forms.
//!
//! Overflow checks are not emitted; the checked forms convert like their
//! unchecked counterparts. The `.un` forms read the source as unsigned.

use ilc_meta::{Instruction, Opcode, TypeSig};
use ilc_ssa::{Backend, CastOp};

use super::CodeEmitter;
use crate::cast::{coerce, NATIVE_INT_BITS};
use crate::method::MethodContext;
use crate::stack::StackElement;
use crate::type_map::{is_signed, stack_sig};
use crate::CodegenResult;

/// Target signature of a conversion and whether the source is read as
/// unsigned.
fn target(opcode: Opcode) -> Option<(TypeSig, bool)> {
    use Opcode as O;
    Some(match opcode {
        O::ConvI1 | O::ConvOvfI1 => (TypeSig::I1, false),
        O::ConvU1 | O::ConvOvfU1 => (TypeSig::U1, false),
        O::ConvI2 | O::ConvOvfI2 => (TypeSig::I2, false),
        O::ConvU2 | O::ConvOvfU2 => (TypeSig::U2, false),
        O::ConvI4 | O::ConvOvfI4 => (TypeSig::I4, false),
        O::ConvU4 | O::ConvOvfU4 => (TypeSig::U4, false),
        O::ConvI8 | O::ConvOvfI8 => (TypeSig::I8, false),
        O::ConvU8 | O::ConvOvfU8 => (TypeSig::U8, false),
        O::ConvI | O::ConvOvfI => (TypeSig::IntPtr, false),
        O::ConvU | O::ConvOvfU => (TypeSig::UIntPtr, false),
        O::ConvR4 => (TypeSig::R4, false),
        O::ConvR8 => (TypeSig::R8, false),
        O::ConvRUn => (TypeSig::R8, true),
        O::ConvOvfI1Un => (TypeSig::I1, true),
        O::ConvOvfU1Un => (TypeSig::U1, true),
        O::ConvOvfI2Un => (TypeSig::I2, true),
        O::ConvOvfU2Un => (TypeSig::U2, true),
        O::ConvOvfI4Un => (TypeSig::I4, true),
        O::ConvOvfU4Un => (TypeSig::U4, true),
        O::ConvOvfI8Un => (TypeSig::I8, true),
        O::ConvOvfU8Un => (TypeSig::U8, true),
        O::ConvOvfIUn => (TypeSig::IntPtr, true),
        O::ConvOvfUUn => (TypeSig::UIntPtr, true),
        _ => return None,
    })
}

fn bits_of(sig: &TypeSig) -> u32 {
    match sig {
        TypeSig::I1 | TypeSig::U1 => 8,
        TypeSig::I2 | TypeSig::U2 => 16,
        TypeSig::I4 | TypeSig::U4 | TypeSig::R4 => 32,
        _ => 64,
    }
}

pub struct Convert;

impl CodeEmitter for Convert {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()> {
        let Some((sig, unsigned_source)) = target(instr.opcode) else {
            return Err(ctx.malformed("not a conversion"));
        };
        let source = ctx.pop()?;
        let source_signed = !unsigned_source && is_signed(ctx.asm(), &source.sig);
        let bits = bits_of(&sig);

        let mut value = source.value;
        if b.classify(source.ty).is_pointer() {
            let native = b.int_type(NATIVE_INT_BITS);
            value = b.cast(CastOp::PtrToInt, value, native);
        }

        if sig.is_float() {
            let ty = b.float_type(bits);
            let value = coerce(b, value, ty, source_signed);
            ctx.push(StackElement::new(value, sig, ty));
            return Ok(());
        }

        let ty = b.int_type(bits);
        let signed = if source.sig.is_float() {
            !sig.is_unsigned()
        } else {
            source_signed
        };
        let mut value = coerce(b, value, ty, signed);
        let mut result_ty = ty;
        if bits < 32 {
            // Small results live on the stack as `int32`, extended by the
            // signedness of the target.
            result_ty = b.int_type(32);
            value = b.int_cast(value, result_ty, !sig.is_unsigned());
        }
        ctx.push(StackElement::new(value, stack_sig(ctx.asm(), &sig), result_ty));
        Ok(())
    }
}
