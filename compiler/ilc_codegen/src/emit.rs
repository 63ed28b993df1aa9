//! Instruction dispatch.
//!
//! [`dispatch`] maps every opcode to one of three outcomes: a handler,
//! *deferred* (a construct not implemented yet; the method is skipped
//! with a warning), or *unsupported* (a fatal error). Immediate-operand
//! and short forms share the handler of their long form.

mod arithmetic;
mod arrays;
mod branch;
mod calls;
mod compare;
mod constants;
mod convert;
mod fields;
mod memory;
mod misc;
mod variables;

use ilc_meta::{Instruction, Opcode};
use ilc_ssa::Backend;

use crate::method::MethodContext;
use crate::CodegenResult;

/// Translates one instruction: pops its operands, appends IR at the
/// current block, and pushes its results.
pub trait CodeEmitter {
    fn emit(&self, instr: &Instruction, ctx: &mut MethodContext<'_, '_>, b: &mut dyn Backend) -> CodegenResult<()>;
}

pub enum Dispatch {
    Handler(&'static dyn CodeEmitter),
    Deferred,
    Unsupported,
}

pub fn dispatch(opcode: Opcode) -> Dispatch {
    use Opcode as O;

    let handler: &'static dyn CodeEmitter = match opcode {
        O::LdcI4M1
        | O::LdcI40
        | O::LdcI41
        | O::LdcI42
        | O::LdcI43
        | O::LdcI44
        | O::LdcI45
        | O::LdcI46
        | O::LdcI47
        | O::LdcI48
        | O::LdcI4S
        | O::LdcI4
        | O::LdcI8
        | O::LdcR4
        | O::LdcR8 => &constants::LoadConstant,
        O::Ldnull => &constants::LoadNull,
        O::Ldstr => &constants::LoadString,

        O::Ldarg0 | O::Ldarg1 | O::Ldarg2 | O::Ldarg3 | O::LdargS | O::Ldarg => &variables::LoadArg,
        O::LdargaS | O::Ldarga => &variables::LoadArgAddress,
        O::StargS | O::Starg => &variables::StoreArg,
        O::Ldloc0 | O::Ldloc1 | O::Ldloc2 | O::Ldloc3 | O::LdlocS | O::Ldloc => &variables::LoadLocal,
        O::LdlocaS | O::Ldloca => &variables::LoadLocalAddress,
        O::Stloc0 | O::Stloc1 | O::Stloc2 | O::Stloc3 | O::StlocS | O::Stloc => &variables::StoreLocal,

        O::Nop => &misc::Nop,
        O::Dup => &misc::Dup,
        O::Pop => &misc::Pop,
        O::Sizeof => &misc::SizeOf,

        O::Add
        | O::AddOvf
        | O::AddOvfUn
        | O::Sub
        | O::SubOvf
        | O::SubOvfUn
        | O::Mul
        | O::MulOvf
        | O::MulOvfUn
        | O::Div
        | O::DivUn
        | O::Rem
        | O::RemUn
        | O::And
        | O::Or
        | O::Xor
        | O::Shl
        | O::Shr
        | O::ShrUn => &arithmetic::Binary,
        O::Neg => &arithmetic::Negate,
        O::Not => &arithmetic::Not,

        O::Ceq | O::Cgt | O::CgtUn | O::Clt | O::CltUn => &compare::Compare,

        O::Br | O::BrS => &branch::Branch,
        O::Brtrue | O::BrtrueS | O::Brfalse | O::BrfalseS => &branch::BranchIf,
        O::Beq
        | O::BeqS
        | O::Bge
        | O::BgeS
        | O::Bgt
        | O::BgtS
        | O::Ble
        | O::BleS
        | O::Blt
        | O::BltS
        | O::BneUn
        | O::BneUnS
        | O::BgeUn
        | O::BgeUnS
        | O::BgtUn
        | O::BgtUnS
        | O::BleUn
        | O::BleUnS
        | O::BltUn
        | O::BltUnS => &branch::CompareBranch,
        O::Switch => &branch::Switch,
        O::Ret => &branch::Return,

        O::ConvI1
        | O::ConvI2
        | O::ConvI4
        | O::ConvI8
        | O::ConvR4
        | O::ConvR8
        | O::ConvU4
        | O::ConvU8
        | O::ConvRUn
        | O::ConvU2
        | O::ConvU1
        | O::ConvI
        | O::ConvU
        | O::ConvOvfI1Un
        | O::ConvOvfI2Un
        | O::ConvOvfI4Un
        | O::ConvOvfI8Un
        | O::ConvOvfU1Un
        | O::ConvOvfU2Un
        | O::ConvOvfU4Un
        | O::ConvOvfU8Un
        | O::ConvOvfIUn
        | O::ConvOvfUUn
        | O::ConvOvfI1
        | O::ConvOvfU1
        | O::ConvOvfI2
        | O::ConvOvfU2
        | O::ConvOvfI4
        | O::ConvOvfU4
        | O::ConvOvfI8
        | O::ConvOvfU8
        | O::ConvOvfI
        | O::ConvOvfU => &convert::Convert,

        O::LdindI1
        | O::LdindU1
        | O::LdindI2
        | O::LdindU2
        | O::LdindI4
        | O::LdindU4
        | O::LdindI8
        | O::LdindI
        | O::LdindR4
        | O::LdindR8
        | O::LdindRef => &memory::LoadIndirect,
        O::StindRef
        | O::StindI1
        | O::StindI2
        | O::StindI4
        | O::StindI8
        | O::StindR4
        | O::StindR8
        | O::StindI => &memory::StoreIndirect,
        O::Ldobj => &memory::LoadObject,
        O::Stobj => &memory::StoreObject,
        O::Initobj => &memory::InitObject,

        O::Ldfld => &fields::LoadField,
        O::Ldflda => &fields::LoadFieldAddress,
        O::Stfld => &fields::StoreField,
        O::Ldsfld => &fields::LoadStatic,
        O::Ldsflda => &fields::LoadStaticAddress,
        O::Stsfld => &fields::StoreStatic,

        O::Call => &calls::Call,
        O::Callvirt => &calls::CallVirtual,
        O::Newobj => &calls::NewObject,

        O::Newarr => &arrays::NewArray,
        O::Ldelema => &arrays::LoadElementAddress,
        O::LdelemI1
        | O::LdelemU1
        | O::LdelemI2
        | O::LdelemU2
        | O::LdelemI4
        | O::LdelemU4
        | O::LdelemI8
        | O::LdelemI
        | O::LdelemR4
        | O::LdelemR8
        | O::LdelemRef
        | O::Ldelem => &arrays::LoadElement,
        O::StelemI
        | O::StelemI1
        | O::StelemI2
        | O::StelemI4
        | O::StelemI8
        | O::StelemR4
        | O::StelemR8
        | O::StelemRef
        | O::Stelem => &arrays::StoreElement,

        O::Box
        | O::Unbox
        | O::UnboxAny
        | O::Isinst
        | O::Castclass
        | O::Throw
        | O::Rethrow
        | O::Leave
        | O::LeaveS
        | O::Endfinally
        | O::Endfilter
        | O::Ldtoken
        | O::Ldftn
        | O::Ldvirtftn
        | O::Ldlen
        | O::Localloc
        | O::Ckfinite => return Dispatch::Deferred,

        O::Break
        | O::Jmp
        | O::Calli
        | O::Arglist
        | O::Mkrefany
        | O::Refanyval
        | O::Refanytype
        | O::Cpblk
        | O::Initblk
        | O::Cpobj => return Dispatch::Unsupported,
    };
    Dispatch::Handler(handler)
}
