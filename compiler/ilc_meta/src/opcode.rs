//! The closed set of stack-machine operations.
//!
//! Every CIL opcode is listed, including all short and immediate-operand
//! forms (`ldc.i4.0` .. `ldc.i4.8`, `br.s`, ...). Prefixes such as
//! `volatile.` are not opcodes here; they are flags on
//! [`Instruction`](crate::Instruction).

/// How an instruction affects control flow.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FlowControl {
    /// Falls through to the next instruction.
    Next,
    /// Unconditional jump to the operand target.
    Branch,
    /// Jumps to the operand target or falls through.
    CondBranch,
    /// Jumps to one of the operand targets or falls through.
    Switch,
    /// Leaves the method.
    Return,
    /// Raises or re-raises an exception.
    Throw,
}

impl FlowControl {
    /// Whether control can reach the instruction that follows.
    pub fn falls_through(self) -> bool {
        matches!(
            self,
            FlowControl::Next | FlowControl::CondBranch | FlowControl::Switch
        )
    }

    /// Whether the instruction ends a basic block.
    pub fn ends_block(self) -> bool {
        !matches!(self, FlowControl::Next)
    }
}

macro_rules! define_opcodes {
    ($($variant:ident => $mnemonic:literal, $flow:ident;)*) => {
        /// A CIL operation.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Every opcode, in CIL encoding order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// The textual IL mnemonic, e.g. `ldc.i4.s`.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }

            pub fn flow(self) -> FlowControl {
                match self {
                    $(Opcode::$variant => FlowControl::$flow,)*
                }
            }
        }
    };
}

define_opcodes! {
    Nop => "nop", Next;
    Break => "break", Next;
    Ldarg0 => "ldarg.0", Next;
    Ldarg1 => "ldarg.1", Next;
    Ldarg2 => "ldarg.2", Next;
    Ldarg3 => "ldarg.3", Next;
    Ldloc0 => "ldloc.0", Next;
    Ldloc1 => "ldloc.1", Next;
    Ldloc2 => "ldloc.2", Next;
    Ldloc3 => "ldloc.3", Next;
    Stloc0 => "stloc.0", Next;
    Stloc1 => "stloc.1", Next;
    Stloc2 => "stloc.2", Next;
    Stloc3 => "stloc.3", Next;
    LdargS => "ldarg.s", Next;
    LdargaS => "ldarga.s", Next;
    StargS => "starg.s", Next;
    LdlocS => "ldloc.s", Next;
    LdlocaS => "ldloca.s", Next;
    StlocS => "stloc.s", Next;
    Ldnull => "ldnull", Next;
    LdcI4M1 => "ldc.i4.m1", Next;
    LdcI40 => "ldc.i4.0", Next;
    LdcI41 => "ldc.i4.1", Next;
    LdcI42 => "ldc.i4.2", Next;
    LdcI43 => "ldc.i4.3", Next;
    LdcI44 => "ldc.i4.4", Next;
    LdcI45 => "ldc.i4.5", Next;
    LdcI46 => "ldc.i4.6", Next;
    LdcI47 => "ldc.i4.7", Next;
    LdcI48 => "ldc.i4.8", Next;
    LdcI4S => "ldc.i4.s", Next;
    LdcI4 => "ldc.i4", Next;
    LdcI8 => "ldc.i8", Next;
    LdcR4 => "ldc.r4", Next;
    LdcR8 => "ldc.r8", Next;
    Dup => "dup", Next;
    Pop => "pop", Next;
    Jmp => "jmp", Return;
    Call => "call", Next;
    Calli => "calli", Next;
    Ret => "ret", Return;
    BrS => "br.s", Branch;
    BrfalseS => "brfalse.s", CondBranch;
    BrtrueS => "brtrue.s", CondBranch;
    BeqS => "beq.s", CondBranch;
    BgeS => "bge.s", CondBranch;
    BgtS => "bgt.s", CondBranch;
    BleS => "ble.s", CondBranch;
    BltS => "blt.s", CondBranch;
    BneUnS => "bne.un.s", CondBranch;
    BgeUnS => "bge.un.s", CondBranch;
    BgtUnS => "bgt.un.s", CondBranch;
    BleUnS => "ble.un.s", CondBranch;
    BltUnS => "blt.un.s", CondBranch;
    Br => "br", Branch;
    Brfalse => "brfalse", CondBranch;
    Brtrue => "brtrue", CondBranch;
    Beq => "beq", CondBranch;
    Bge => "bge", CondBranch;
    Bgt => "bgt", CondBranch;
    Ble => "ble", CondBranch;
    Blt => "blt", CondBranch;
    BneUn => "bne.un", CondBranch;
    BgeUn => "bge.un", CondBranch;
    BgtUn => "bgt.un", CondBranch;
    BleUn => "ble.un", CondBranch;
    BltUn => "blt.un", CondBranch;
    Switch => "switch", Switch;
    LdindI1 => "ldind.i1", Next;
    LdindU1 => "ldind.u1", Next;
    LdindI2 => "ldind.i2", Next;
    LdindU2 => "ldind.u2", Next;
    LdindI4 => "ldind.i4", Next;
    LdindU4 => "ldind.u4", Next;
    LdindI8 => "ldind.i8", Next;
    LdindI => "ldind.i", Next;
    LdindR4 => "ldind.r4", Next;
    LdindR8 => "ldind.r8", Next;
    LdindRef => "ldind.ref", Next;
    StindRef => "stind.ref", Next;
    StindI1 => "stind.i1", Next;
    StindI2 => "stind.i2", Next;
    StindI4 => "stind.i4", Next;
    StindI8 => "stind.i8", Next;
    StindR4 => "stind.r4", Next;
    StindR8 => "stind.r8", Next;
    Add => "add", Next;
    Sub => "sub", Next;
    Mul => "mul", Next;
    Div => "div", Next;
    DivUn => "div.un", Next;
    Rem => "rem", Next;
    RemUn => "rem.un", Next;
    And => "and", Next;
    Or => "or", Next;
    Xor => "xor", Next;
    Shl => "shl", Next;
    Shr => "shr", Next;
    ShrUn => "shr.un", Next;
    Neg => "neg", Next;
    Not => "not", Next;
    ConvI1 => "conv.i1", Next;
    ConvI2 => "conv.i2", Next;
    ConvI4 => "conv.i4", Next;
    ConvI8 => "conv.i8", Next;
    ConvR4 => "conv.r4", Next;
    ConvR8 => "conv.r8", Next;
    ConvU4 => "conv.u4", Next;
    ConvU8 => "conv.u8", Next;
    Callvirt => "callvirt", Next;
    Cpobj => "cpobj", Next;
    Ldobj => "ldobj", Next;
    Ldstr => "ldstr", Next;
    Newobj => "newobj", Next;
    Castclass => "castclass", Next;
    Isinst => "isinst", Next;
    ConvRUn => "conv.r.un", Next;
    Unbox => "unbox", Next;
    Throw => "throw", Throw;
    Ldfld => "ldfld", Next;
    Ldflda => "ldflda", Next;
    Stfld => "stfld", Next;
    Ldsfld => "ldsfld", Next;
    Ldsflda => "ldsflda", Next;
    Stsfld => "stsfld", Next;
    Stobj => "stobj", Next;
    ConvOvfI1Un => "conv.ovf.i1.un", Next;
    ConvOvfI2Un => "conv.ovf.i2.un", Next;
    ConvOvfI4Un => "conv.ovf.i4.un", Next;
    ConvOvfI8Un => "conv.ovf.i8.un", Next;
    ConvOvfU1Un => "conv.ovf.u1.un", Next;
    ConvOvfU2Un => "conv.ovf.u2.un", Next;
    ConvOvfU4Un => "conv.ovf.u4.un", Next;
    ConvOvfU8Un => "conv.ovf.u8.un", Next;
    ConvOvfIUn => "conv.ovf.i.un", Next;
    ConvOvfUUn => "conv.ovf.u.un", Next;
    Box => "box", Next;
    Newarr => "newarr", Next;
    Ldlen => "ldlen", Next;
    Ldelema => "ldelema", Next;
    LdelemI1 => "ldelem.i1", Next;
    LdelemU1 => "ldelem.u1", Next;
    LdelemI2 => "ldelem.i2", Next;
    LdelemU2 => "ldelem.u2", Next;
    LdelemI4 => "ldelem.i4", Next;
    LdelemU4 => "ldelem.u4", Next;
    LdelemI8 => "ldelem.i8", Next;
    LdelemI => "ldelem.i", Next;
    LdelemR4 => "ldelem.r4", Next;
    LdelemR8 => "ldelem.r8", Next;
    LdelemRef => "ldelem.ref", Next;
    StelemI => "stelem.i", Next;
    StelemI1 => "stelem.i1", Next;
    StelemI2 => "stelem.i2", Next;
    StelemI4 => "stelem.i4", Next;
    StelemI8 => "stelem.i8", Next;
    StelemR4 => "stelem.r4", Next;
    StelemR8 => "stelem.r8", Next;
    StelemRef => "stelem.ref", Next;
    Ldelem => "ldelem", Next;
    Stelem => "stelem", Next;
    UnboxAny => "unbox.any", Next;
    ConvOvfI1 => "conv.ovf.i1", Next;
    ConvOvfU1 => "conv.ovf.u1", Next;
    ConvOvfI2 => "conv.ovf.i2", Next;
    ConvOvfU2 => "conv.ovf.u2", Next;
    ConvOvfI4 => "conv.ovf.i4", Next;
    ConvOvfU4 => "conv.ovf.u4", Next;
    ConvOvfI8 => "conv.ovf.i8", Next;
    ConvOvfU8 => "conv.ovf.u8", Next;
    Refanyval => "refanyval", Next;
    Ckfinite => "ckfinite", Next;
    Mkrefany => "mkrefany", Next;
    Ldtoken => "ldtoken", Next;
    ConvU2 => "conv.u2", Next;
    ConvU1 => "conv.u1", Next;
    ConvI => "conv.i", Next;
    ConvOvfI => "conv.ovf.i", Next;
    ConvOvfU => "conv.ovf.u", Next;
    AddOvf => "add.ovf", Next;
    AddOvfUn => "add.ovf.un", Next;
    MulOvf => "mul.ovf", Next;
    MulOvfUn => "mul.ovf.un", Next;
    SubOvf => "sub.ovf", Next;
    SubOvfUn => "sub.ovf.un", Next;
    Endfinally => "endfinally", Return;
    Leave => "leave", Branch;
    LeaveS => "leave.s", Branch;
    StindI => "stind.i", Next;
    ConvU => "conv.u", Next;
    Arglist => "arglist", Next;
    Ceq => "ceq", Next;
    Cgt => "cgt", Next;
    CgtUn => "cgt.un", Next;
    Clt => "clt", Next;
    CltUn => "clt.un", Next;
    Ldftn => "ldftn", Next;
    Ldvirtftn => "ldvirtftn", Next;
    Ldarg => "ldarg", Next;
    Ldarga => "ldarga", Next;
    Starg => "starg", Next;
    Ldloc => "ldloc", Next;
    Ldloca => "ldloca", Next;
    Stloc => "stloc", Next;
    Localloc => "localloc", Next;
    Endfilter => "endfilter", Return;
    Initobj => "initobj", Next;
    Cpblk => "cpblk", Next;
    Initblk => "initblk", Next;
    Rethrow => "rethrow", Throw;
    Sizeof => "sizeof", Next;
    Refanytype => "refanytype", Next;
}

#[cfg(test)]
mod tests;
