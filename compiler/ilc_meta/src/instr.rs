//! Instructions and their operands.

use crate::{FieldId, MethodId, Opcode, TypeDefId, TypeSig};

/// An instruction operand.
///
/// Branch targets are indices into the method's instruction list, not byte
/// offsets.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    None,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Type token (`newarr`, `sizeof`, `initobj`, `ldobj`, ...).
    Type(TypeSig),
    /// Field token (`ldfld`, `stsfld`, ...). A type definition ID is not
    /// needed; fields know their declaring type.
    Field(FieldId),
    Method(MethodId),
    Target(usize),
    Switch(Vec<usize>),
    /// Argument index for `ldarg`, `starg`, `ldarga` and their short forms.
    Arg(u16),
    /// Local index for `ldloc`, `stloc`, `ldloca` and their short forms.
    Local(u16),
}

impl Operand {
    /// Shorthand for `Operand::Type(TypeSig::Named(id))`.
    pub fn named(id: TypeDefId) -> Self {
        Operand::Type(TypeSig::Named(id))
    }
}

/// A single decoded instruction.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Instruction {
    pub opcode: Opcode,
    #[cfg_attr(feature = "serde", serde(default = "Instruction::no_operand"))]
    pub operand: Operand,
    /// Set when the instruction carries the `volatile.` prefix.
    #[cfg_attr(feature = "serde", serde(default))]
    pub volatile: bool,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Operand) -> Self {
        Instruction {
            opcode,
            operand,
            volatile: false,
        }
    }

    /// Instruction without an operand.
    pub fn op(opcode: Opcode) -> Self {
        Self::new(opcode, Operand::None)
    }

    #[must_use]
    pub fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    /// Branch targets in operand order. Empty for non-branching instructions.
    pub fn targets(&self) -> &[usize] {
        match &self.operand {
            Operand::Target(t) => std::slice::from_ref(t),
            Operand::Switch(targets) => targets,
            _ => &[],
        }
    }

    #[cfg(feature = "serde")]
    fn no_operand() -> Operand {
        Operand::None
    }
}
