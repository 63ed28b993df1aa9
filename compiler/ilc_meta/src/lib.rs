//! Metadata model for the ilc bytecode translator.
//!
//! This crate describes the input side of the translator: an [`Assembly`]
//! holding type, field and method definitions, the type signatures they
//! reference, and method bodies expressed as sequences of stack-machine
//! [`Instruction`]s over a closed [`Opcode`] set.
//!
//! Everything here is plain data. Generic instantiation and overload
//! resolution are assumed to have happened before an assembly is built:
//! every method, field and type operand refers to exactly one definition.
//!
//! # Hierarchy Roots
//!
//! [`Assembly::new`] pre-registers `System.Object`, `System.ValueType` and
//! `System.Enum`. User types get their base defaulted from their kind, so
//! every class chain ends at `System.Object` and every struct or enum chain
//! ends at `System.ValueType`.

mod assembly;
mod def;
mod ids;
mod instr;
mod opcode;
mod sig;

pub use assembly::{Ancestors, Assembly, MetaError};
pub use def::{FieldDef, MethodBody, MethodDef, MethodFlags, Param, TypeDef, TypeFlags, TypeKind, Visibility};
pub use ids::{FieldId, MethodId, TypeDefId};
pub use instr::{Instruction, Operand};
pub use opcode::{FlowControl, Opcode};
pub use sig::TypeSig;
