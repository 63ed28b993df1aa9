//! SSA IR construction for the ilc translator.
//!
//! Two halves:
//!
//! - **[`Backend`]**: the capability interface the translator emits into.
//!   Types, values, blocks and functions are referred to through opaque
//!   `Copy` handles ([`TypeId`], [`ValueId`], [`BlockId`], [`FunctionId`]).
//! - **[`SsaModule`]**: an in-memory implementation with a 64-bit data
//!   layout, a structural verifier, dead-block removal and a textual
//!   printer. It backs the command-line driver and the test suites; the
//!   LLVM implementation lives in `ilc_llvm`.

mod backend;
mod error;
mod ids;
mod module;
mod passes;

pub use backend::{
    Backend, BinaryOp, CastOp, FloatPredicate, IntPredicate, Linkage, TypeClass, UnaryOp,
};
pub use error::VerifyError;
pub use ids::{BlockId, FunctionId, TypeId, ValueId};
pub use module::{Callee, Inst, SsaModule, Terminator, TypeData, ValueData, ValueKind};
pub use passes::{OptLevel, ParseOptLevelError};
