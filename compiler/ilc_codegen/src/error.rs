//! Translation errors.
//!
//! Every variant aborts the whole run. Constructs that are merely not
//! implemented yet are reported as skips, not errors (see
//! [`MethodOutcome::Skipped`](crate::MethodOutcome::Skipped)).

use ilc_ssa::VerifyError;

/// Result alias used throughout the crate.
pub type CodegenResult<T> = Result<T, CodegenError>;

/// A fatal translation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    // Configuration
    #[error("type `{type_name}` uses packing {packing}; only 0 and 1 are supported")]
    UnsupportedPacking { type_name: String, packing: u32 },
    #[error("type `{type_name}` declares a fixed size but is not a struct")]
    FixedSizeOnNonStruct { type_name: String },
    #[error("instruction {index} (`{opcode}`) of `{method}`: {reason}")]
    MalformedOperand {
        method: String,
        index: usize,
        opcode: &'static str,
        reason: String,
    },

    // Invariant violations
    #[error("type `{0}` has no registered IR type")]
    TypeNotFound(String),
    #[error("type `{0}` has no vtable")]
    VTableNotFound(String),
    #[error("type `{0}` has no allocation routine")]
    NewobjNotFound(String),
    #[error("field `{field}` is not part of the layout of `{type_name}`")]
    FieldNotInLayout { type_name: String, field: String },
    #[error("type `{0}` has no class vtable slot in its layout")]
    VTableSlotNotFound(String),
    #[error("method `{method}` has no slot in the vtable of `{type_name}`")]
    MethodSlotNotFound { type_name: String, method: String },
    #[error("interface `{0}` was not assigned an index")]
    InterfaceNotIndexed(String),
    #[error("type `{0}` is its own ancestor")]
    CyclicInheritance(String),
    #[error("evaluation stack underflow at instruction {index} (`{opcode}`) of `{method}`")]
    StackUnderflow {
        method: String,
        index: usize,
        opcode: &'static str,
    },
    #[error(transparent)]
    Verification(#[from] VerifyError),

    // Unsupported
    #[error("unsupported instruction `{opcode}` in `{method}`")]
    UnsupportedInstruction { method: String, opcode: &'static str },

    // Duplicate registration
    #[error("duplicate {kind} registration for `{name}`")]
    Duplicate { kind: &'static str, name: String },
}

/// Coarse grouping of [`CodegenError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input asks for something the translator does not support.
    Configuration,
    /// A well-formed program can never trigger these; they point at a
    /// defect in an earlier pass.
    Invariant,
    /// An instruction with no handler.
    Unsupported,
    /// A registry key written twice.
    Duplicate,
}

impl CodegenError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodegenError::UnsupportedPacking { .. }
            | CodegenError::FixedSizeOnNonStruct { .. }
            | CodegenError::MalformedOperand { .. } => ErrorCategory::Configuration,
            CodegenError::TypeNotFound(_)
            | CodegenError::VTableNotFound(_)
            | CodegenError::NewobjNotFound(_)
            | CodegenError::FieldNotInLayout { .. }
            | CodegenError::VTableSlotNotFound(_)
            | CodegenError::MethodSlotNotFound { .. }
            | CodegenError::InterfaceNotIndexed(_)
            | CodegenError::CyclicInheritance(_)
            | CodegenError::StackUnderflow { .. }
            | CodegenError::Verification(_) => ErrorCategory::Invariant,
            CodegenError::UnsupportedInstruction { .. } => ErrorCategory::Unsupported,
            CodegenError::Duplicate { .. } => ErrorCategory::Duplicate,
        }
    }
}
