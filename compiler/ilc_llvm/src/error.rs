use std::path::PathBuf;

/// Module-level LLVM failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlvmError {
    /// The native target could not be initialized or has no machine.
    #[error("cannot set up the native target: {0}")]
    Target(String),
    #[error("LLVM module verification failed: {0}")]
    Verify(String),
    #[error("optimization passes failed: {0}")]
    Passes(String),
    #[error("cannot write `{path}`: {message}")]
    Write { path: PathBuf, message: String },
}
