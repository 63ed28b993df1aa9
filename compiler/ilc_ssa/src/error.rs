//! Verification errors.

/// A function failed structural verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("function `{function}` failed verification: {message}")]
pub struct VerifyError {
    pub function: String,
    pub message: String,
}

impl VerifyError {
    pub fn new(function: impl Into<String>, message: impl Into<String>) -> Self {
        VerifyError {
            function: function.into(),
            message: message.into(),
        }
    }
}
