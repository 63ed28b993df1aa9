//! Compilation settings.

use ilc_ssa::OptLevel;

/// Knobs supplied by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// Output module name; also prefixes the static initializer function.
    pub module_name: String,
    pub optimization: OptLevel,
    /// Run the backend verifier on every emitted function.
    pub verify: bool,
}

impl CompilerSettings {
    pub fn new(module_name: impl Into<String>) -> Self {
        CompilerSettings {
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_optimization(mut self, level: OptLevel) -> Self {
        self.optimization = level;
        self
    }
}

impl Default for CompilerSettings {
    fn default() -> Self {
        CompilerSettings {
            module_name: "module".to_owned(),
            optimization: OptLevel::O0,
            verify: true,
        }
    }
}
