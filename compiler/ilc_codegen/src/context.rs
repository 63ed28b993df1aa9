//! State shared by every translation phase.

use ilc_meta::Assembly;

use crate::layout::LayoutEngine;
use crate::lookup::Lookup;
use crate::CompilerSettings;

/// Per-compilation state: the input assembly, the settings, the symbol
/// table and the layout cache.
///
/// Backend handles stored in [`Lookup`] belong to the backend the
/// compilation runs against; a context must not be reused with another.
pub struct CodegenContext<'a> {
    pub(crate) asm: &'a Assembly,
    pub(crate) settings: CompilerSettings,
    pub(crate) lookup: Lookup,
    pub(crate) layouts: LayoutEngine,
}

impl<'a> CodegenContext<'a> {
    pub fn new(asm: &'a Assembly, settings: CompilerSettings) -> Self {
        CodegenContext {
            asm,
            settings,
            lookup: Lookup::new(),
            layouts: LayoutEngine::new(),
        }
    }

    pub fn assembly(&self) -> &'a Assembly {
        self.asm
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn layouts(&self) -> &LayoutEngine {
        &self.layouts
    }
}
