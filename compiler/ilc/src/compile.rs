//! Load, translate, write.

use std::path::Path;

use ilc_codegen::{compile, CompileReport, CompilerSettings};
use ilc_meta::Assembly;
use ilc_ssa::SsaModule;

use crate::{BuildOptions, DriverError};

/// A finished translation.
pub struct Compiled {
    pub module: SsaModule,
    pub report: CompileReport,
}

/// Read a JSON-serialized assembly and check its cross-references.
pub fn load_assembly(path: &Path) -> Result<Assembly, DriverError> {
    let text = std::fs::read_to_string(path).map_err(|source| DriverError::Read {
        path: path.to_owned(),
        source,
    })?;
    let asm: Assembly = serde_json::from_str(&text).map_err(|source| DriverError::Parse {
        path: path.to_owned(),
        source,
    })?;
    asm.validate()?;
    Ok(asm)
}

/// Translate the input named by `options` into an in-memory module.
pub fn compile_file(options: &BuildOptions) -> Result<Compiled, DriverError> {
    let asm = load_assembly(&options.input)?;
    let module_name = options.module_name();
    let settings = CompilerSettings::new(module_name.clone()).with_optimization(options.opt_level);
    tracing::debug!(input = %options.input.display(), module = %module_name, opt = %options.opt_level, "loaded assembly");

    let mut module = SsaModule::new(module_name);
    let report = compile(&asm, settings, &mut module)?;

    if std::env::var("ILC_DEBUG_IR").is_ok_and(|v| !v.is_empty()) {
        eprintln!("=== IR for {} ===", module.name());
        eprintln!("{module}");
        eprintln!("=== END IR ===");
    }
    Ok(Compiled { module, report })
}

/// Write the module's text to `-o`, or return it for stdout.
pub fn emit(compiled: &Compiled, options: &BuildOptions) -> Result<Option<String>, DriverError> {
    let text = compiled.module.to_string();
    match &options.output {
        Some(path) => {
            std::fs::write(path, text).map_err(|source| DriverError::Write {
                path: path.clone(),
                source,
            })?;
            Ok(None)
        }
        None => Ok(Some(text)),
    }
}

/// One-line summary for the terminal.
pub fn summary(report: &CompileReport) -> String {
    format!(
        "{} compiled, {} external, {} skipped",
        report.compiled.len(),
        report.external.len(),
        report.skipped.len()
    )
}
