//! The translation pipeline.
//!
//! 1. Declare every user type.
//! 2. Define every type: struct bodies, vtables, static globals.
//! 3. Compile every method of every user type.
//! 4. Emit `{module}_static_init`, which runs the compiled static
//!    constructors in declaration order.

use ilc_meta::{Assembly, MethodId};
use ilc_ssa::{Backend, Linkage};
use rustc_hash::FxHashSet;

use crate::context::CodegenContext;
use crate::method::{compile_method, declare_function, MethodOutcome};
use crate::types::{compile_types, declare_types};
use crate::{naming, CodegenResult, CompilerSettings};

/// A method the pipeline did not emit a body for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedMethod {
    pub name: String,
    pub reason: String,
}

/// Per-method results of a compilation, for the driver to summarize.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub compiled: Vec<String>,
    pub external: Vec<String>,
    pub skipped: Vec<SkippedMethod>,
    /// Name of the generated static initializer.
    pub static_init: String,
}

/// Translate `asm` into `backend`.
///
/// Fatal errors abort the compilation; methods using deferred constructs
/// are reported in [`CompileReport::skipped`] instead.
pub fn compile(asm: &Assembly, settings: CompilerSettings, backend: &mut dyn Backend) -> CodegenResult<CompileReport> {
    let mut cx = CodegenContext::new(asm, settings);
    tracing::debug!(assembly = asm.name(), module = %cx.settings.module_name, "compiling assembly");

    declare_types(&mut cx, backend)?;
    compile_types(&mut cx, backend)?;

    let mut report = CompileReport::default();
    let mut compiled = FxHashSet::default();
    for (_, def) in asm.user_types() {
        for &method in def.methods() {
            let name = format!("{}::{}", def.full_name(), asm.method(method).name);
            match compile_method(&mut cx, backend, method)? {
                MethodOutcome::Compiled(_) => {
                    compiled.insert(method);
                    report.compiled.push(name);
                }
                MethodOutcome::External(_) => report.external.push(name),
                MethodOutcome::Abstract(_) => {}
                MethodOutcome::Skipped { reason } => report.skipped.push(SkippedMethod { name, reason }),
            }
        }
    }

    report.static_init = emit_static_init(&mut cx, backend, &compiled)?;
    tracing::debug!(
        compiled = report.compiled.len(),
        external = report.external.len(),
        skipped = report.skipped.len(),
        layouts = cx.layouts.computed(),
        "compilation finished"
    );
    Ok(report)
}

fn emit_static_init(
    cx: &mut CodegenContext<'_>,
    b: &mut dyn Backend,
    compiled: &FxHashSet<MethodId>,
) -> CodegenResult<String> {
    let name = naming::static_init_name(&cx.settings.module_name);
    let void = b.void_type();
    let fn_ty = b.function_type(void, &[]);
    let function = b.add_function(&name, fn_ty, Linkage::External);
    cx.lookup.add_function(&name, function)?;

    let entry = b.append_block(function, "entry");
    b.position_at_end(entry);
    let cctors: Vec<MethodId> = cx.lookup.cctors().to_vec();
    for cctor in cctors {
        if !compiled.contains(&cctor) {
            tracing::debug!(cctor = %naming::method_name(cx.asm, cctor), "static constructor not compiled; not called");
            continue;
        }
        let callee = declare_function(cx, b, cctor)?;
        b.call(callee, &[]);
    }
    b.ret(None);

    if cx.settings.verify {
        b.verify_function(function)?;
    }
    b.optimize_function(function, cx.settings.optimization);
    Ok(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
