//! New pass manager pipeline via the LLVM C API.
//!
//! The `default<On>` pipelines run through `LLVMRunPasses` from
//! `llvm-sys`, with vectorization enabled at O2 and above.

use std::ffi::CString;

use inkwell::module::Module;
use inkwell::targets::TargetMachine;
use ilc_ssa::OptLevel;

use crate::LlvmError;

/// Run the `default<On>` pipeline for `level` over the whole module.
pub(crate) fn run_pipeline(
    module: &Module<'_>,
    machine: &TargetMachine,
    level: OptLevel,
) -> Result<(), LlvmError> {
    use llvm_sys::transforms::pass_builder::{
        LLVMPassBuilderOptionsSetLoopUnrolling, LLVMPassBuilderOptionsSetLoopVectorization,
        LLVMPassBuilderOptionsSetSLPVectorization, LLVMRunPasses,
    };

    let guard = PassBuilderOptionsGuard::new()
        .ok_or_else(|| LlvmError::Passes("cannot create pass builder options".to_owned()))?;
    let vectorize = matches!(level, OptLevel::O2 | OptLevel::O3);

    // SAFETY: `guard` owns a live options object until it is dropped.
    unsafe {
        LLVMPassBuilderOptionsSetLoopVectorization(guard.as_ptr(), vectorize.into());
        LLVMPassBuilderOptionsSetSLPVectorization(guard.as_ptr(), vectorize.into());
        LLVMPassBuilderOptionsSetLoopUnrolling(guard.as_ptr(), level.is_enabled().into());
    }

    let pipeline = level.pipeline_string();
    let pipeline_cstr =
        CString::new(pipeline).map_err(|_| LlvmError::Passes(format!("bad pipeline `{pipeline}`")))?;
    tracing::debug!(pipeline, "running LLVM pass pipeline");

    // SAFETY: module and target machine outlive the call; the pipeline
    // string is NUL-terminated.
    let error = unsafe {
        LLVMRunPasses(
            module.as_mut_ptr(),
            pipeline_cstr.as_ptr(),
            machine.as_mut_ptr(),
            guard.as_ptr(),
        )
    };
    if !error.is_null() {
        // SAFETY: `error` is a non-null error returned by LLVMRunPasses.
        let message = unsafe { extract_llvm_error_message(error) };
        return Err(LlvmError::Passes(message));
    }
    Ok(())
}

/// Extract error message from LLVM error, disposing the error.
///
/// # Safety
/// The error pointer must be valid and non-null.
unsafe fn extract_llvm_error_message(error: llvm_sys::error::LLVMErrorRef) -> String {
    let msg_ptr = llvm_sys::error::LLVMGetErrorMessage(error);
    if msg_ptr.is_null() {
        "unknown error".to_string()
    } else {
        let msg = std::ffi::CStr::from_ptr(msg_ptr)
            .to_string_lossy()
            .into_owned();
        llvm_sys::error::LLVMDisposeErrorMessage(msg_ptr);
        msg
    }
}

/// RAII guard for `LLVMPassBuilderOptionsRef`.
struct PassBuilderOptionsGuard {
    options: llvm_sys::transforms::pass_builder::LLVMPassBuilderOptionsRef,
}

impl PassBuilderOptionsGuard {
    fn new() -> Option<Self> {
        let options = unsafe { llvm_sys::transforms::pass_builder::LLVMCreatePassBuilderOptions() };
        if options.is_null() {
            None
        } else {
            Some(Self { options })
        }
    }

    fn as_ptr(&self) -> llvm_sys::transforms::pass_builder::LLVMPassBuilderOptionsRef {
        self.options
    }
}

impl Drop for PassBuilderOptionsGuard {
    fn drop(&mut self) {
        unsafe {
            llvm_sys::transforms::pass_builder::LLVMDisposePassBuilderOptions(self.options);
        }
    }
}
