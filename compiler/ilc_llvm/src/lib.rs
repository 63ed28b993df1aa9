//! LLVM implementation of [`ilc_ssa::Backend`].
//!
//! [`LlvmBackend`] owns an inkwell module and builder and hands out the
//! same opaque handles the in-memory module does: every LLVM value, type,
//! block and function is stored in an arena and addressed by index, so
//! the translator never sees an inkwell lifetime.
//!
//! ```ignore
//! let context = Context::create();
//! let mut backend = LlvmBackend::new(&context, "app")?;
//! ilc_codegen::compile(&asm, CompilerSettings::new("app"), &mut backend)?;
//! backend.finish()?;
//! backend.write_object(Path::new("app.o"))?;
//! ```
//!
//! Pointers are opaque in LLVM 17; the pointee of an `ilc_ssa` pointer
//! type only exists in the type table kept here.
//!
//! # Debugging
//!
//! Set `ILC_DEBUG_LLVM=1` to print the module to stderr before
//! verification in [`LlvmBackend::finish`].

mod arena;
mod backend;
mod error;
mod passes;
mod types;

pub use backend::LlvmBackend;
pub use error::LlvmError;
