//! Stack bytecode to SSA translation.
//!
//! Takes an [`ilc_meta::Assembly`] and emits its types and methods into any
//! [`ilc_ssa::Backend`]. The pipeline is driven by [`compile`]; the phases
//! are public so tests and tools can run them piecemeal.
//!
//! # Architecture
//!
//! - **Lookup** (`lookup.rs`): symbol table of IR handles, keyed by
//!   mangled name or definition ID.
//! - **Layout** (`layout.rs`): memoized flattening of a type's chain into
//!   struct entries.
//! - **Vtables** (`vtable.rs`): class slot tables, interface tables and
//!   indirection tables.
//! - **Types** (`types.rs`): two-phase declare/define of IR types.
//! - **Stack** (`stack.rs`): the evaluation stack and phi reconciliation
//!   at block joins.
//! - **Emit** (`emit.rs`, `emit/`): one [`CodeEmitter`] per opcode family.
//! - **Method** (`method.rs`): block discovery and per-method translation.
//!
//! # Debugging
//!
//! - `RUST_LOG=ilc_codegen=debug`: one event per type and method.
//! - `RUST_LOG=ilc_codegen=trace`: one event per instruction and per phi
//!   transition.

mod cast;
mod compiler;
mod context;
mod emit;
mod error;
mod layout;
mod lookup;
mod method;
pub mod naming;
mod settings;
mod stack;
mod type_map;
mod types;
mod vtable;

#[cfg(test)]
mod test_helpers;

use std::sync::Once;

pub use compiler::{compile, CompileReport, SkippedMethod};
pub use context::CodegenContext;
pub use emit::{dispatch, CodeEmitter, Dispatch};
pub use error::{CodegenError, CodegenResult, ErrorCategory};
pub use layout::{LayoutEngine, StructEntry, INDIRECTION_SLOT};
pub use lookup::Lookup;
pub use method::{compile_method, declare_function, MethodContext, MethodOutcome, Variable};
pub use settings::CompilerSettings;
pub use stack::{EvalStack, SlotState, StackElement};
pub use types::{compile_types, declare_types};
pub use vtable::{InterfaceTable, SlotTable, VTable};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. `RUST_LOG` wins when set; otherwise
/// `verbose` enables `ilc_codegen=debug`, and without either nothing is
/// installed.
pub fn init_tracing(verbose: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if verbose {
            EnvFilter::new("ilc_codegen=debug")
        } else {
            return;
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}
