//! Command-line driver for the ilc translator.
//!
//! `ilc <input.json> [-o <file>] [--module=<name>] [--opt=<0-3>|-O<n>] [-v|--verbose]`
//!
//! Reads a JSON-serialized [`ilc_meta::Assembly`], translates it into an
//! in-memory SSA module and prints the module as text.
//!
//! # Environment
//!
//! - `RUST_LOG`: tracing filter, overrides `--verbose`.
//! - `ILC_DEBUG_IR`: also print the finished module to stderr.

mod compile;
mod error;
mod options;

pub use compile::{compile_file, emit, load_assembly, summary, Compiled};
pub use error::DriverError;
pub use options::{parse_build_options, BuildOptions};
