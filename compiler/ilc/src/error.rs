use std::path::PathBuf;

use ilc_codegen::CodegenError;
use ilc_meta::MetaError;
use ilc_ssa::ParseOptLevelError;

/// Everything that can stop the driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    OptLevel(#[from] ParseOptLevelError),
    #[error("cannot read `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("cannot write `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not a valid assembly: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid assembly: {0}")]
    Meta(#[from] MetaError),
    #[error("compilation failed: {0}")]
    Codegen(#[from] CodegenError),
}
