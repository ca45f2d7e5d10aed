//! Module emission errors.

use std::io;
use std::path::PathBuf;

use bfjit_codegen::CodegenError;
use thiserror::Error;

/// Errors produced while building, writing or reading back a module.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The module name cannot be embedded.
    #[error("invalid module name {name:?}: {reason}")]
    InvalidModuleName { name: String, reason: &'static str },

    /// The destination cannot receive a module file.
    #[error("invalid destination '{}': {reason}", path.display())]
    InvalidDestination { path: PathBuf, reason: &'static str },

    /// Writing the module failed; nothing was left at the destination.
    #[error("cannot write module: {0}")]
    Write(#[from] io::Error),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// The bytes are not a module this crate produced.
    #[error("malformed module: {0}")]
    Malformed(&'static str),
}
