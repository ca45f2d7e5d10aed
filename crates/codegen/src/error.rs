//! Code generation errors.

use std::io;

use thiserror::Error;

/// Errors produced while generating or loading machine code.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A loop instruction points outside the program.
    #[error("loop target {target} out of range at instruction {at}")]
    InvalidTarget { at: usize, target: usize },

    /// A branch was emitted to a label that was never bound.
    #[error("branch to unbound label {label}")]
    UnboundLabel { label: usize },

    /// A branch displacement does not fit in 32 bits.
    #[error("branch at offset {at} out of rel32 range")]
    BranchOutOfRange { at: usize },

    /// Generated code can only run on x86-64 hosts.
    #[error("native code execution is not supported on this host")]
    UnsupportedHost,

    /// Executable memory could not be mapped.
    #[error("cannot map executable memory: {0}")]
    Map(#[source] io::Error),
}
