//! The facade's error type.

use bfjit_codegen::CodegenError;
use bfjit_common::RuntimeError;
use bfjit_module::EmitError;
use bfjit_parser::ParseError;
use thiserror::Error;

use crate::config::ConfigError;

/// Anything that can go wrong between source text and a finished run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("code generation failed: {0}")]
    Codegen(#[from] CodegenError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("cannot emit module: {0}")]
    Emit(#[from] EmitError),
}
