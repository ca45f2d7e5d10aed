//! bfjit module emitter: persists a program as a standalone Linux
//! executable.
//!
//! A module is an ELF64 x86-64 executable holding the program's code, a
//! zero-fill segment for its tape, and two notes: the module name and a
//! blake3 digest of the code. It reads stdin, writes stdout and exits with
//! the run status (0 ok, 1 tape bounds, 2 I/O).
//!
//! ```no_run
//! use std::path::Path;
//!
//! use bfjit_common::EofPolicy;
//! use bfjit_module::ModuleEmitter;
//!
//! let program = bfjit_parser::parse("+[,.]", 256).unwrap();
//! ModuleEmitter::new(30_000, EofPolicy::Zero)
//!     .emit(&program, "cat", Path::new("cat"))
//!     .unwrap();
//! ```

pub mod elf;
pub mod emit;
pub mod error;

pub use elf::{inspect, ModuleInfo};
pub use emit::{emit, validate_name, ModuleEmitter, MAX_MODULE_NAME_LEN};
pub use error::EmitError;
