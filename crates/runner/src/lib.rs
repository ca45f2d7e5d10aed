//! bfjit: run programs for the eight-instruction tape machine.
//!
//! A [`Runner`] parses source once and then executes it any number of
//! times, either through the interpreter or as native code after
//! [`Runner::compile`]. Both produce the same output and the same errors.
//! [`Runner::emit_to_file`] writes the program out as a standalone Linux
//! executable instead.
//!
//! ```
//! use bfjit::{Config, Runner};
//!
//! let mut runner = Runner::new(",[.,]", Config::default()).unwrap();
//! let mut output = Vec::new();
//! runner.run(&mut &b"echo"[..], &mut output).unwrap();
//! assert_eq!(output, b"echo");
//! ```

pub mod config;
pub mod error;
pub mod runner;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use runner::Runner;

pub use bfjit_codegen::CodegenError;
pub use bfjit_common::{EofPolicy, Program, RuntimeError, DEFAULT_TAPE_CAPACITY};
pub use bfjit_module::{inspect, ModuleInfo};
pub use bfjit_parser::DEFAULT_MAX_NESTING_DEPTH;
