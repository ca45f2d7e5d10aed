//! bfjit code generator: translates a parsed program into x86-64 machine
//! code.
//!
//! The same translation serves two hosts, selected by an [`Environment`]:
//!
//! - [`HostCalls`] produces a function called from this process, with I/O
//!   routed back into Rust. [`CompiledProgram`] maps it executable and runs
//!   it.
//! - [`LinuxSyscalls`] produces the entry point of a standalone Linux
//!   executable that owns its tape and talks to the kernel itself. The
//!   module writer places the bytes and patches the tape address.
//!
//! Both report the same three statuses ([`STATUS_OK`],
//! [`STATUS_TAPE_BOUNDS`], [`STATUS_IO`]) and stop before a pointer move
//! that would leave the tape, exactly like the interpreter.

pub mod asm;
pub mod environment;
pub mod error;
pub mod generate;
pub mod host;
pub mod jit;
pub mod linux;

pub use asm::{Relocation, RelocationKind};
pub use environment::{Environment, STATUS_IO, STATUS_OK, STATUS_TAPE_BOUNDS};
pub use error::CodegenError;
pub use generate::{generate, CodeGenerator, MachineCode};
pub use host::HostCalls;
pub use jit::CompiledProgram;
pub use linux::LinuxSyscalls;
