//! bfjit interpreter: executes a parsed program one instruction at a time.
//!
//! The interpreter is the reference semantics for the pipeline: generated
//! code must produce the same output and the same fault for every program
//! and input.
//!
//! # Usage
//!
//! ```
//! use bfjit_common::{EofPolicy, Tape};
//! use bfjit_parser::parse;
//! use bfjit_vm::run;
//!
//! let program = parse(",+.", 256).unwrap();
//! let mut tape = Tape::new(16);
//! let mut input: &[u8] = b"A";
//! let mut output = Vec::new();
//!
//! run(&program, &mut tape, &mut input, &mut output, EofPolicy::Zero).unwrap();
//! assert_eq!(output, b"B");
//! ```

mod execute;
mod machine;

pub use bfjit_common::RuntimeError;

use machine::Machine;

use std::io::{Read, Write};

use bfjit_common::{EofPolicy, Program, Tape};
use tracing::trace;

/// Interpret `program` against `tape`, reading from `input` and writing to
/// `output`.
///
/// The tape is used as given; callers that want a clean run reset it first.
///
/// # Errors
///
/// Returns [`RuntimeError::TapeBoundsExceeded`] if the pointer would leave
/// the tape, or [`RuntimeError::Io`] if a channel fails. Output written
/// before the error stays written.
pub fn run<R, W>(
    program: &Program,
    tape: &mut Tape,
    input: &mut R,
    output: &mut W,
    eof: EofPolicy,
) -> Result<(), RuntimeError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    trace!(instructions = program.len(), capacity = tape.capacity(), "interpreting");
    let mut machine = Machine::new(program, tape, input, output, eof);
    machine.execute()
}
