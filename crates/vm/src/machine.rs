//! Interpreter state: the program, the tape, the I/O pair and a cursor.

use std::io::{Read, Write};

use bfjit_common::{EofPolicy, Program, Tape};

/// Per-run interpreter state.
///
/// Borrows everything it works on; dropping it at the end of a run leaves
/// the tape holding the final memory state.
pub(crate) struct Machine<'a, R: ?Sized, W: ?Sized> {
    /// The program being executed.
    pub(crate) program: &'a Program,
    /// The memory the program mutates.
    pub(crate) tape: &'a mut Tape,
    pub(crate) input: &'a mut R,
    pub(crate) output: &'a mut W,
    pub(crate) eof: EofPolicy,
    /// Index of the next instruction to execute.
    pub(crate) cursor: usize,
}

impl<'a, R: Read + ?Sized, W: Write + ?Sized> Machine<'a, R, W> {
    /// Create a machine positioned at the first instruction.
    pub(crate) fn new(
        program: &'a Program,
        tape: &'a mut Tape,
        input: &'a mut R,
        output: &'a mut W,
        eof: EofPolicy,
    ) -> Self {
        Self {
            program,
            tape,
            input,
            output,
            eof,
            cursor: 0,
        }
    }

    /// True once the cursor has run past the last instruction.
    pub(crate) fn is_finished(&self) -> bool {
        self.cursor >= self.program.len()
    }
}
