//! Main execution loop and instruction dispatch.

use std::io::{Read, Write};

use bfjit_common::io::{read_byte, write_byte};
use bfjit_common::{Instruction, RuntimeError};

use crate::machine::Machine;

impl<R: Read + ?Sized, W: Write + ?Sized> Machine<'_, R, W> {
    /// Run until the cursor passes the last instruction or a fault occurs.
    pub(crate) fn execute(&mut self) -> Result<(), RuntimeError> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    /// Execute the instruction under the cursor and advance.
    ///
    /// On a fault the cursor stays on the faulting instruction. Stepping a
    /// finished machine does nothing.
    pub(crate) fn step(&mut self) -> Result<(), RuntimeError> {
        let at = self.cursor;
        let Some(&instr) = self.program.instructions().get(at) else {
            return Ok(());
        };

        self.cursor = match instr {
            Instruction::MovePointer(delta) => {
                self.tape.move_pointer(delta as isize, at)?;
                at + 1
            }
            Instruction::AddToCell(delta) => {
                self.tape.add(delta);
                at + 1
            }
            Instruction::Input => {
                self.exec_input()?;
                at + 1
            }
            Instruction::Output => {
                write_byte(&mut *self.output, self.tape.get())?;
                at + 1
            }
            Instruction::LoopOpen { target } if self.tape.get() == 0 => target,
            Instruction::LoopClose { target } if self.tape.get() != 0 => target,
            Instruction::LoopOpen { .. } | Instruction::LoopClose { .. } => at + 1,
        };
        Ok(())
    }

    fn exec_input(&mut self) -> Result<(), RuntimeError> {
        match read_byte(&mut *self.input)? {
            Some(byte) => self.tape.set(byte),
            None => {
                if let Some(value) = self.eof.value() {
                    self.tape.set(value);
                }
            }
        }
        Ok(())
    }
}
