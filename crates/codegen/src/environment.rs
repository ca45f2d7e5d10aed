//! The seam between generic translation and the code's host.
//!
//! The generator emits tape arithmetic and control flow itself; everything
//! that depends on where the code runs (entry and exit, how bytes reach the
//! outside world, where the tape lives) goes through an [`Environment`].
//!
//! Register contract for every environment, established by `prologue` and
//! preserved across `read_byte`/`write_byte`:
//!
//! | register | holds |
//! |---|---|
//! | [`TAPE`] (`rbx`) | address of cell 0 |
//! | [`POINTER`] (`r12`) | data pointer, an index into the tape |
//! | [`CAPACITY`] (`r13`) | number of cells |
//!
//! `rax` is scratch for the generator.

use crate::asm::{Assembler, Label, Mem, Reg};

pub const TAPE: Reg = Reg::Rbx;
pub const POINTER: Reg = Reg::R12;
pub const CAPACITY: Reg = Reg::R13;

/// The current cell, `byte [TAPE + POINTER]`.
pub const CELL: Mem = Mem::Indexed {
    base: TAPE,
    index: POINTER,
};

/// Run completed.
pub const STATUS_OK: u32 = 0;
/// The data pointer would have left the tape.
pub const STATUS_TAPE_BOUNDS: u32 = 1;
/// The input or output channel failed.
pub const STATUS_IO: u32 = 2;

/// Exit points the generator branches to; the environment binds them.
#[derive(Debug, Clone, Copy)]
pub struct Exits {
    /// Finish with [`STATUS_OK`].
    pub ok: Label,
    /// Finish with [`STATUS_TAPE_BOUNDS`].
    pub bounds: Label,
    /// Finish with [`STATUS_IO`].
    pub io: Label,
}

/// Host-specific code fragments.
pub trait Environment {
    /// Entry sequence: establish the register contract with the pointer at
    /// its starting cell.
    fn prologue(&self, asm: &mut Assembler);

    /// Read one byte into `eax` (zero-extended). Branches to `eof` at end of
    /// input and to `io_error` on failure; falls through on success.
    fn read_byte(&self, asm: &mut Assembler, eof: Label, io_error: Label);

    /// Write the current cell. Branches to `io_error` on failure.
    fn write_byte(&self, asm: &mut Assembler, io_error: Label);

    /// Remember that instruction `at` faulted, just before the jump to the
    /// bounds exit.
    fn record_fault(&self, asm: &mut Assembler, at: usize);

    /// Bind the three exits and leave with the matching status.
    fn epilogue(&self, asm: &mut Assembler, exits: &Exits);
}
