//! Standalone environment: the code is the process entry point of a Linux
//! executable and talks to the kernel directly.
//!
//! The tape base is left as a [`RelocationKind::TapeBase`] immediate for the
//! module writer to fill in. Bytes move through a one-byte scratch slot at
//! `[rsp]`. The exit status is the run status.

use crate::asm::{Alu, Assembler, Cond, Label, Mem, Reg, RelocationKind};
use crate::environment::{
    Environment, Exits, CAPACITY, CELL, POINTER, STATUS_IO, STATUS_OK, STATUS_TAPE_BOUNDS, TAPE,
};

const SYS_READ: u32 = 0;
const SYS_WRITE: u32 = 1;
const SYS_EXIT: u32 = 60;
const STDIN: u32 = 0;
const STDOUT: u32 = 1;
const EINTR: i32 = 4;

/// Environment for a self-contained Linux x86-64 process.
#[derive(Debug, Clone, Copy)]
pub struct LinuxSyscalls {
    /// Size of the tape the module allocates for itself.
    pub tape_capacity: usize,
}

impl LinuxSyscalls {
    pub fn new(tape_capacity: usize) -> Self {
        Self { tape_capacity }
    }

    /// `syscall(nr, fd, [rsp], 1)`, retried while it fails with `EINTR`.
    /// Leaves the result in `rax`.
    fn transfer_one(&self, asm: &mut Assembler, nr: u32, fd: u32) {
        let retry = asm.new_label();
        asm.bind(retry);
        asm.mov_imm32(Reg::Rax, nr);
        asm.mov_imm32(Reg::Rdi, fd);
        asm.mov(Reg::Rsi, Reg::Rsp);
        asm.mov_imm32(Reg::Rdx, 1);
        asm.syscall();
        asm.alu_imm(Alu::Cmp, Reg::Rax, -EINTR);
        asm.jcc(Cond::Equal, retry);
    }
}

impl Environment for LinuxSyscalls {
    fn prologue(&self, asm: &mut Assembler) {
        // Scratch slot for single-byte transfers.
        asm.alu_imm(Alu::Sub, Reg::Rsp, 16);
        asm.mov_reloc(TAPE, RelocationKind::TapeBase);
        asm.mov_imm64(CAPACITY, self.tape_capacity as u64);
        asm.xor32(POINTER, POINTER);
    }

    fn read_byte(&self, asm: &mut Assembler, eof: Label, io_error: Label) {
        self.transfer_one(asm, SYS_READ, STDIN);
        asm.test(Reg::Rax, Reg::Rax);
        asm.jcc(Cond::Sign, io_error);
        asm.jcc(Cond::Equal, eof);
        asm.load_byte(Reg::Rax, Mem::at(Reg::Rsp));
    }

    fn write_byte(&self, asm: &mut Assembler, io_error: Label) {
        asm.load_byte(Reg::Rax, CELL);
        asm.store_byte(Mem::at(Reg::Rsp), Reg::Rax);
        self.transfer_one(asm, SYS_WRITE, STDOUT);
        asm.test(Reg::Rax, Reg::Rax);
        asm.jcc(Cond::LessOrEqual, io_error);
    }

    fn record_fault(&self, _asm: &mut Assembler, _at: usize) {
        // The exit status is all a standalone process reports.
    }

    fn epilogue(&self, asm: &mut Assembler, exits: &Exits) {
        let exit = asm.new_label();

        asm.bind(exits.ok);
        asm.mov_imm32(Reg::Rdi, STATUS_OK);
        asm.jmp(exit);

        asm.bind(exits.bounds);
        asm.mov_imm32(Reg::Rdi, STATUS_TAPE_BOUNDS);
        asm.jmp(exit);

        asm.bind(exits.io);
        asm.mov_imm32(Reg::Rdi, STATUS_IO);

        asm.bind(exit);
        asm.mov_imm32(Reg::Rax, SYS_EXIT);
        asm.syscall();
    }
}
