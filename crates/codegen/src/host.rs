//! In-process environment: the code is called from Rust and calls back into
//! Rust for I/O.
//!
//! Entry signature (System V x86-64):
//!
//! ```text
//! extern "sysv64" fn(tape: *mut u8, capacity: usize, ctx: *mut Context) -> u32
//! ```
//!
//! Callbacks take `ctx.host` as their only argument (plus the byte to write)
//! and return:
//!
//! - read: the byte (0..=255), [`READ_EOF`] at end of input, negative on error
//! - write: 0 on success, non-zero on error

use std::ffi::c_void;
use std::mem::offset_of;
use std::ptr;

use crate::asm::{Alu, Assembler, Cond, Label, Mem, Reg};
use crate::environment::{
    Environment, Exits, CAPACITY, CELL, POINTER, STATUS_IO, STATUS_TAPE_BOUNDS, TAPE,
};

/// Value a read callback returns at end of input.
pub const READ_EOF: i32 = 0x100;

/// Holds the context pointer for the whole run.
const CONTEXT: Reg = Reg::R14;

/// Run state shared between Rust and generated code.
#[repr(C)]
#[derive(Debug)]
pub struct Context {
    /// Opaque argument for the callbacks.
    pub host: *mut c_void,
    /// `extern "sysv64" fn(*mut c_void) -> i32`
    pub read: *const c_void,
    /// `extern "sysv64" fn(*mut c_void, u32) -> i32`
    pub write: *const c_void,
    /// Pointer on entry; written back on every exit.
    pub pointer: usize,
    /// Faulting instruction index, valid after a bounds exit.
    pub fault_at: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            host: ptr::null_mut(),
            read: ptr::null(),
            write: ptr::null(),
            pointer: 0,
            fault_at: 0,
        }
    }
}

fn field(offset: usize) -> Mem {
    Mem::disp(CONTEXT, offset as i32)
}

/// Callee-saved registers the code uses. Five pushes on top of the return
/// address keep `rsp` 16-byte aligned at every callback.
const SAVED: [Reg; 5] = [Reg::Rbx, Reg::R12, Reg::R13, Reg::R14, Reg::R15];

/// Environment for code run inside this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCalls;

impl Environment for HostCalls {
    fn prologue(&self, asm: &mut Assembler) {
        for reg in SAVED {
            asm.push(reg);
        }
        asm.mov(TAPE, Reg::Rdi);
        asm.mov(CAPACITY, Reg::Rsi);
        asm.mov(CONTEXT, Reg::Rdx);
        asm.load(POINTER, field(offset_of!(Context, pointer)));
    }

    fn read_byte(&self, asm: &mut Assembler, eof: Label, io_error: Label) {
        asm.load(Reg::Rdi, field(offset_of!(Context, host)));
        asm.call_mem(field(offset_of!(Context, read)));
        asm.test32(Reg::Rax, Reg::Rax);
        asm.jcc(Cond::Sign, io_error);
        asm.alu_imm32(Alu::Cmp, Reg::Rax, READ_EOF);
        asm.jcc(Cond::Equal, eof);
    }

    fn write_byte(&self, asm: &mut Assembler, io_error: Label) {
        asm.load(Reg::Rdi, field(offset_of!(Context, host)));
        asm.load_byte(Reg::Rsi, CELL);
        asm.call_mem(field(offset_of!(Context, write)));
        asm.test32(Reg::Rax, Reg::Rax);
        asm.jcc(Cond::NotEqual, io_error);
    }

    fn record_fault(&self, asm: &mut Assembler, at: usize) {
        asm.mov_imm64(Reg::Rax, at as u64);
        asm.store(field(offset_of!(Context, fault_at)), Reg::Rax);
    }

    fn epilogue(&self, asm: &mut Assembler, exits: &Exits) {
        let done = asm.new_label();

        asm.bind(exits.ok);
        asm.xor32(Reg::Rax, Reg::Rax);
        asm.jmp(done);

        asm.bind(exits.bounds);
        asm.mov_imm32(Reg::Rax, STATUS_TAPE_BOUNDS);
        asm.jmp(done);

        asm.bind(exits.io);
        asm.mov_imm32(Reg::Rax, STATUS_IO);

        asm.bind(done);
        asm.store(field(offset_of!(Context, pointer)), POINTER);
        for reg in SAVED.iter().rev() {
            asm.pop(*reg);
        }
        asm.ret();
    }
}
